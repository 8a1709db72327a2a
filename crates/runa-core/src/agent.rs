//! Assembled agent runtime instance.
//!
//! Composition only: the reasoning loop that drives the model lives outside
//! this crate and consumes the parts assembled here.

use std::sync::Arc;

use serde_json::Value;

use crate::checkpointer::{Checkpoint, Checkpointer};
use crate::error::RuntimeResult;
use crate::providers::ModelHandle;
use crate::sandbox::LocalSandbox;

/// Sensitive action categories subject to the approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Shell command execution.
    Execute,
}

/// Which actions require an explicit external approval before proceeding.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptConfig {
    pub execute: bool,
}

/// Everything needed to assemble one agent runtime.
#[derive(Debug)]
pub struct AgentRuntimeParts {
    pub model: ModelHandle,
    pub checkpointer: Arc<Checkpointer>,
    pub backend: LocalSandbox,
    pub system_prompt: String,
    pub filesystem_system_prompt: String,
    pub interrupt_on: InterruptConfig,
}

/// A fully composed, ready-to-run agent instance.
///
/// Owns its model handle, checkpointer reference, and execution backend for
/// the duration of the conversation. The registry entry behind the
/// checkpointer outlives this instance.
#[derive(Debug)]
pub struct AgentRuntime {
    model: ModelHandle,
    checkpointer: Arc<Checkpointer>,
    backend: LocalSandbox,
    system_prompt: String,
    filesystem_system_prompt: String,
    interrupt_on: InterruptConfig,
}

impl AgentRuntime {
    /// Assembles an agent runtime from its parts.
    pub fn new(parts: AgentRuntimeParts) -> Self {
        Self {
            model: parts.model,
            checkpointer: parts.checkpointer,
            backend: parts.backend,
            system_prompt: parts.system_prompt,
            filesystem_system_prompt: parts.filesystem_system_prompt,
            interrupt_on: parts.interrupt_on,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn checkpointer(&self) -> &Arc<Checkpointer> {
        &self.checkpointer
    }

    pub fn backend(&self) -> &LocalSandbox {
        &self.backend
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn filesystem_system_prompt(&self) -> &str {
        &self.filesystem_system_prompt
    }

    /// Returns true when the given action must be approved externally
    /// before it may proceed.
    pub fn requires_approval(&self, action: ActionKind) -> bool {
        match action {
            ActionKind::Execute => self.interrupt_on.execute,
        }
    }

    /// Persists one conversation turn to the thread's checkpoint store.
    ///
    /// # Errors
    /// Propagates checkpoint append failures unmodified.
    pub async fn record_turn(&self, turn: u32, messages: Value) -> RuntimeResult<()> {
        self.checkpointer.append(Checkpoint::new(turn, messages)).await
    }
}
