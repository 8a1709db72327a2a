//! Agent assembly: wires a resolved model, a thread checkpointer, and a
//! workspace-scoped execution backend into one runnable agent instance.

use std::path::PathBuf;
use std::time::Duration;

use crate::agent::{AgentRuntime, AgentRuntimeParts, InterruptConfig};
use crate::checkpointer::CheckpointerRegistry;
use crate::config::Config;
use crate::error::{RuntimeError, RuntimeResult};
use crate::prompts;
use crate::providers::resolve_model;
use crate::sandbox::{LocalSandbox, SandboxConfig};

/// Fixed wall-clock timeout per command execution.
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Fixed cap on captured bytes per command output stream.
pub const MAX_OUTPUT_BYTES: usize = 100_000;

/// Input contract for assembling one agent instance.
#[derive(Debug, Clone)]
pub struct AgentRuntimeOptions {
    /// Thread id, required for per-thread checkpointing.
    pub thread_id: String,
    /// Model id to use (defaults to the configured default model).
    pub model_id: Option<String>,
    /// Workspace path, required for the agent to operate on files.
    pub workspace_path: PathBuf,
}

/// Creates an agent runtime with the configured model and checkpointer.
///
/// Preconditions are checked before any resource acquisition; failures from
/// model resolution or checkpointer initialization propagate unmodified.
/// Every command execution by the assembled agent requires explicit external
/// approval before it may proceed.
///
/// # Errors
/// Returns a configuration error for a missing thread id or workspace path,
/// and propagates model resolution and checkpointer initialization failures.
pub async fn create_agent_runtime(
    config: &Config,
    registry: &CheckpointerRegistry,
    options: AgentRuntimeOptions,
) -> RuntimeResult<AgentRuntime> {
    if options.thread_id.trim().is_empty() {
        return Err(RuntimeError::configuration("thread id required"));
    }
    if options.workspace_path.as_os_str().is_empty() {
        return Err(RuntimeError::configuration("workspace path required"));
    }

    tracing::info!(
        thread_id = options.thread_id,
        workspace = %options.workspace_path.display(),
        "creating agent runtime"
    );

    let model = resolve_model(config, options.model_id.as_deref())?;
    tracing::debug!(model = %model.describe(), "model handle ready");

    let checkpointer = registry.get(&options.thread_id).await?;
    tracing::debug!(thread_id = options.thread_id, "checkpointer ready");

    let backend = LocalSandbox::new(SandboxConfig {
        root_dir: options.workspace_path.clone(),
        // Absolute system paths, consistent with shell commands.
        virtual_mode: false,
        timeout: COMMAND_TIMEOUT,
        max_output_bytes: MAX_OUTPUT_BYTES,
    });

    let system_prompt = prompts::system_prompt(&options.workspace_path);
    let filesystem_system_prompt = prompts::filesystem_system_prompt(&options.workspace_path);

    let runtime = AgentRuntime::new(AgentRuntimeParts {
        model,
        checkpointer,
        backend,
        system_prompt,
        filesystem_system_prompt,
        // Human approval is required for all shell commands.
        interrupt_on: InterruptConfig { execute: true },
    });

    tracing::info!(
        workspace = %options.workspace_path.display(),
        "agent runtime created"
    );
    Ok(runtime)
}
