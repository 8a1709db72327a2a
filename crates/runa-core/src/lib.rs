//! Agent runtime orchestration: model resolution, per-thread checkpointing,
//! and assembly of agent instances over a workspace-scoped sandbox.

pub mod agent;
pub mod checkpointer;
pub mod config;
pub mod error;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod runtime;
pub mod sandbox;

pub use agent::{ActionKind, AgentRuntime, InterruptConfig};
pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerRegistry};
pub use config::Config;
pub use error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
pub use providers::{ModelFamily, ModelHandle, resolve_model};
pub use runtime::{AgentRuntimeOptions, create_agent_runtime};
pub use sandbox::{LocalSandbox, SandboxConfig};
