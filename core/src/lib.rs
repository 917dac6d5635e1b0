//! Drydock core: execution result trees, resolved-model reconciliation,
//! retry-guarded sessions and the scheduled-operation registry.

pub mod config;
pub mod error;
pub mod execution;
pub mod messages;
pub mod model;
pub mod schedule;
pub mod session;

pub use error::{EngineError, ExecutionError, PluginExecutionError, ResolutionError, SessionError};
pub use execution::{ExecutionResult, ExecutionState};
pub use model::{ResolvedModel, ResolvedParticipant};
pub use schedule::{OperationDispatcher, ScheduledOperation, ScheduledOperationRegistry};
pub use session::{Operation, RetryConfig, RetrySessionHandler, Session};
