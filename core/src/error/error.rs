use thiserror::Error;

/// Engine level failures surfaced to callers of the core.
///
/// Resolution level failures never show up here; they are recorded as failed
/// participants in the resolved model and traversal continues.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("scheduled operation already exists: {name}")]
    SchedulingConflict { name: String },
    #[error("scheduled operation not found: {name}")]
    NotFound { name: String },
    #[error("session connect failed after {attempts} attempts")]
    Connect {
        attempts: u32,
        #[source]
        source: SessionError,
    },
    #[error("session disconnect failed")]
    Disconnect(#[source] SessionError),
    #[error("operation execution failed")]
    Operation(#[source] anyhow::Error),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("invalid cron expression '{expression}': {reason}")]
    Cron { expression: String, reason: String },
    #[error("scheduled operation store error: {0}")]
    Store(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by the command line layer, mapped to exit codes there.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Session lifecycle failures raised by `Session` implementations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("connect to resource '{resource}' failed: {reason}")]
    ConnectFailed { resource: String, reason: String },
    #[error("disconnect failed: {reason}")]
    DisconnectFailed { reason: String },
}

/// Failure raised by a wrapped operation's `execute`.
#[derive(Error, Debug)]
#[error("plugin execution failed: {0}")]
pub struct PluginExecutionError(#[from] pub anyhow::Error);

impl PluginExecutionError {
    pub fn msg(message: impl Into<String>) -> Self {
        PluginExecutionError(anyhow::anyhow!(message.into()))
    }
}

/// Misuse of the execution result tree.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("result '{description}' is already completed")]
    AlreadyCompleted { description: String },
}

/// A declared attribute could not be matched against the live object.
///
/// Non fatal: encoded in a `ResolvedParticipant` with state `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[error("{message}")]
pub struct ResolutionError {
    message: String,
}

impl ResolutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_preserves_cause_chain() {
        let err = EngineError::Connect {
            attempts: 4,
            source: SessionError::ConnectFailed {
                resource: "node-1".to_string(),
                reason: "refused".to_string(),
            },
        };
        assert!(err.to_string().contains("after 4 attempts"));
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("node-1"));
    }

    #[test]
    fn execution_error_converts_to_engine_error() {
        let err = EngineError::from(ExecutionError::AlreadyCompleted {
            description: "start trigger".to_string(),
        });
        assert!(matches!(err, EngineError::Execution(_)));
        assert!(err.to_string().contains("already completed"));
    }

    #[test]
    fn resolution_error_is_displayable() {
        let err = ResolutionError::new("no such attribute");
        assert_eq!(err.to_string(), "no such attribute");
    }
}
