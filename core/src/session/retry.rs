//! Retry-guarded session handling.
//!
//! Wraps operation execution in the session lifecycle: connect with a
//! bounded number of attempts, execute, then always disconnect. Every
//! lifecycle step is recorded on the execution result under the session
//! message key so the transcript shows what happened to the connection.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::execution::{ExecutionResult, MSG_SESSION};
use crate::messages;
use crate::session::traits::{Operation, Session};

/// Connect retry policy. `max_attempts` counts the first attempt, so the
/// default allows one connect and three retries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: 0,
        }
    }
}

pub struct RetrySessionHandler {
    config: RetryConfig,
}

impl RetrySessionHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute `operation`, managing the session lifecycle around it.
    ///
    /// With no session the operation runs directly. Otherwise the session is
    /// connected first, retrying up to the configured attempt count; if the
    /// last attempt fails the operation never runs and no disconnect is
    /// issued. After execution the session is always disconnected. An
    /// execution error takes precedence over a disconnect error, which is
    /// then only recorded as a session message.
    pub async fn execute(
        &self,
        operation: &dyn Operation,
        content: &Value,
        session: Option<&mut dyn Session>,
        result: &ExecutionResult,
    ) -> Result<(), EngineError> {
        let Some(session) = session else {
            result.add_message(
                MSG_SESSION,
                &messages::message("session.null_session", &[]),
            );
            return operation
                .execute(content, None, result)
                .await
                .map_err(|err| EngineError::Operation(err.into()));
        };

        result.add_message(
            MSG_SESSION,
            &messages::message("session.connect", &[session.resource_id()]),
        );
        self.connect_with_retry(&mut *session, result).await?;

        let outcome = operation
            .execute(content, Some(&mut *session), result)
            .await
            .map_err(|err| EngineError::Operation(err.into()));

        result.add_message(
            MSG_SESSION,
            &messages::message("session.disconnect", &[session.resource_id()]),
        );
        match session.disconnect().await {
            Ok(()) => {
                result.add_message(
                    MSG_SESSION,
                    &messages::message("session.disconnected", &[session.resource_id()]),
                );
            }
            Err(err) => {
                result.add_message(
                    MSG_SESSION,
                    &messages::message("session.disconnect_error", &[&err.to_string()]),
                );
                if outcome.is_ok() {
                    return Err(EngineError::Disconnect(err));
                }
                tracing::warn!(
                    resource = session.resource_id(),
                    error = %err,
                    "disconnect failed after operation error"
                );
            }
        }
        outcome
    }

    async fn connect_with_retry(
        &self,
        session: &mut dyn Session,
        result: &ExecutionResult,
    ) -> Result<(), EngineError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match session.connect().await {
                Ok(()) => {
                    result.add_message(
                        MSG_SESSION,
                        &messages::message("session.connected", &[session.resource_id()]),
                    );
                    return Ok(());
                }
                Err(err) if attempt < max_attempts => {
                    let attempt_s = attempt.to_string();
                    let max_s = max_attempts.to_string();
                    let reason = err.to_string();
                    tracing::warn!(
                        resource = session.resource_id(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "connect attempt failed, retrying"
                    );
                    result.add_message(
                        MSG_SESSION,
                        &messages::message(
                            "session.connect_retry",
                            &[&attempt_s, &max_s, session.resource_id(), &reason],
                        ),
                    );
                    if self.config.delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
                    }
                }
                Err(err) => {
                    return Err(EngineError::Connect {
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PluginExecutionError, SessionError};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::any::Any;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakySession {
        connect_attempts: Arc<AtomicU32>,
        disconnects: Arc<AtomicU32>,
        /// Number of connect attempts that fail before one succeeds.
        failures_before_success: u32,
        fail_disconnect: bool,
    }

    impl FlakySession {
        fn new(failures_before_success: u32) -> Self {
            Self {
                connect_attempts: Arc::new(AtomicU32::new(0)),
                disconnects: Arc::new(AtomicU32::new(0)),
                failures_before_success,
                fail_disconnect: false,
            }
        }
    }

    #[async_trait]
    impl Session for FlakySession {
        fn resource_id(&self) -> &str {
            "node-1"
        }

        async fn connect(&mut self) -> Result<(), SessionError> {
            let attempt = self.connect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures_before_success {
                return Err(SessionError::ConnectFailed {
                    resource: "node-1".to_string(),
                    reason: format!("attempt {attempt} refused"),
                });
            }
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), SessionError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                return Err(SessionError::DisconnectFailed {
                    reason: "socket already closed".to_string(),
                });
            }
            Ok(())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct RecordingOperation {
        executions: Arc<AtomicU32>,
        fail: bool,
    }

    impl RecordingOperation {
        fn new() -> Self {
            Self {
                executions: Arc::new(AtomicU32::new(0)),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Operation for RecordingOperation {
        async fn execute(
            &self,
            _content: &Value,
            _session: Option<&mut dyn Session>,
            _result: &ExecutionResult,
        ) -> Result<(), PluginExecutionError> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow::anyhow!("operation blew up").into());
            }
            Ok(())
        }
    }

    fn handler() -> RetrySessionHandler {
        RetrySessionHandler::new(RetryConfig::default())
    }

    #[tokio::test]
    async fn connects_on_fourth_attempt_within_default_budget() {
        let mut session = FlakySession::new(3);
        let attempts = session.connect_attempts.clone();
        let operation = RecordingOperation::new();
        let executions = operation.executions.clone();
        let result = ExecutionResult::root("run operation");

        handler()
            .execute(&operation, &json!({}), Some(&mut session), &result)
            .await
            .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_attempts_skip_operation_and_disconnect() {
        let mut session = FlakySession::new(10);
        let attempts = session.connect_attempts.clone();
        let operation = RecordingOperation::new();
        let executions = operation.executions.clone();
        let result = ExecutionResult::root("run operation");

        let err = handler()
            .execute(&operation, &json!({}), Some(&mut session), &result)
            .await
            .unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(executions.load(Ordering::SeqCst), 0);
        assert_eq!(session.disconnects.load(Ordering::SeqCst), 0);
        match err {
            EngineError::Connect { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn no_session_runs_operation_directly() {
        let operation = RecordingOperation::new();
        let executions = operation.executions.clone();
        let result = ExecutionResult::root("run operation");

        handler()
            .execute(&operation, &json!({}), None, &result)
            .await
            .unwrap();

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        let session_log = result.message(MSG_SESSION).unwrap();
        assert!(session_log.contains("no session"));
    }

    #[tokio::test]
    async fn operation_error_wins_over_disconnect_error() {
        let mut session = FlakySession::new(0);
        session.fail_disconnect = true;
        let operation = RecordingOperation {
            executions: Arc::new(AtomicU32::new(0)),
            fail: true,
        };
        let result = ExecutionResult::root("run operation");

        let err = handler()
            .execute(&operation, &json!({}), Some(&mut session), &result)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Operation(_)));
        assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
        let session_log = result.message(MSG_SESSION).unwrap();
        assert!(session_log.contains("disconnect failed"));
    }

    #[tokio::test]
    async fn disconnect_error_surfaces_when_operation_succeeded() {
        let mut session = FlakySession::new(0);
        session.fail_disconnect = true;
        let operation = RecordingOperation::new();
        let result = ExecutionResult::root("run operation");

        let err = handler()
            .execute(&operation, &json!({}), Some(&mut session), &result)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Disconnect(_)));
    }

    #[tokio::test]
    async fn successful_run_records_session_lifecycle() {
        let mut session = FlakySession::new(1);
        let operation = RecordingOperation::new();
        let result = ExecutionResult::root("run operation");

        handler()
            .execute(&operation, &json!({}), Some(&mut session), &result)
            .await
            .unwrap();

        let session_log = result.message(MSG_SESSION).unwrap();
        assert!(session_log.contains("Connecting session to resource 'node-1'"));
        assert!(session_log.contains("Connect attempt 1 of 4"));
        assert!(session_log.contains("Session connected to resource 'node-1'"));
        assert!(session_log.contains("Session disconnected from resource 'node-1'"));
    }
}
