//! Cron trigger tasks.
//!
//! Each registered operation runs on its own tokio task that sleeps until
//! the next cron firing, dispatches the operation with a fresh execution
//! result root, and loops. Cancellation either aborts the task outright or
//! lets an in-flight dispatch drain, depending on the configured policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::execution::ExecutionResult;
use crate::messages;
use crate::schedule::registry::{OperationDispatcher, ScheduledOperation};

/// How a trigger task is taken down when its operation is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelPolicy {
    /// Abort the task immediately, interrupting an in-flight dispatch.
    #[default]
    Interrupt,
    /// Stop firing but let an in-flight dispatch run to completion.
    Drain,
}

pub(crate) struct TriggerHandle {
    task: JoinHandle<()>,
    cancel: watch::Sender<bool>,
}

impl TriggerHandle {
    pub(crate) fn cancel(&self, policy: CancelPolicy) {
        match policy {
            CancelPolicy::Interrupt => self.task.abort(),
            CancelPolicy::Drain => {
                let _ = self.cancel.send(true);
            }
        }
    }
}

pub(crate) fn spawn_trigger(
    operation: ScheduledOperation,
    schedule: cron::Schedule,
    dispatcher: Arc<dyn OperationDispatcher>,
) -> TriggerHandle {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        loop {
            let Some(next) = schedule.after(&Utc::now()).next() else {
                tracing::info!(
                    name = %operation.name,
                    "cron expression has no future firings, trigger task exiting"
                );
                break;
            };
            let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = cancel_rx.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            if *cancel_rx.borrow() {
                break;
            }
            fire(&operation, dispatcher.as_ref()).await;
        }
    });
    TriggerHandle {
        task,
        cancel: cancel_tx,
    }
}

async fn fire(operation: &ScheduledOperation, dispatcher: &dyn OperationDispatcher) {
    let description = messages::message(
        "schedule.trigger_fired",
        &[
            &operation.name,
            &operation.operation,
            &operation.module,
            &operation.environment,
        ],
    );
    tracing::info!(name = %operation.name, "{description}");
    let result = ExecutionResult::root(description);

    match dispatcher.dispatch(operation, &result).await {
        Ok(()) => {
            // Fresh root, completion cannot have happened elsewhere. The
            // root state is computed from the operation's recorded steps.
            let state = result.complete_as_computed(
                "schedule.trigger_completed",
                &[&operation.name],
                "schedule.trigger_run_failed",
                &[&operation.name],
            );
            tracing::info!(name = %operation.name, state = ?state.ok(), "scheduled operation finished");
        }
        Err(err) => {
            let reason = err.to_string();
            let _ = result.complete_as_error(
                "schedule.trigger_failed",
                &[&operation.name, &reason],
                &err,
            );
            tracing::error!(name = %operation.name, error = %err, "scheduled operation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::execution::MSG_ERROR_MESSAGE;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FailingStepDispatcher {
        seen: Mutex<Option<ExecutionResult>>,
    }

    #[async_trait]
    impl OperationDispatcher for FailingStepDispatcher {
        async fn dispatch(
            &self,
            _operation: &ScheduledOperation,
            result: &ExecutionResult,
        ) -> Result<(), EngineError> {
            let step = result.add_child("apply configuration");
            step.complete_as_failure("model.resolve_failed", &["1", "0"])?;
            *self.seen.lock().unwrap() = Some(result.clone());
            Ok(())
        }
    }

    fn operation() -> ScheduledOperation {
        ScheduledOperation {
            name: "nightly".to_string(),
            module: "app".to_string(),
            environment: "prod".to_string(),
            operation: "deploy-configuration".to_string(),
            description: String::new(),
            expression: "0 0 3 * * *".to_string(),
            created: Utc::now(),
        }
    }

    #[tokio::test]
    async fn failed_steps_mark_the_fired_result_and_name_the_operation() {
        let dispatcher = FailingStepDispatcher {
            seen: Mutex::new(None),
        };
        fire(&operation(), &dispatcher).await;

        let result = dispatcher.seen.lock().unwrap().clone().unwrap();
        assert!(result.is_failed());
        let message = result.message(MSG_ERROR_MESSAGE).unwrap();
        assert!(message.contains("'nightly'"));
        assert!(message.contains("1 failure(s) and 0 error(s)"));
    }
}
