//! Scheduled-operation registry.
//!
//! Named recurring operations keyed by unique name. Registration validates
//! the request and parses its cron expression before anything is mutated;
//! every mutation is persisted to the backing store before it returns.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::EngineError;
use crate::execution::ExecutionResult;
use crate::schedule::store::OperationStore;
use crate::schedule::trigger::{spawn_trigger, CancelPolicy, TriggerHandle};

/// A named recurring operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOperation {
    pub name: String,
    pub module: String,
    pub environment: String,
    pub operation: String,
    #[serde(default)]
    pub description: String,
    /// Six-field cron expression with seconds resolution.
    pub expression: String,
    pub created: DateTime<Utc>,
}

/// Listing view of a registered operation with its next firing time.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledOperationInfo {
    #[serde(flatten)]
    pub operation: ScheduledOperation,
    pub next_firing: Option<DateTime<Utc>>,
}

/// Executes a scheduled operation when its trigger fires.
#[async_trait]
pub trait OperationDispatcher: Send + Sync + 'static {
    async fn dispatch(
        &self,
        operation: &ScheduledOperation,
        result: &ExecutionResult,
    ) -> Result<(), EngineError>;
}

struct Entry {
    operation: ScheduledOperation,
    schedule: cron::Schedule,
    trigger: TriggerHandle,
}

pub struct ScheduledOperationRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    store: OperationStore,
    dispatcher: Arc<dyn OperationDispatcher>,
    cancel_policy: CancelPolicy,
}

impl ScheduledOperationRegistry {
    pub fn new(
        store: OperationStore,
        dispatcher: Arc<dyn OperationDispatcher>,
        cancel_policy: CancelPolicy,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store,
            dispatcher,
            cancel_policy,
        }
    }

    /// Load persisted operations and start their triggers.
    ///
    /// Idempotent: operations already registered under the same name are
    /// left untouched. Records one child result per loaded operation and
    /// completes `result` from the children.
    pub async fn initialize(&self, result: &ExecutionResult) -> Result<(), EngineError> {
        let persisted = self.store.load().await?;
        let mut entries = self.entries.lock().await;
        let mut loaded = 0usize;

        for operation in persisted {
            let child = result.add_child(format!(
                "Start trigger for scheduled operation '{}'",
                operation.name
            ));
            if entries.contains_key(&operation.name) {
                child.complete_as_successful(
                    "schedule.trigger_completed",
                    &[&operation.name],
                )?;
                continue;
            }
            match cron::Schedule::from_str(&operation.expression) {
                Ok(schedule) => {
                    let trigger = spawn_trigger(
                        operation.clone(),
                        schedule.clone(),
                        self.dispatcher.clone(),
                    );
                    entries.insert(
                        operation.name.clone(),
                        Entry {
                            operation: operation.clone(),
                            schedule,
                            trigger,
                        },
                    );
                    loaded += 1;
                    child.complete_as_successful(
                        "schedule.trigger_completed",
                        &[&operation.name],
                    )?;
                }
                Err(err) => {
                    // Persisted expressions were validated at registration;
                    // a parse failure here means the store was edited by hand.
                    child.complete_as_error(
                        "schedule.trigger_failed",
                        &[&operation.name, &err.to_string()],
                        &err,
                    )?;
                }
            }
        }
        drop(entries);

        let loaded_s = loaded.to_string();
        result.complete_as_computed(
            "schedule.initialize_completed",
            &[&loaded_s],
            "schedule.initialize_failed",
            &[],
        )?;
        Ok(())
    }

    /// Register a new operation, start its trigger and persist the registry.
    pub async fn create(
        &self,
        name: &str,
        module: &str,
        environment: &str,
        operation: &str,
        description: &str,
        expression: &str,
    ) -> Result<ScheduledOperation, EngineError> {
        validate_non_empty("name", name)?;
        validate_non_empty("module", module)?;
        validate_non_empty("environment", environment)?;
        validate_non_empty("operation", operation)?;
        validate_non_empty("expression", expression)?;
        // description may be empty

        let schedule = cron::Schedule::from_str(expression).map_err(|err| {
            EngineError::Cron {
                expression: expression.to_string(),
                reason: err.to_string(),
            }
        })?;

        let mut entries = self.entries.lock().await;
        if entries.contains_key(name) {
            return Err(EngineError::SchedulingConflict {
                name: name.to_string(),
            });
        }

        let scheduled = ScheduledOperation {
            name: name.to_string(),
            module: module.to_string(),
            environment: environment.to_string(),
            operation: operation.to_string(),
            description: description.to_string(),
            expression: expression.to_string(),
            created: Utc::now(),
        };
        let trigger = spawn_trigger(scheduled.clone(), schedule.clone(), self.dispatcher.clone());
        entries.insert(
            name.to_string(),
            Entry {
                operation: scheduled.clone(),
                schedule,
                trigger,
            },
        );
        self.persist(&entries).await?;
        tracing::info!(name, expression, "scheduled operation registered");
        Ok(scheduled)
    }

    /// Persist the registry without the named operation, then cancel its
    /// trigger. The entry is restored when the save fails, so memory and
    /// store never diverge.
    pub async fn delete(&self, name: &str) -> Result<(), EngineError> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(name).ok_or_else(|| EngineError::NotFound {
            name: name.to_string(),
        })?;
        if let Err(err) = self.persist(&entries).await {
            entries.insert(name.to_string(), entry);
            return Err(err);
        }
        entry.trigger.cancel(self.cancel_policy);
        tracing::info!(name, "scheduled operation deleted");
        Ok(())
    }

    /// Cancel and remove every operation, then persist the empty registry.
    pub async fn delete_all(&self) -> Result<(), EngineError> {
        let mut entries = self.entries.lock().await;
        for entry in entries.values() {
            entry.trigger.cancel(self.cancel_policy);
        }
        let deleted = entries.len();
        entries.clear();
        self.persist(&entries).await?;
        tracing::info!(deleted, "all scheduled operations deleted");
        Ok(())
    }

    /// All registered operations sorted by name.
    pub async fn operations(&self) -> Vec<ScheduledOperationInfo> {
        let entries = self.entries.lock().await;
        let mut infos: Vec<ScheduledOperationInfo> = entries
            .values()
            .map(|entry| ScheduledOperationInfo {
                operation: entry.operation.clone(),
                next_firing: entry.schedule.after(&Utc::now()).next(),
            })
            .collect();
        infos.sort_by(|a, b| a.operation.name.cmp(&b.operation.name));
        infos
    }

    async fn persist(&self, entries: &HashMap<String, Entry>) -> Result<(), EngineError> {
        let mut operations: Vec<ScheduledOperation> =
            entries.values().map(|e| e.operation.clone()).collect();
        operations.sort_by(|a, b| a.name.cmp(&b.name));
        self.store.save(&operations).await
    }
}

fn validate_non_empty(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!(
            "scheduled operation {field} must not be empty"
        )));
    }
    Ok(())
}
