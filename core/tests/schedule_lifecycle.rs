//! End-to-end lifecycle tests for the scheduled-operation registry:
//! register, persist, restart, dispatch.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use drydock_core::error::EngineError;
use drydock_core::execution::{ExecutionResult, ExecutionState};
use drydock_core::schedule::{
    CancelPolicy, OperationDispatcher, OperationStore, ScheduledOperation,
    ScheduledOperationRegistry,
};

struct CountingDispatcher {
    dispatched: Arc<AtomicU32>,
}

#[async_trait]
impl OperationDispatcher for CountingDispatcher {
    async fn dispatch(
        &self,
        _operation: &ScheduledOperation,
        _result: &ExecutionResult,
    ) -> Result<(), EngineError> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn registry_at(path: std::path::PathBuf) -> (ScheduledOperationRegistry, Arc<AtomicU32>) {
    let dispatched = Arc::new(AtomicU32::new(0));
    let dispatcher = Arc::new(CountingDispatcher {
        dispatched: dispatched.clone(),
    });
    let registry = ScheduledOperationRegistry::new(
        OperationStore::new(path),
        dispatcher,
        CancelPolicy::Interrupt,
    );
    (registry, dispatched)
}

#[tokio::test]
async fn registrations_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("operations.json");

    let (registry, _) = registry_at(store_path.clone());
    registry
        .create(
            "nightly-deploy",
            "app-config",
            "production",
            "deploy-configuration",
            "deploy the app config every night",
            "0 0 3 * * *",
        )
        .await
        .unwrap();
    registry
        .create(
            "hourly-test",
            "app-config",
            "production",
            "test",
            "",
            "0 0 * * * *",
        )
        .await
        .unwrap();
    registry.delete_all().await.ok();

    // Recreate after delete_all wiped the store: register again, then
    // simulate a restart by building a second registry on the same file.
    registry
        .create(
            "nightly-deploy",
            "app-config",
            "production",
            "deploy-configuration",
            "",
            "0 0 3 * * *",
        )
        .await
        .unwrap();

    let (restarted, _) = registry_at(store_path);
    let result = ExecutionResult::root("Initialize scheduled operations");
    restarted.initialize(&result).await.unwrap();

    assert_eq!(result.state(), ExecutionState::Success);
    let operations = restarted.operations().await;
    assert_eq!(operations.len(), 1);
    assert_eq!(operations[0].operation.name, "nightly-deploy");
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("operations.json");

    let (registry, _) = registry_at(store_path.clone());
    registry
        .create("nightly", "app", "prod", "deploy", "", "0 0 3 * * *")
        .await
        .unwrap();

    let (restarted, _) = registry_at(store_path);
    let first = ExecutionResult::root("Initialize scheduled operations");
    restarted.initialize(&first).await.unwrap();
    let second = ExecutionResult::root("Initialize scheduled operations");
    restarted.initialize(&second).await.unwrap();

    assert_eq!(first.state(), ExecutionState::Success);
    assert_eq!(second.state(), ExecutionState::Success);
    assert_eq!(restarted.operations().await.len(), 1);
}

#[tokio::test]
async fn a_due_trigger_dispatches_the_operation() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, dispatched) = registry_at(dir.path().join("operations.json"));

    // Fires every second.
    registry
        .create("ticker", "app", "prod", "test", "", "* * * * * *")
        .await
        .unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(3), async {
        while dispatched.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("trigger did not fire within three seconds");

    registry.delete("ticker").await.unwrap();
}

#[tokio::test]
async fn deleted_operation_stops_firing() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, dispatched) = registry_at(dir.path().join("operations.json"));

    registry
        .create("ticker", "app", "prod", "test", "", "* * * * * *")
        .await
        .unwrap();
    registry.delete("ticker").await.unwrap();

    let before = dispatched.load(Ordering::SeqCst);
    tokio::time::sleep(std::time::Duration::from_millis(2200)).await;
    assert_eq!(dispatched.load(Ordering::SeqCst), before);
}
