use std::sync::Arc;

use drydock_core::config::AppConfig;
use drydock_core::error::CliError;
use drydock_core::execution::ExecutionResult;
use drydock_core::messages;
use drydock_core::schedule::{OperationStore, ScheduledOperationRegistry};
use drydock_plugins::factory::PluginDispatcher;

use crate::commands::cli::ScheduleCommands;
use crate::report;

fn registry_from_config(cfg: Arc<AppConfig>) -> ScheduledOperationRegistry {
    let store = OperationStore::new(cfg.scheduler.store_path.clone());
    let cancel_policy = cfg.scheduler.cancel_policy;
    let dispatcher = Arc::new(PluginDispatcher::new(cfg));
    ScheduledOperationRegistry::new(store, dispatcher, cancel_policy)
}

/// One-shot registry commands. The registry is loaded from the store first
/// so conflicts and deletions are checked against persisted operations.
pub async fn schedule(cfg: Arc<AppConfig>, command: ScheduleCommands) -> Result<i32, CliError> {
    let registry = registry_from_config(cfg);
    let init = ExecutionResult::root(messages::message("schedule.initialize", &[]));
    registry.initialize(&init).await?;

    match command {
        ScheduleCommands::Create(args) => {
            let scheduled = registry
                .create(
                    &args.name,
                    &args.module,
                    &args.environment,
                    &args.operation,
                    &args.description,
                    &args.expression,
                )
                .await?;
            println!(
                "Scheduled operation '{}' registered with expression '{}'.",
                scheduled.name, scheduled.expression
            );
            Ok(0)
        }
        ScheduleCommands::Delete { name } => {
            registry.delete(&name).await?;
            println!("Scheduled operation '{name}' deleted.");
            Ok(0)
        }
        ScheduleCommands::DeleteAll => {
            registry.delete_all().await?;
            println!("All scheduled operations deleted.");
            Ok(0)
        }
        ScheduleCommands::List => {
            let operations = registry.operations().await;
            if operations.is_empty() {
                println!("No scheduled operations.");
                return Ok(0);
            }
            for info in operations {
                let next = info
                    .next_firing
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  {}  next: {}  ({} on '{}' in '{}')",
                    info.operation.name,
                    info.operation.expression,
                    next,
                    info.operation.operation,
                    info.operation.module,
                    info.operation.environment
                );
            }
            Ok(0)
        }
    }
}

/// Start the scheduler and keep the process alive until ctrl-c.
pub async fn serve(cfg: Arc<AppConfig>) -> Result<i32, CliError> {
    let registry = registry_from_config(cfg);
    let init = ExecutionResult::root(messages::message("schedule.initialize", &[]));
    registry.initialize(&init).await?;
    report::print_result_tree(&init);

    let count = registry.operations().await.len();
    tracing::info!(count, "scheduler running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(0)
}
