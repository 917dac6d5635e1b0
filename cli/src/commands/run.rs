use std::sync::Arc;

use drydock_core::config::AppConfig;
use drydock_core::error::CliError;
use drydock_core::execution::{ExecutionResult, ExecutionState};
use drydock_plugins::factory::PluginDispatcher;

use crate::commands::cli::RunArgs;
use crate::report;

/// Run one operation end to end and print the result tree.
///
/// Exit codes: 0 when every step succeeded, 10 when the operation reported a
/// failure, 20 when it aborted with an error.
pub async fn run(cfg: Arc<AppConfig>, args: RunArgs) -> Result<i32, CliError> {
    let dispatcher = PluginDispatcher::new(cfg);
    let result = ExecutionResult::root(format!(
        "Run operation '{}' on module '{}' in environment '{}'",
        args.operation, args.module, args.environment
    ));

    let outcome = dispatcher
        .run(&args.operation, &args.module, &args.environment, &result)
        .await;

    match outcome {
        Ok(()) => {
            result
                .complete_as_computed("run.completed", &[], "run.failed", &[])
                .map_err(|e| CliError::Command(e.to_string()))?;
        }
        Err(err) => {
            result
                .complete_as_error("run.error", &[&err.to_string()], &err)
                .map_err(|e| CliError::Command(e.to_string()))?;
        }
    }

    report::print_result_tree(&result);
    Ok(match result.state() {
        ExecutionState::Success => 0,
        ExecutionState::Failure => 10,
        _ => 20,
    })
}
