//! Plain-text rendering of an execution result tree.

use drydock_core::execution::{ExecutionResult, ExecutionState, MSG_CAUSE, MSG_ERROR_MESSAGE};

pub fn print_result_tree(result: &ExecutionResult) {
    print_node(result, 0);
}

fn print_node(result: &ExecutionResult, depth: usize) {
    let indent = "  ".repeat(depth);
    let state = result.state();
    println!(
        "{indent}[{}] {} ({} ms)",
        state_marker(state),
        result.description(),
        result.elapsed().as_millis()
    );
    if state == ExecutionState::Failure || state == ExecutionState::Error {
        for key in [MSG_ERROR_MESSAGE, MSG_CAUSE] {
            if let Some(text) = result.message(key) {
                for line in text.lines() {
                    println!("{indent}      {line}");
                }
            }
        }
    }
    for child in result.get_children() {
        print_node(&child, depth + 1);
    }
}

fn state_marker(state: ExecutionState) -> &'static str {
    match state {
        ExecutionState::Executing => "..",
        ExecutionState::Success => "ok",
        ExecutionState::Failure => "FAILED",
        ExecutionState::Error => "ERROR",
    }
}
