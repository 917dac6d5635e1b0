mod result;

pub use result::{
    render_cause_chain, ExecutionResult, ExecutionState, MSG_CAUSE, MSG_COMPOSITE,
    MSG_ERROR_MESSAGE, MSG_MESSAGE, MSG_SESSION,
};
