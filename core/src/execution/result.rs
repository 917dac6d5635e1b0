use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use crate::error::ExecutionError;
use crate::messages;

/// Message key for the primary human readable message of a result.
pub const MSG_MESSAGE: &str = "message";
/// Message key for the human readable message of a failed or errored result.
pub const MSG_ERROR_MESSAGE: &str = "error-message";
/// Message key for the technical cause chain of an errored result.
pub const MSG_CAUSE: &str = "cause";
/// Message key for session lifecycle information.
pub const MSG_SESSION: &str = "session";
/// Message key for the composite child summary of a computed result.
pub const MSG_COMPOSITE: &str = "composite-summary";

/// Execution state of a result node.
///
/// A node starts `Executing` and transitions exactly once to one of the
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Executing,
    Success,
    Failure,
    Error,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionState::Executing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionState::Executing => "executing",
            ExecutionState::Success => "success",
            ExecutionState::Failure => "failure",
            ExecutionState::Error => "error",
        }
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ResultNode {
    id: String,
    description: String,
    state: ExecutionState,
    /// Ordered message map; keys are unique, later additions under the same
    /// key are joined with a newline.
    messages: Vec<(String, String)>,
    children: Vec<ExecutionResult>,
    parent: Weak<Mutex<ResultNode>>,
    started: Instant,
    elapsed: Option<Duration>,
}

impl ResultNode {
    fn new(description: String, parent: Weak<Mutex<ResultNode>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description,
            state: ExecutionState::Executing,
            messages: Vec::new(),
            children: Vec::new(),
            parent,
            started: Instant::now(),
            elapsed: None,
        }
    }

    fn add_message(&mut self, key: &str, value: &str) {
        match self.messages.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => self.messages.push((key.to_string(), value.to_string())),
        }
    }

    fn set_terminal(&mut self, state: ExecutionState) {
        self.state = state;
        self.elapsed = Some(self.started.elapsed());
        tracing::debug!(
            result = %self.description,
            state = %state,
            "result completed"
        );
    }
}

/// One node in the hierarchical outcome tree of an operation invocation.
///
/// The handle is cheap to clone; all clones refer to the same node. A tree is
/// single-writer: it is owned by the execution that created it and must not be
/// mutated concurrently.
#[derive(Clone)]
pub struct ExecutionResult {
    inner: Arc<Mutex<ResultNode>>,
}

impl ExecutionResult {
    /// Create a root result for a new operation invocation.
    pub fn root(description: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResultNode::new(description.into(), Weak::new()))),
        }
    }

    /// Append a new child in `Executing` state. Children keep creation order.
    pub fn add_child(&self, description: impl Into<String>) -> ExecutionResult {
        let child = ExecutionResult {
            inner: Arc::new(Mutex::new(ResultNode::new(
                description.into(),
                Arc::downgrade(&self.inner),
            ))),
        };
        self.lock().children.push(child.clone());
        child
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResultNode> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn id(&self) -> String {
        self.lock().id.clone()
    }

    pub fn description(&self) -> String {
        self.lock().description.clone()
    }

    pub fn state(&self) -> ExecutionState {
        self.lock().state
    }

    pub fn is_executing(&self) -> bool {
        self.state() == ExecutionState::Executing
    }

    pub fn is_success(&self) -> bool {
        self.state() == ExecutionState::Success
    }

    pub fn is_failed(&self) -> bool {
        self.state() == ExecutionState::Failure
    }

    pub fn is_error(&self) -> bool {
        self.state() == ExecutionState::Error
    }

    pub fn is_root(&self) -> bool {
        self.lock().parent.upgrade().is_none()
    }

    /// Snapshot of the ordered message map.
    pub fn get_messages(&self) -> Vec<(String, String)> {
        self.lock().messages.clone()
    }

    /// Value stored under a message key, if any.
    pub fn message(&self, key: &str) -> Option<String> {
        self.lock()
            .messages
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn get_children(&self) -> Vec<ExecutionResult> {
        self.lock().children.clone()
    }

    pub fn get_first_child(&self) -> Option<ExecutionResult> {
        self.lock().children.first().cloned()
    }

    pub fn children_with_state(&self, state: ExecutionState) -> Vec<ExecutionResult> {
        self.get_children()
            .into_iter()
            .filter(|c| c.state() == state)
            .collect()
    }

    /// Root of the tree this node belongs to.
    pub fn get_root(&self) -> ExecutionResult {
        let mut current = self.clone();
        loop {
            let parent = current.lock().parent.upgrade();
            match parent {
                Some(inner) => current = ExecutionResult { inner },
                None => return current,
            }
        }
    }

    /// Wall clock time spent in this node. Frozen when the node completes.
    pub fn elapsed(&self) -> Duration {
        let node = self.lock();
        node.elapsed.unwrap_or_else(|| node.started.elapsed())
    }

    /// Attach metadata to the node without changing its state.
    pub fn add_message(&self, key: &str, value: &str) {
        self.lock().add_message(key, value);
    }

    fn ensure_executing(&self) -> Result<(), ExecutionError> {
        let node = self.lock();
        if node.state.is_terminal() {
            return Err(ExecutionError::AlreadyCompleted {
                description: node.description.clone(),
            });
        }
        Ok(())
    }

    /// Complete with `Success` and a message rendered from the catalog.
    pub fn complete_as_successful(&self, key: &str, args: &[&str]) -> Result<(), ExecutionError> {
        self.ensure_executing()?;
        let mut node = self.lock();
        node.add_message(MSG_MESSAGE, &messages::message(key, args));
        node.set_terminal(ExecutionState::Success);
        Ok(())
    }

    /// Complete with `Failure` and a message rendered from the catalog.
    pub fn complete_as_failure(&self, key: &str, args: &[&str]) -> Result<(), ExecutionError> {
        self.ensure_executing()?;
        let mut node = self.lock();
        node.add_message(MSG_ERROR_MESSAGE, &messages::message(key, args));
        node.set_terminal(ExecutionState::Failure);
        Ok(())
    }

    /// Complete with `Error`, a message rendered from the catalog and the
    /// technical cause chain under [`MSG_CAUSE`].
    pub fn complete_as_error(
        &self,
        key: &str,
        args: &[&str],
        cause: &dyn std::error::Error,
    ) -> Result<(), ExecutionError> {
        self.ensure_executing()?;
        let mut node = self.lock();
        node.add_message(MSG_ERROR_MESSAGE, &messages::message(key, args));
        node.add_message(MSG_CAUSE, &render_cause_chain(cause));
        node.set_terminal(ExecutionState::Error);
        Ok(())
    }

    /// Complete by aggregating child outcomes.
    ///
    /// Zero children is vacuous success. A child `Error` dominates `Failure`;
    /// a child still `Executing` at computation time is forced to `Error`.
    /// The success message comes from `success_key`; otherwise `failure_key`
    /// is rendered with the failed and errored counts prepended to
    /// `failure_args`. Returns the computed state.
    pub fn complete_as_computed(
        &self,
        success_key: &str,
        success_args: &[&str],
        failure_key: &str,
        failure_args: &[&str],
    ) -> Result<ExecutionState, ExecutionError> {
        self.ensure_executing()?;

        let children = self.get_children();
        let mut successful = 0usize;
        let mut failed = 0usize;
        let mut errors = 0usize;
        for child in &children {
            match child.state() {
                ExecutionState::Success => successful += 1,
                ExecutionState::Failure => failed += 1,
                ExecutionState::Error => errors += 1,
                ExecutionState::Executing => {
                    // A child that never completed is an error in the step
                    // that was supposed to complete it.
                    child.add_message(MSG_MESSAGE, &messages::message("execution.forced_error", &[]));
                    let mut node = child.lock();
                    node.set_terminal(ExecutionState::Error);
                    errors += 1;
                }
            }
        }

        let total = children.len().to_string();
        let successful_s = successful.to_string();
        let failed_s = failed.to_string();
        let errors_s = errors.to_string();
        let summary = messages::message(
            "execution.composite_summary",
            &[&total, &successful_s, &failed_s, &errors_s],
        );

        let state = if errors > 0 {
            ExecutionState::Error
        } else if failed > 0 {
            ExecutionState::Failure
        } else {
            ExecutionState::Success
        };

        let mut node = self.lock();
        node.add_message(MSG_COMPOSITE, &summary);
        match state {
            ExecutionState::Success => {
                node.add_message(MSG_MESSAGE, &messages::message(success_key, success_args));
            }
            _ => {
                let mut args: Vec<&str> = vec![&failed_s, &errors_s];
                args.extend_from_slice(failure_args);
                node.add_message(MSG_ERROR_MESSAGE, &messages::message(failure_key, &args));
            }
        }
        node.set_terminal(state);
        Ok(state)
    }
}

impl std::fmt::Debug for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.lock();
        f.debug_struct("ExecutionResult")
            .field("description", &node.description)
            .field("state", &node.state)
            .field("children", &node.children.len())
            .finish()
    }
}

/// Render an error and its source chain as one string.
pub fn render_cause_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_root_is_executing() {
        let result = ExecutionResult::root("run operation");
        assert!(result.is_executing());
        assert!(result.is_root());
        assert!(result.get_children().is_empty());
        assert!(result.get_first_child().is_none());
    }

    #[test]
    fn add_child_preserves_creation_order() {
        let root = ExecutionResult::root("root");
        root.add_child("first");
        root.add_child("second");
        root.add_child("third");
        let descriptions: Vec<String> = root
            .get_children()
            .iter()
            .map(|c| c.description())
            .collect();
        assert_eq!(descriptions, vec!["first", "second", "third"]);
        assert_eq!(root.get_first_child().unwrap().description(), "first");
    }

    #[test]
    fn child_knows_its_root() {
        let root = ExecutionResult::root("root");
        let child = root.add_child("child");
        let grandchild = child.add_child("grandchild");
        assert!(!grandchild.is_root());
        assert_eq!(grandchild.get_root().id(), root.id());
    }

    #[test]
    fn computed_with_zero_children_is_success() {
        let root = ExecutionResult::root("root");
        let state = root
            .complete_as_computed("model.resolve_completed", &["0"], "model.resolve_failed", &[])
            .unwrap();
        assert_eq!(state, ExecutionState::Success);
        assert!(root.is_success());
    }

    #[test]
    fn computed_with_failed_child_is_failure() {
        let root = ExecutionResult::root("root");
        let ok = root.add_child("ok");
        ok.complete_as_successful("model.resolve_completed", &["1"]).unwrap();
        let bad = root.add_child("bad");
        bad.complete_as_failure("model.resolve_failed", &["1", "0"]).unwrap();

        let state = root
            .complete_as_computed("model.resolve_completed", &["2"], "model.resolve_failed", &[])
            .unwrap();
        assert_eq!(state, ExecutionState::Failure);
        let summary = root.message(MSG_COMPOSITE).unwrap();
        assert_eq!(summary, "Results: 2, successful: 1, failures: 1, errors: 0.");
    }

    #[test]
    fn computed_error_dominates_failure() {
        let root = ExecutionResult::root("root");
        root.add_child("failed")
            .complete_as_failure("model.resolve_failed", &["1", "0"])
            .unwrap();
        root.add_child("errored")
            .complete_as_error(
                "model.attribute_unresolved",
                &["boom"],
                &std::io::Error::other("boom"),
            )
            .unwrap();

        let state = root
            .complete_as_computed("model.resolve_completed", &["2"], "model.resolve_failed", &[])
            .unwrap();
        assert_eq!(state, ExecutionState::Error);
    }

    #[test]
    fn computed_forces_executing_child_to_error() {
        let root = ExecutionResult::root("root");
        let dangling = root.add_child("never completed");
        let state = root
            .complete_as_computed("model.resolve_completed", &["1"], "model.resolve_failed", &[])
            .unwrap();
        assert_eq!(state, ExecutionState::Error);
        assert!(dangling.is_error());
    }

    #[test]
    fn completing_twice_is_reported() {
        let root = ExecutionResult::root("root");
        root.complete_as_successful("model.resolve_completed", &["0"]).unwrap();
        let err = root
            .complete_as_failure("model.resolve_failed", &[])
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionError::AlreadyCompleted {
                description: "root".to_string()
            }
        );
        // state unchanged
        assert!(root.is_success());
    }

    #[test]
    fn messages_keep_order_and_append_with_newline() {
        let root = ExecutionResult::root("root");
        root.add_message("session", "connecting");
        root.add_message("detail", "x");
        root.add_message("session", "connected");
        let messages = root.get_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, "session");
        assert_eq!(messages[0].1, "connecting\nconnected");
        assert_eq!(messages[1].0, "detail");
    }

    #[test]
    fn error_completion_records_cause_chain() {
        let root = ExecutionResult::root("root");
        let cause = std::io::Error::other("disk gone");
        root.complete_as_error("schedule.trigger_failed", &["dump", "io"], &cause)
            .unwrap();
        assert!(root.is_error());
        assert!(root.message(MSG_CAUSE).unwrap().contains("disk gone"));
    }
}
