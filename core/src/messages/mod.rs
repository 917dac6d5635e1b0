//! Message catalog for human readable result messages.
//!
//! Every terminal execution result carries a message rendered from a catalog
//! key plus positional arguments, so failures are explainable without
//! inspecting error chains. Templates use `{0}`, `{1}`, .. placeholders.

use std::collections::HashMap;

use lazy_static::lazy_static;

lazy_static! {
    static ref CATALOG: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        // execution result tree
        m.insert(
            "execution.composite_summary",
            "Results: {0}, successful: {1}, failures: {2}, errors: {3}.",
        );
        m.insert(
            "execution.forced_error",
            "State is forced to error because it was never set explicitly.",
        );
        // session handler
        m.insert("session.null_session", "Operation requires no session, session handling skipped.");
        m.insert("session.connect", "Connecting session to resource '{0}'.");
        m.insert("session.connected", "Session connected to resource '{0}'.");
        m.insert(
            "session.connect_retry",
            "Connect attempt {0} of {1} to resource '{2}' failed: {3}",
        );
        m.insert("session.disconnect", "Disconnecting session from resource '{0}'.");
        m.insert("session.disconnected", "Session disconnected from resource '{0}'.");
        m.insert("session.disconnect_error", "Session disconnect failed: {0}");
        // scheduled operations
        m.insert("schedule.initialize", "Initialize scheduled operations.");
        m.insert("schedule.initialize_completed", "Loaded {0} scheduled operation(s).");
        m.insert(
            "schedule.initialize_failed",
            "Loading scheduled operations completed with {0} failure(s) and {1} error(s).",
        );
        m.insert(
            "schedule.trigger_fired",
            "Scheduled operation '{0}' triggered: operation '{1}' on module '{2}' in environment '{3}'.",
        );
        m.insert("schedule.trigger_failed", "Scheduled operation '{0}' failed: {1}");
        m.insert("schedule.trigger_completed", "Scheduled operation '{0}' completed.");
        m.insert(
            "schedule.trigger_run_failed",
            "Scheduled operation '{2}' completed with {0} failure(s) and {1} error(s).",
        );
        // model reconciliation
        m.insert("model.resolve", "Resolve declared model against live state.");
        m.insert("model.resolve_completed", "Resolved {0} attribute(s).");
        m.insert("model.resolve_failed", "Model resolution completed with {0} failure(s) and {1} error(s).");
        m.insert("model.attribute_resolved", "Resolved attribute '{0}' as {1}.");
        m.insert("model.attribute_unresolved", "Could not resolve attribute: {0}");
        // one-shot runs
        m.insert("run.completed", "Operation completed.");
        m.insert(
            "run.failed",
            "Operation completed with {0} failure(s) and {1} error(s).",
        );
        m.insert("run.error", "Operation aborted: {0}");
        // plugin operations
        m.insert("test.attribute_equal", "Attribute '{0}' matches live state.");
        m.insert(
            "test.attribute_different",
            "Attribute '{0}' differs: declared {1}, live {2}.",
        );
        m.insert("test.completed", "Declared model matches live state.");
        m.insert("test.failed", "Declared model differs from live state.");
        m.insert("deploy.completed", "Model deployed to resource '{0}'.");
        m.insert("deploy.failed", "Model deployment to resource '{0}' failed: {1}");
        m
    };
}

/// Render the catalog template for `key` with positional `args`.
///
/// Unknown keys fall back to the key itself followed by the arguments, so a
/// missing template never hides a result.
pub fn message(key: &str, args: &[&str]) -> String {
    match CATALOG.get(key) {
        Some(template) => {
            let mut rendered = (*template).to_string();
            for (i, arg) in args.iter().enumerate() {
                rendered = rendered.replace(&format!("{{{i}}}"), arg);
            }
            rendered
        }
        None => {
            if args.is_empty() {
                key.to_string()
            } else {
                format!("{key}: {}", args.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_positional_arguments() {
        let msg = message("session.connect", &["node-1"]);
        assert_eq!(msg, "Connecting session to resource 'node-1'.");
    }

    #[test]
    fn renders_multiple_arguments_in_order() {
        let msg = message("execution.composite_summary", &["3", "2", "1", "0"]);
        assert_eq!(msg, "Results: 3, successful: 2, failures: 1, errors: 0.");
    }

    #[test]
    fn unknown_key_falls_back_to_key_and_args() {
        let msg = message("no.such.key", &["a", "b"]);
        assert_eq!(msg, "no.such.key: a, b");
    }
}
