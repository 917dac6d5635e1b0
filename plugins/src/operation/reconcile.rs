//! Test operation: reconcile a declared model against live state.

use async_trait::async_trait;
use serde_json::Value;

use drydock_core::error::PluginExecutionError;
use drydock_core::execution::ExecutionResult;
use drydock_core::messages;
use drydock_core::model::{
    build_resolved_model, AttributeSchema, ResolvedKind, SchemaResolver,
};
use drydock_core::session::{Operation, Session};

use crate::http::HttpSession;

/// Resolves the declared model and the live state through the module schema
/// and compares every resolved attribute pair. The operation fails (rather
/// than errors) when the models differ; only structural faults such as a
/// missing session are reported as errors.
pub struct TestOperation {
    schema: AttributeSchema,
}

impl TestOperation {
    pub fn new(schema: AttributeSchema) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Operation for TestOperation {
    async fn execute(
        &self,
        content: &Value,
        session: Option<&mut dyn Session>,
        result: &ExecutionResult,
    ) -> Result<(), PluginExecutionError> {
        let session =
            session.ok_or_else(|| anyhow::anyhow!("test operation requires a session"))?;
        let http = session
            .as_any_mut()
            .downcast_mut::<HttpSession>()
            .ok_or_else(|| anyhow::anyhow!("test operation requires an HTTP session"))?;
        let live = http
            .live_state()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("session carries no live state, was it connected?"))?;

        let resolver = SchemaResolver::new(self.schema.clone());
        let resolve_result = result.add_child(messages::message("model.resolve", &[]));
        let model = build_resolved_model(
            &resolver,
            &resolver,
            resolver.root_participant(content.clone()),
            resolver.root_participant(live),
            &resolve_result,
        )
        .map_err(anyhow::Error::from)?;

        let compare_result = result.add_child("Compare declared model against live state");
        for id in model.iter_depth_first() {
            let node = model.node(id);
            if node.is_root() {
                continue;
            }
            if !matches!(node.kind(), ResolvedKind::Primitive | ResolvedKind::Enum) {
                continue;
            }
            let declared = node.primary_participant();
            let live = node.secondary_participant();
            let child =
                compare_result.add_child(format!("Compare attribute '{}'", declared.name()));
            if declared.value() == live.value() {
                child
                    .complete_as_successful("test.attribute_equal", &[declared.name()])
                    .map_err(anyhow::Error::from)?;
            } else {
                child
                    .complete_as_failure(
                        "test.attribute_different",
                        &[
                            declared.name(),
                            &declared.value_as_single_line(),
                            &live.value_as_single_line(),
                        ],
                    )
                    .map_err(anyhow::Error::from)?;
            }
        }
        compare_result
            .complete_as_computed("test.completed", &[], "test.failed", &[])
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}
