//! Deploy operation: push a declared model to the managed resource.

use async_trait::async_trait;
use serde_json::Value;

use drydock_core::error::PluginExecutionError;
use drydock_core::execution::ExecutionResult;
use drydock_core::session::{Operation, Session};

use crate::http::HttpSession;

pub struct DeployOperation;

#[async_trait]
impl Operation for DeployOperation {
    async fn execute(
        &self,
        content: &Value,
        session: Option<&mut dyn Session>,
        result: &ExecutionResult,
    ) -> Result<(), PluginExecutionError> {
        let session =
            session.ok_or_else(|| anyhow::anyhow!("deploy operation requires a session"))?;
        let resource_id = session.resource_id().to_string();
        let http = session
            .as_any_mut()
            .downcast_mut::<HttpSession>()
            .ok_or_else(|| anyhow::anyhow!("deploy operation requires an HTTP session"))?;

        let child = result.add_child(format!("Deploy model to resource '{resource_id}'"));
        match http.post_document("management/deploy", content).await {
            Ok(()) => {
                child
                    .complete_as_successful("deploy.completed", &[&resource_id])
                    .map_err(anyhow::Error::from)?;
                Ok(())
            }
            Err(err) => {
                child
                    .complete_as_error(
                        "deploy.failed",
                        &[&resource_id, &err.to_string()],
                        err.as_ref(),
                    )
                    .map_err(anyhow::Error::from)?;
                Err(err.into())
            }
        }
    }
}
