use std::any::Any;
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PluginExecutionError, SessionError};
use crate::execution::ExecutionResult;

/// Addressable target a session connects to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    /// Reference to the credential used when connecting, if any.
    #[serde(default)]
    pub credential_id_ref: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Resource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            credential_id_ref: None,
            properties: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub user: String,
    pub password: String,
}

/// Stateful connection to a managed resource.
///
/// A session is constructed against a [`Resource`] (and credential) and owns
/// the connection lifecycle; the handler drives `connect` and `disconnect`
/// around operation execution. `as_any_mut` lets an operation downcast to
/// the concrete session type it was paired with.
#[async_trait]
pub trait Session: Send {
    fn resource_id(&self) -> &str;

    async fn connect(&mut self) -> Result<(), SessionError>;

    async fn disconnect(&mut self) -> Result<(), SessionError>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A unit of work executed against an optional session.
///
/// Implementations record progress on `result` as child results and
/// messages; the returned error is reserved for faults that prevent the
/// operation from reporting its own outcome.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn execute(
        &self,
        content: &Value,
        session: Option<&mut dyn Session>,
        result: &ExecutionResult,
    ) -> Result<(), PluginExecutionError>;
}
