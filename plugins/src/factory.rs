//! Builders wiring configuration to concrete sessions and operations, and
//! the dispatcher that runs scheduled operations through them.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use drydock_core::config::AppConfig;
use drydock_core::error::EngineError;
use drydock_core::execution::ExecutionResult;
use drydock_core::model::AttributeSchema;
use drydock_core::schedule::{OperationDispatcher, ScheduledOperation};
use drydock_core::session::{Credential, Operation, Resource, RetrySessionHandler};

use crate::http::HttpSession;
use crate::module::ModuleRepository;
use crate::operation::{DeployOperation, TestOperation};

pub const OPERATION_TEST: &str = "test";
pub const OPERATION_DEPLOY: &str = "deploy-configuration";

pub fn build_operation(name: &str, schema: AttributeSchema) -> Result<Box<dyn Operation>> {
    match name {
        OPERATION_TEST => Ok(Box::new(TestOperation::new(schema))),
        OPERATION_DEPLOY => Ok(Box::new(DeployOperation)),
        other => anyhow::bail!("unknown operation '{other}'"),
    }
}

pub fn build_session(cfg: &AppConfig, environment: &str) -> Result<HttpSession> {
    let env = cfg
        .environment(environment)
        .ok_or_else(|| anyhow::anyhow!("unknown environment '{environment}'"))?;

    let credential = match &env.credential {
        Some(id) => {
            let c = cfg.credential(id).ok_or_else(|| {
                anyhow::anyhow!("environment '{environment}' references unknown credential '{id}'")
            })?;
            Some(Credential {
                id: c.id.clone(),
                user: c.user.clone(),
                password: c.password.clone(),
            })
        }
        None => None,
    };

    let mut resource = Resource::new(&env.name);
    resource.credential_id_ref = env.credential.clone();
    resource
        .properties
        .insert("url".to_string(), env.url.clone());
    HttpSession::new(resource, credential)
}

/// Runs operations end to end: load the module content and schema, build
/// the operation and session, and execute through the retry session handler.
pub struct PluginDispatcher {
    config: Arc<AppConfig>,
    handler: RetrySessionHandler,
    modules: ModuleRepository,
}

impl PluginDispatcher {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let handler = RetrySessionHandler::new(config.retry);
        let modules = ModuleRepository::new(config.modules_dir.clone());
        Self {
            config,
            handler,
            modules,
        }
    }

    pub async fn run(
        &self,
        operation: &str,
        module: &str,
        environment: &str,
        result: &ExecutionResult,
    ) -> Result<(), EngineError> {
        let content = self
            .modules
            .load_model(module, environment)
            .await
            .map_err(EngineError::Operation)?;
        let schema = self
            .modules
            .load_schema(module)
            .await
            .map_err(EngineError::Operation)?;
        let op = build_operation(operation, schema).map_err(EngineError::Operation)?;
        let mut session =
            build_session(&self.config, environment).map_err(EngineError::Operation)?;

        tracing::info!(operation, module, environment, "running operation");
        self.handler
            .execute(op.as_ref(), &content, Some(&mut session), result)
            .await
    }
}

#[async_trait]
impl OperationDispatcher for PluginDispatcher {
    async fn dispatch(
        &self,
        operation: &ScheduledOperation,
        result: &ExecutionResult,
    ) -> Result<(), EngineError> {
        self.run(
            &operation.operation,
            &operation.module,
            &operation.environment,
            result,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_core::config::{CredentialConfig, EnvironmentConfig};
    use drydock_core::session::Session;

    fn config() -> AppConfig {
        AppConfig {
            environments: vec![EnvironmentConfig {
                name: "production".to_string(),
                url: "http://admin.example.com:7001".to_string(),
                credential: Some("prod-admin".to_string()),
            }],
            credentials: vec![CredentialConfig {
                id: "prod-admin".to_string(),
                user: "admin".to_string(),
                password: "secret".to_string(),
            }],
            ..AppConfig::default()
        }
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let schema = AttributeSchema::object("root", vec![]);
        assert!(build_operation("frobnicate", schema).is_err());
    }

    #[test]
    fn known_operations_build() {
        assert!(build_operation(OPERATION_TEST, AttributeSchema::object("root", vec![])).is_ok());
        assert!(
            build_operation(OPERATION_DEPLOY, AttributeSchema::object("root", vec![])).is_ok()
        );
    }

    #[test]
    fn session_resolves_environment_and_credential() {
        let session = build_session(&config(), "production").unwrap();
        assert_eq!(session.resource_id(), "production");
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = build_session(&config(), "staging").unwrap_err();
        assert!(err.to_string().contains("unknown environment"));
    }

    #[test]
    fn dangling_credential_reference_is_rejected() {
        let mut cfg = config();
        cfg.credentials.clear();
        let err = build_session(&cfg, "production").unwrap_err();
        assert!(err.to_string().contains("unknown credential"));
    }
}
