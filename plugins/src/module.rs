//! Module repository.
//!
//! A module is a directory under the configured modules directory holding
//! one declared model document per environment (`<environment>.json`) plus
//! the schema the models are resolved against (`schema.json`).

use std::path::{Path, PathBuf};

use serde_json::Value;

use drydock_core::model::AttributeSchema;

pub struct ModuleRepository {
    root: PathBuf,
}

impl ModuleRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn load_model(&self, module: &str, environment: &str) -> anyhow::Result<Value> {
        let path = self.root.join(module).join(format!("{environment}.json"));
        let raw = tokio::fs::read(&path).await.map_err(|err| {
            anyhow::anyhow!(
                "cannot read model for module '{module}' in environment '{environment}' \
                 ({}): {err}",
                path.display()
            )
        })?;
        serde_json::from_slice(&raw)
            .map_err(|err| anyhow::anyhow!("model '{}' is not valid JSON: {err}", path.display()))
    }

    pub async fn load_schema(&self, module: &str) -> anyhow::Result<AttributeSchema> {
        let path = self.root.join(module).join("schema.json");
        let raw = tokio::fs::read(&path).await.map_err(|err| {
            anyhow::anyhow!(
                "cannot read schema for module '{module}' ({}): {err}",
                path.display()
            )
        })?;
        serde_json::from_slice(&raw).map_err(|err| {
            anyhow::anyhow!("schema '{}' is not a valid schema: {err}", path.display())
        })
    }
}
