//! JSON persistence for scheduled operations.

use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::schedule::registry::ScheduledOperation;

/// File-backed store. The whole registry is rewritten on every mutation;
/// the write goes through a sibling temp file and a rename so a crash never
/// leaves a half-written registry behind.
pub struct OperationStore {
    path: PathBuf,
}

impl OperationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all persisted operations. A missing file is an empty registry.
    pub async fn load(&self) -> Result<Vec<ScheduledOperation>, EngineError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&raw).map_err(|err| {
            EngineError::Store(format!(
                "cannot parse scheduled operation store '{}': {err}",
                self.path.display()
            ))
        })
    }

    pub async fn save(&self, operations: &[ScheduledOperation]) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_vec_pretty(operations).map_err(|err| {
            EngineError::Store(format!("cannot serialize scheduled operations: {err}"))
        })?;
        let temp = self.path.with_extension("tmp");
        tokio::fs::write(&temp, &raw).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}
