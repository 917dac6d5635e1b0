use serde::{Deserialize, Serialize};

use crate::schedule::CancelPolicy;
use crate::session::RetryConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Directory holding modules: one subdirectory per module with one
    /// model document per environment plus the module schema.
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,

    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            retry: RetryConfig::default(),
            scheduler: SchedulerConfig::default(),
            modules_dir: default_modules_dir(),
            environments: Vec::new(),
            credentials: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "drydock_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Path of the JSON file persisting the scheduled-operation registry.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    #[serde(default)]
    pub cancel_policy: CancelPolicy,
}

fn default_store_path() -> String {
    "scheduled-operations.json".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            cancel_policy: CancelPolicy::default(),
        }
    }
}

/// A managed environment: the resource a session connects to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub id: String,
    pub user: String,
    pub password: String,
}

impl AppConfig {
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|e| e.name == name)
    }

    pub fn credential(&self, id: &str) -> Option<&CredentialConfig> {
        self.credentials.iter().find(|c| c.id == id)
    }
}
