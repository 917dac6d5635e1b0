use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default drydock data directory: ~/.drydock
pub fn get_drydock_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".drydock"))
}

/// Load configuration with the usual precedence:
/// ~/.drydock/config.toml, then ./config.toml, then built-in defaults.
pub fn load_default() -> anyhow::Result<AppConfig> {
    let drydock_dir = get_drydock_data_dir()?;
    let home_config = drydock_dir.join("config.toml");
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if home_config.exists() {
        let s = std::fs::read_to_string(&home_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else {
        AppConfig::default()
    };

    // Anchor relative default paths under the data directory.
    if cfg.scheduler.store_path == super::types::SchedulerConfig::default().store_path {
        cfg.scheduler.store_path = drydock_dir
            .join("scheduled-operations.json")
            .to_string_lossy()
            .to_string();
    }

    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        let logs_dir = drydock_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    Ok(cfg)
}

/// Load configuration from an explicit TOML file.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("cannot read config '{}': {err}", path.display()))?;
    Ok(toml::from_str::<AppConfig>(&s)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_to_empty_config() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.retry.max_attempts, 4);
        assert_eq!(cfg.modules_dir, "modules");
        assert!(cfg.logging.console);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [retry]
            max_attempts = 2

            [[environments]]
            name = "production"
            url = "http://admin.example.com:7001"
            credential = "prod-admin"

            [[credentials]]
            id = "prod-admin"
            user = "admin"
            password = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.retry.delay_ms, 0);
        assert_eq!(cfg.environment("production").unwrap().url, "http://admin.example.com:7001");
        assert_eq!(cfg.credential("prod-admin").unwrap().user, "admin");
    }

    #[test]
    fn cancel_policy_parses_lowercase() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [scheduler]
            cancel_policy = "drain"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scheduler.cancel_policy, crate::schedule::CancelPolicy::Drain);
    }

    #[test]
    fn explicit_file_load_reports_missing_file() {
        let err = load_from_path(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
