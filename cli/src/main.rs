use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use drydock_core::error::{CliError, EngineError};

mod commands;
mod report;

use commands::cli;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = match &args.config {
        Some(path) => drydock_core::config::load_from_path(path)
            .map_err(|e| CliError::Config(e.to_string()))?,
        None => drydock_core::config::load_default()
            .map_err(|e| CliError::Config(e.to_string()))?,
    };
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    let cfg = Arc::new(cfg);
    match args.command {
        cli::Commands::Run(run_args) => commands::run::run(cfg, run_args).await,
        cli::Commands::Schedule { command } => commands::schedule::schedule(cfg, command).await,
        cli::Commands::Serve => commands::schedule::serve(cfg).await,
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 10: operation reported a failure (returned as a normal exit code)
    // 11: config error
    // 12: invalid request (validation, cron expression)
    // 13: registry conflict / not found
    // 20: connectivity or IO error
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Engine(ee) => match ee {
            EngineError::Validation(_) | EngineError::Cron { .. } => 12,
            EngineError::SchedulingConflict { .. } | EngineError::NotFound { .. } => 13,
            EngineError::Connect { .. } | EngineError::Disconnect(_) => 20,
            EngineError::Store(_) | EngineError::Io(_) => 20,
            EngineError::Config(_) => 11,
            EngineError::Operation(_) | EngineError::Execution(_) => 50,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &drydock_core::config::LoggingConfig) -> Result<(), String> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("drydock"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("drydock.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
