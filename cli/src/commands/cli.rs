use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "drydock", version, about = "Infrastructure automation engine")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Explicit config file; otherwise ~/.drydock/config.toml then
    /// ./config.toml then built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one operation on a module and print the result tree.
    Run(RunArgs),
    /// Manage the scheduled-operation registry.
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Start the scheduler and keep running until interrupted.
    Serve,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Operation to run, e.g. "test" or "deploy-configuration".
    #[arg(long)]
    pub operation: String,

    /// Module directory name under the modules directory.
    #[arg(long)]
    pub module: String,

    /// Environment whose model document and resource are used.
    #[arg(long)]
    pub environment: String,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// Register a new scheduled operation.
    Create(CreateArgs),
    /// Delete one scheduled operation by name.
    Delete {
        name: String,
    },
    /// Delete every scheduled operation.
    DeleteAll,
    /// List scheduled operations sorted by name.
    List,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CreateArgs {
    /// Unique name of the scheduled operation.
    pub name: String,

    #[arg(long)]
    pub operation: String,

    #[arg(long)]
    pub module: String,

    #[arg(long)]
    pub environment: String,

    /// Six-field cron expression with seconds, e.g. "0 0 3 * * *".
    #[arg(long)]
    pub expression: String,

    #[arg(long, default_value = "")]
    pub description: String,
}
