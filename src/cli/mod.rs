//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Toolpack using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Toolpack - export registered tools as standalone packages
#[derive(Parser, Debug)]
#[command(name = "toolpack")]
#[command(version, about, long_about = None)]
#[command(author = "Toolpack Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "toolpack.toml", env = "TOOLPACK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TOOLPACK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a tool and follow the job until it finishes
    Export(commands::export::ExportArgs),

    /// Show export job status
    Status(commands::status::StatusArgs),

    /// Request cancellation of an export job
    Cancel(commands::cancel::CancelArgs),

    /// Roll back export jobs left unfinished by a previous process
    Recover(commands::recover::RecoverArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
