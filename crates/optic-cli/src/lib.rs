//! optic5g CLI
//!
//! Command-line front end for the site-selection engine.
//!
//! # Features
//!
//! - **optimize**: catalog CSV in, activation mask (and optional JSON report) out
//! - **validate-mask**: check a mask against a catalog
//! - **layout**: generate a hexagonal baseline catalog
//! - **export**: write the sites a mask activates, simulator-ready
//! - **config**: print the effective configuration as TOML
//!
//! # Usage
//!
//! ```bash
//! # Optimize with the configured backend, mask to stdout
//! optic5g optimize --input sites.csv
//!
//! # Exhaustive backend, mask and report to files
//! optic5g optimize -i sites.csv -o mask.txt --report run.json --backend exhaustive
//!
//! # Check a mask before handing it to the controller
//! optic5g validate-mask --catalog sites.csv --mask-file mask.txt
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod config;

/// optic5g command line interface
#[derive(Parser, Debug)]
#[command(name = "optic5g")]
#[command(author, version, about = "Radio site activation by staged coverage optimization")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error); RUST_LOG is used when absent
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select active sites for a catalog and emit the mask
    Optimize(commands::optimize::OptimizeArgs),

    /// Check a mask against a catalog
    ValidateMask(commands::validate_mask::ValidateMaskArgs),

    /// Generate a hexagonal baseline site layout
    Layout(commands::layout::LayoutArgs),

    /// Export the sites a mask activates
    Export(commands::export::ExportArgs),

    /// Print the effective configuration
    Config(commands::show_config::ConfigArgs),
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Optimize(args) => commands::optimize::run(args, config),
        Commands::ValidateMask(args) => commands::validate_mask::run(args, &config),
        Commands::Layout(args) => commands::layout::run(args),
        Commands::Export(args) => commands::export::run(args, &config),
        Commands::Config(args) => commands::show_config::run(args, &config),
    }
}
