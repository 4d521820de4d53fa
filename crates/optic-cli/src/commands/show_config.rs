//! `optic5g config`

use std::path::PathBuf;

use clap::Args;
use optic_core::config::OptimizerConfig;
use tracing::info;

use crate::config::{save, to_toml};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Save to this file instead of printing
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: ConfigArgs, config: &OptimizerConfig) -> anyhow::Result<()> {
    match &args.output {
        Some(path) => {
            save(config, path)?;
            info!("Configuration saved to {}", path.display());
        }
        None => print!("{}", to_toml(config)?),
    }
    Ok(())
}
