//! `optic5g validate-mask`

use std::path::PathBuf;

use clap::Args;
use optic_core::config::OptimizerConfig;
use tracing::warn;

use super::{load_catalog, MaskSource};

#[derive(Args, Debug, Clone)]
pub struct ValidateMaskArgs {
    /// Site catalog CSV the mask refers to
    #[arg(long)]
    pub catalog: PathBuf,

    #[command(flatten)]
    pub source: MaskSource,
}

/// Outcome of a successful check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskCheck {
    pub length: usize,
    pub active: usize,
    /// Active rows the catalog dropped on load
    pub unusable_active: Vec<usize>,
}

/// Check the mask's alphabet and length against the catalog.
pub fn check(args: &ValidateMaskArgs, config: &OptimizerConfig) -> anyhow::Result<MaskCheck> {
    let mask = args.source.load()?;
    let catalog = load_catalog(&args.catalog, &config.catalog)?;
    mask.validate_against(catalog.raw_len())?;

    let dropped: Vec<usize> = mask
        .active_ids()
        .into_iter()
        .filter(|&id| catalog.get(id).is_none())
        .collect();
    if !dropped.is_empty() {
        warn!("Mask activates {} rows that are not usable sites: {:?}", dropped.len(), dropped);
    }

    Ok(MaskCheck {
        length: mask.len(),
        active: mask.active_count(),
        unusable_active: dropped,
    })
}

pub fn run(args: ValidateMaskArgs, config: &OptimizerConfig) -> anyhow::Result<()> {
    let result = check(&args, config)?;
    println!(
        "[OK] mask of {} sites, {} active",
        result.length, result.active
    );
    Ok(())
}
