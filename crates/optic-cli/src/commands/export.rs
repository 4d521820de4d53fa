//! `optic5g export`: active sites in simulator column order

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use optic_core::catalog::SiteCatalog;
use optic_core::config::OptimizerConfig;
use optic_core::mask::Mask;
use optic_core::site::CoordinateFrame;
use tracing::{info, warn};

use super::{load_catalog, write_rows, MaskSource, SiteRow};

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Site catalog CSV the mask refers to
    #[arg(long)]
    pub catalog: PathBuf,

    #[command(flatten)]
    pub source: MaskSource,

    /// Output CSV
    #[arg(short, long)]
    pub output: PathBuf,

    /// Project lat/lon catalogs onto a local metric plane
    #[arg(long)]
    pub project_geographic: bool,
}

/// Rows of the sites `mask` activates, in id order.
pub fn active_rows(catalog: &SiteCatalog, mask: &Mask) -> anyhow::Result<Vec<SiteRow>> {
    if catalog.frame() == CoordinateFrame::Geographic {
        bail!("export needs metric coordinates; enable catalog.project_geographic for lat/lon catalogs");
    }
    mask.validate_against(catalog.raw_len())?;

    let mut rows = Vec::with_capacity(mask.active_count());
    for id in mask.active_ids() {
        match catalog.get(id) {
            Some(site) => rows.push(SiteRow::from(site)),
            None => warn!("Row {} is active but was dropped on load; skipped", id),
        }
    }
    Ok(rows)
}

pub fn run(args: ExportArgs, config: &OptimizerConfig) -> anyhow::Result<()> {
    let mut settings = config.catalog.clone();
    if args.project_geographic {
        settings.project_geographic = true;
    }
    let catalog = load_catalog(&args.catalog, &settings)?;
    let mask = args.source.load()?;
    let rows = active_rows(&catalog, &mask)?;
    write_rows(&args.output, &rows)?;
    info!("Exported {} active sites to {}", rows.len(), args.output.display());
    Ok(())
}
