//! Subcommand implementations

pub mod export;
pub mod layout;
pub mod optimize;
pub mod show_config;
pub mod validate_mask;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use optic_core::catalog::SiteCatalog;
use optic_core::config::CatalogSettings;
use optic_core::mask::Mask;
use optic_core::site::Site;
use serde::Serialize;

/// Mask given inline or read from a file
#[derive(Args, Debug, Clone)]
pub struct MaskSource {
    /// Mask string of '0'/'1' characters
    #[arg(short, long, conflicts_with = "mask_file")]
    pub mask: Option<String>,

    /// File holding the mask on its first line
    #[arg(long)]
    pub mask_file: Option<PathBuf>,
}

impl MaskSource {
    /// Parse the mask; whitespace around it is ignored.
    pub fn load(&self) -> anyhow::Result<Mask> {
        let text = match (&self.mask, &self.mask_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("reading mask {}", path.display()))?,
            (None, None) => bail!("a mask is required (--mask or --mask-file)"),
        };
        let line = text.lines().next().unwrap_or("");
        Ok(line.parse::<Mask>()?)
    }
}

/// Load a catalog, attaching the path to any error
pub fn load_catalog(path: &Path, settings: &CatalogSettings) -> anyhow::Result<SiteCatalog> {
    SiteCatalog::from_csv_path(path, settings)
        .with_context(|| format!("loading catalog {}", path.display()))
}

/// Simulator-ready catalog row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRow {
    pub x_m: f64,
    pub y_m: f64,
    pub txpower_dbm: f64,
    pub frequency_ghz: f64,
    pub bandwidth_mhz: f64,
}

impl From<&Site> for SiteRow {
    fn from(site: &Site) -> Self {
        Self {
            x_m: site.x,
            y_m: site.y,
            txpower_dbm: site.tx_power_dbm,
            frequency_ghz: site.frequency_ghz,
            bandwidth_mhz: site.bandwidth_mhz,
        }
    }
}

/// Write rows as CSV with a header line
pub fn write_rows(path: &Path, rows: &[SiteRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
