//! `optic5g layout`: hexagonal baseline catalog

use std::path::PathBuf;

use anyhow::{bail, ensure};
use clap::Args;
use optic_core::config::RegionBounds;
use optic_core::site::{DEFAULT_BANDWIDTH_MHZ, DEFAULT_FREQUENCY_GHZ, DEFAULT_TX_POWER_DBM};
use tracing::info;

use super::{write_rows, SiteRow};

/// Largest lattice the generator will emit
pub const MAX_LAYOUT_SITES: usize = 1_000_000;

#[derive(Args, Debug, Clone)]
pub struct LayoutArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub min_x: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub max_x: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub min_y: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub max_y: f64,

    /// Hexagonal cell radius in meters
    #[arg(long)]
    pub cell_radius: f64,

    /// Output CSV
    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_TX_POWER_DBM)]
    pub tx_power: f64,

    #[arg(long, default_value_t = DEFAULT_FREQUENCY_GHZ)]
    pub frequency: f64,

    #[arg(long, default_value_t = DEFAULT_BANDWIDTH_MHZ)]
    pub bandwidth: f64,
}

/// Site centres of a pointy-top hexagonal lattice filling `bounds`.
///
/// Rows are `1.5 r` apart, columns `sqrt(3) r` apart, odd rows shifted by
/// half a column. Points are ordered row by row from `(min_x, min_y)`.
pub fn hex_lattice(bounds: &RegionBounds, cell_radius: f64) -> anyhow::Result<Vec<(f64, f64)>> {
    ensure!(
        cell_radius.is_finite() && cell_radius > 0.0,
        "cell radius must be positive, got {}",
        cell_radius
    );
    ensure!(
        bounds.min_x <= bounds.max_x && bounds.min_y <= bounds.max_y,
        "empty region: x [{}, {}], y [{}, {}]",
        bounds.min_x,
        bounds.max_x,
        bounds.min_y,
        bounds.max_y
    );

    let dx = 3f64.sqrt() * cell_radius;
    let dy = 1.5 * cell_radius;
    let rows = ((bounds.max_y - bounds.min_y) / dy).floor() as usize + 1;
    let cols = ((bounds.max_x - bounds.min_x) / dx).floor() as usize + 1;
    if rows.saturating_mul(cols) > MAX_LAYOUT_SITES {
        bail!(
            "layout of about {} sites exceeds the limit of {}",
            rows.saturating_mul(cols),
            MAX_LAYOUT_SITES
        );
    }

    let mut points = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let y = bounds.min_y + row as f64 * dy;
        let offset = if row % 2 == 1 { dx / 2.0 } else { 0.0 };
        let mut col = 0usize;
        loop {
            let x = bounds.min_x + offset + col as f64 * dx;
            if x > bounds.max_x {
                break;
            }
            points.push((x, y));
            col += 1;
        }
    }
    Ok(points)
}

pub fn run(args: LayoutArgs) -> anyhow::Result<()> {
    let bounds = RegionBounds {
        min_x: args.min_x,
        max_x: args.max_x,
        min_y: args.min_y,
        max_y: args.max_y,
    };
    let rows: Vec<SiteRow> = hex_lattice(&bounds, args.cell_radius)?
        .into_iter()
        .map(|(x, y)| SiteRow {
            x_m: x,
            y_m: y,
            txpower_dbm: args.tx_power,
            frequency_ghz: args.frequency,
            bandwidth_mhz: args.bandwidth,
        })
        .collect();
    write_rows(&args.output, &rows)?;
    info!("Wrote {} lattice sites to {}", rows.len(), args.output.display());
    Ok(())
}
