//! Site catalog loading and validation.
//!
//! The raw inventory is a CSV table whose coordinate columns are found by
//! name. Explicit meter columns (`x_m`/`y_m`, then `x`/`y`) win over
//! geographic ones (any header containing `lat`, and any containing `lon`).
//! Radio columns are optional and matched by the substrings `txpower`,
//! `freq` and `bandwidth`; missing or unparseable values fall back to the
//! defaults in [`crate::site`].
//!
//! Rows with missing, unparseable or non-finite coordinates are dropped, as
//! are rows outside the configured region. Every surviving site keeps the
//! row position it had in the raw table as its id, so masks always index
//! the raw inventory.

use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::config::CatalogSettings;
use crate::error::{OpticError, Result};
use crate::geo::LocalProjection;
use crate::site::{
    CoordinateFrame, Site, DEFAULT_BANDWIDTH_MHZ, DEFAULT_FREQUENCY_GHZ, DEFAULT_TX_POWER_DBM,
};

/// Column positions resolved from a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub frame: CoordinateFrame,
    /// Easting or longitude column
    pub x: usize,
    /// Northing or latitude column
    pub y: usize,
    pub tx_power: Option<usize>,
    pub frequency: Option<usize>,
    pub bandwidth: Option<usize>,
}

impl ColumnMap {
    /// Resolve coordinate and radio columns from header names.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Result<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .collect();
        let exact = |want: &str| names.iter().position(|n| n == want);
        let containing = |want: &str| names.iter().position(|n| n.contains(want));

        let (frame, x, y) = if let (Some(x), Some(y)) = (exact("x_m"), exact("y_m")) {
            (CoordinateFrame::Planar, x, y)
        } else if let (Some(x), Some(y)) = (exact("x"), exact("y")) {
            (CoordinateFrame::Planar, x, y)
        } else if let (Some(lon), Some(lat)) = (containing("lon"), containing("lat")) {
            (CoordinateFrame::Geographic, lon, lat)
        } else {
            return Err(OpticError::validation(format!(
                "no coordinate columns found (need x_m/y_m, x/y or lat*/lon*), headers: [{}]",
                names.join(", ")
            )));
        };

        Ok(Self {
            frame,
            x,
            y,
            tx_power: containing("txpower"),
            frequency: containing("freq"),
            bandwidth: containing("bandwidth"),
        })
    }
}

/// Validated, immutable set of candidate sites.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCatalog {
    frame: CoordinateFrame,
    sites: Vec<Site>,
    raw_len: usize,
    dropped_missing: usize,
    dropped_out_of_bounds: usize,
    projection: Option<LocalProjection>,
}

impl SiteCatalog {
    /// Build a catalog from already-parsed sites.
    ///
    /// `raw_len` is the row count of the table the ids refer to. Ids must be
    /// unique, strictly increasing and below `raw_len`; positions must be
    /// finite.
    pub fn from_sites(frame: CoordinateFrame, sites: Vec<Site>, raw_len: usize) -> Result<Self> {
        for pair in sites.windows(2) {
            if pair[1].id <= pair[0].id {
                return Err(OpticError::validation(format!(
                    "site ids must be unique and increasing, found {} after {}",
                    pair[1].id, pair[0].id
                )));
            }
        }
        if let Some(last) = sites.last() {
            if last.id >= raw_len {
                return Err(OpticError::validation(format!(
                    "site id {} out of range for a {}-row table",
                    last.id, raw_len
                )));
            }
        }
        if let Some(bad) = sites.iter().find(|s| !s.has_finite_position()) {
            return Err(OpticError::validation(format!(
                "site {} has non-finite coordinates",
                bad.id
            )));
        }
        let dropped_missing = raw_len - sites.len();
        Ok(Self {
            frame,
            sites,
            raw_len,
            dropped_missing,
            dropped_out_of_bounds: 0,
            projection: None,
        })
    }

    /// Planar catalog with default radio parameters, one site per point.
    pub fn planar(points: &[(f64, f64)]) -> Result<Self> {
        let sites = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Site::new(i, x, y))
            .collect();
        Self::from_sites(CoordinateFrame::Planar, sites, points.len())
    }

    /// Load a CSV inventory from disk.
    pub fn from_csv_path(path: impl AsRef<Path>, settings: &CatalogSettings) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading site catalog from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, settings)
    }

    /// Load a CSV inventory from any reader.
    pub fn from_csv_reader<R: Read>(reader: R, settings: &CatalogSettings) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        let columns = ColumnMap::detect(&headers)?;
        info!(
            "Using {:?} coordinates from columns '{}' / '{}'",
            columns.frame, headers[columns.x], headers[columns.y]
        );

        let mut sites = Vec::new();
        let mut raw_len = 0usize;
        let mut dropped_missing = 0usize;
        let mut dropped_out_of_bounds = 0usize;

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            raw_len = row + 1;

            let (x, y) = match (
                parse_finite(record.get(columns.x)),
                parse_finite(record.get(columns.y)),
            ) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    dropped_missing += 1;
                    continue;
                }
            };
            if let Some(bounds) = &settings.bounds {
                if !bounds.contains(x, y) {
                    dropped_out_of_bounds += 1;
                    continue;
                }
            }

            let optional = |col: Option<usize>, default: f64| {
                parse_finite(col.and_then(|c| record.get(c))).unwrap_or(default)
            };
            sites.push(Site {
                id: row,
                x,
                y,
                tx_power_dbm: optional(columns.tx_power, DEFAULT_TX_POWER_DBM),
                frequency_ghz: optional(columns.frequency, DEFAULT_FREQUENCY_GHZ),
                bandwidth_mhz: optional(columns.bandwidth, DEFAULT_BANDWIDTH_MHZ),
            });
        }

        if dropped_missing > 0 {
            warn!(
                "Dropped {} of {} rows with missing or unparseable coordinates",
                dropped_missing, raw_len
            );
        }
        if dropped_out_of_bounds > 0 {
            warn!(
                "Dropped {} of {} rows outside the configured region",
                dropped_out_of_bounds, raw_len
            );
        }

        let mut frame = columns.frame;
        let mut projection = None;
        if frame == CoordinateFrame::Geographic && settings.project_geographic {
            let lonlat: Vec<(f64, f64)> = sites.iter().map(|s| (s.x, s.y)).collect();
            if let Some(proj) = LocalProjection::centred_on(&lonlat) {
                for site in &mut sites {
                    let (x, y) = proj.project(site.x, site.y);
                    site.x = x;
                    site.y = y;
                }
                projection = Some(proj);
            }
            frame = CoordinateFrame::Planar;
            info!("Projected geographic coordinates onto a local metric plane");
        }

        info!("Catalog ready: {} usable sites of {} rows", sites.len(), raw_len);
        Ok(Self {
            frame,
            sites,
            raw_len,
            dropped_missing,
            dropped_out_of_bounds,
            projection,
        })
    }

    /// Coordinate frame of the site positions
    pub fn frame(&self) -> CoordinateFrame {
        self.frame
    }

    /// Projection applied to lat/lon rows on load, if any
    pub fn projection(&self) -> Option<LocalProjection> {
        self.projection
    }

    /// Usable sites, ordered by id
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Number of usable sites
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// True if no site survived loading
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Row count of the raw input table; the length of every emitted mask
    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    /// Rows dropped for missing coordinates
    pub fn dropped_missing(&self) -> usize {
        self.dropped_missing
    }

    /// Rows dropped by the region filter
    pub fn dropped_out_of_bounds(&self) -> usize {
        self.dropped_out_of_bounds
    }

    /// Look up a site by its raw-table id
    pub fn get(&self, id: usize) -> Option<&Site> {
        self.sites
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|pos| &self.sites[pos])
    }

    /// `(min_x, max_x, min_y, max_y)` over all sites, `None` when empty
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.sites.first()?;
        Some(self.sites.iter().fold(
            (first.x, first.x, first.y, first.y),
            |(min_x, max_x, min_y, max_y), s| {
                (min_x.min(s.x), max_x.max(s.x), min_y.min(s.y), max_y.max(s.y))
            },
        ))
    }
}

pub(crate) fn parse_finite(field: Option<&str>) -> Option<f64> {
    field
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
