//! Demand grid generation and the site/demand coverage relation.
//!
//! A site covers a demand point iff their distance is `<= coverage_radius`;
//! two sites interfere iff their distance is `< interference_threshold`.
//! Distances are Euclidean for planar catalogs (meters) and haversine for
//! geographic catalogs (kilometers). Any other pairing of frame and units
//! is rejected.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{parse_finite, ColumnMap, SiteCatalog};
use crate::config::{CoverageSettings, DistanceUnits};
use crate::error::{OpticError, Result};
use crate::geo::Metric;
use crate::site::{CoordinateFrame, Site};

/// Pick the distance metric for a catalog frame, rejecting unit mixes.
pub fn metric_for(frame: CoordinateFrame, units: DistanceUnits) -> Result<Metric> {
    match (frame, units) {
        (CoordinateFrame::Planar, DistanceUnits::Meters) => Ok(Metric::Euclidean),
        (CoordinateFrame::Geographic, DistanceUnits::Kilometers) => Ok(Metric::Haversine),
        (CoordinateFrame::Planar, DistanceUnits::Kilometers) => Err(OpticError::invalid_parameter(
            "units",
            "planar catalogs are in meters; set units = \"meters\"",
        )),
        (CoordinateFrame::Geographic, DistanceUnits::Meters) => Err(OpticError::invalid_parameter(
            "units",
            "geographic catalogs use great-circle kilometers; set units = \"kilometers\" \
             or enable catalog.project_geographic",
        )),
    }
}

/// A unit of coverage demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub x: f64,
    pub y: f64,
}

/// Demand points, either a regular grid over the catalog or supplied externally.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandGrid {
    points: Vec<DemandPoint>,
}

impl DemandGrid {
    /// `resolution x resolution` grid spanning the catalog's bounding box.
    ///
    /// Each axis is `linspace(min, max, resolution)` with both ends included;
    /// a resolution of 1 yields the single point `(min_x, min_y)`. An empty
    /// catalog yields an empty grid.
    pub fn over_catalog(catalog: &SiteCatalog, resolution: usize) -> Self {
        let Some((min_x, max_x, min_y, max_y)) = catalog.bounding_box() else {
            return Self { points: Vec::new() };
        };
        let xs = linspace(min_x, max_x, resolution);
        let ys = linspace(min_y, max_y, resolution);
        let points = ys
            .iter()
            .flat_map(|&y| xs.iter().map(move |&x| DemandPoint { x, y }))
            .collect();
        Self { points }
    }

    /// Externally supplied demand points
    pub fn from_points(points: Vec<DemandPoint>) -> Self {
        Self { points }
    }

    /// Demand points from a CSV file, in the frame of `catalog`.
    pub fn from_csv_path(path: impl AsRef<Path>, catalog: &SiteCatalog) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading demand points from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, catalog)
    }

    /// Demand points from a CSV table, in the frame of `catalog`.
    ///
    /// Coordinate columns are detected as for catalogs and rows without
    /// finite coordinates are skipped. Lat/lon rows are mapped through the
    /// catalog's projection when it was projected on load; any other frame
    /// mismatch is a validation error.
    pub fn from_csv_reader<R: Read>(reader: R, catalog: &SiteCatalog) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        let columns = ColumnMap::detect(&headers)?;
        let projection = match (columns.frame, catalog.frame(), catalog.projection()) {
            (demand, sites, _) if demand == sites => None,
            (CoordinateFrame::Geographic, CoordinateFrame::Planar, Some(proj)) => Some(proj),
            (demand, sites, _) => {
                return Err(OpticError::validation(format!(
                    "demand points are {:?} but the site catalog is {:?}",
                    demand, sites
                )))
            }
        };

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.records() {
            let record = record?;
            match (
                parse_finite(record.get(columns.x)),
                parse_finite(record.get(columns.y)),
            ) {
                (Some(x), Some(y)) => {
                    let (x, y) = match &projection {
                        Some(proj) => proj.project(x, y),
                        None => (x, y),
                    };
                    points.push(DemandPoint { x, y });
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Skipped {} demand rows with missing or unparseable coordinates", skipped);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Sparse site x demand coverage relation.
///
/// Row `k` lists, in ascending order, the demand indices covered by the
/// `k`-th site of the catalog (position, not id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMatrix {
    rows: Vec<Vec<u32>>,
    num_points: usize,
}

impl CoverageMatrix {
    /// Build from explicit rows
    pub fn from_rows(rows: Vec<Vec<u32>>, num_points: usize) -> Self {
        Self { rows, num_points }
    }

    /// Demand indices covered by the site at catalog position `site`
    pub fn covered_by(&self, site: usize) -> &[u32] {
        &self.rows[site]
    }

    pub fn num_sites(&self) -> usize {
        self.rows.len()
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Demand points covered by at least one site
    pub fn coverable_points(&self) -> usize {
        let mut seen = vec![false; self.num_points];
        for row in &self.rows {
            for &p in row {
                seen[p as usize] = true;
            }
        }
        seen.into_iter().filter(|&b| b).count()
    }
}

/// Largest `|coordinate| / radius` for which cell keys stay exact
const MAX_CELL_INDEX: f64 = (1u64 << 40) as f64;

/// Uniform bucket index over demand points, cell edge = coverage radius.
struct SpatialGrid {
    cell: f64,
    buckets: HashMap<(i64, i64), Vec<u32>>,
}

impl SpatialGrid {
    fn build(points: &[DemandPoint], cell: f64) -> Self {
        let mut buckets: HashMap<(i64, i64), Vec<u32>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            buckets
                .entry(Self::key(p.x, p.y, cell))
                .or_default()
                .push(i as u32);
        }
        Self { cell, buckets }
    }

    /// Whether every position maps to a cell key with exact neighbours.
    fn fits(mut coords: impl Iterator<Item = (f64, f64)>, cell: f64) -> bool {
        coords.all(|(x, y)| x.abs().max(y.abs()) / cell <= MAX_CELL_INDEX)
    }

    #[inline]
    fn key(x: f64, y: f64, cell: f64) -> (i64, i64) {
        ((x / cell).floor() as i64, (y / cell).floor() as i64)
    }

    /// Candidate indices in the 3x3 block of cells around `(x, y)`
    fn neighbourhood(&self, x: f64, y: f64) -> impl Iterator<Item = u32> + '_ {
        let (cx, cy) = Self::key(x, y, self.cell);
        (cx - 1..=cx + 1)
            .flat_map(move |gx| (cy - 1..=cy + 1).map(move |gy| (gx, gy)))
            .filter_map(move |k| self.buckets.get(&k))
            .flat_map(|bucket| bucket.iter().copied())
    }
}

/// Coverage and interference relations for one catalog frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageModel {
    metric: Metric,
    radius: f64,
}

impl CoverageModel {
    /// Model for a catalog frame; fails when units do not match the frame.
    pub fn new(frame: CoordinateFrame, settings: &CoverageSettings) -> Result<Self> {
        let metric = metric_for(frame, settings.units)?;
        if !(settings.coverage_radius.is_finite() && settings.coverage_radius > 0.0) {
            return Err(OpticError::invalid_parameter(
                "coverage_radius",
                format!("must be positive and finite, got {}", settings.coverage_radius),
            ));
        }
        Ok(Self {
            metric,
            radius: settings.coverage_radius,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Distance between two sites in the model's units
    #[inline]
    pub fn site_distance(&self, a: &Site, b: &Site) -> f64 {
        self.metric.distance(a.x, a.y, b.x, b.y)
    }

    /// Whether `site` covers `point`
    #[inline]
    pub fn covers(&self, site: &Site, point: &DemandPoint) -> bool {
        self.metric.distance(site.x, site.y, point.x, point.y) <= self.radius
    }

    /// Whether two sites are closer than `threshold`
    #[inline]
    pub fn interferes(&self, a: &Site, b: &Site, threshold: f64) -> bool {
        self.site_distance(a, b) < threshold
    }

    /// Demand indices covered by one site, by a full scan of the grid.
    pub fn coverage_of(&self, site: &Site, grid: &DemandGrid) -> Vec<u32> {
        grid.points()
            .iter()
            .enumerate()
            .filter(|(_, p)| self.covers(site, p))
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Coverage rows for every site, computed in parallel.
    ///
    /// Planar catalogs query a bucket index unless coordinates are too far
    /// out in radius units for exact cell keys; geographic catalogs scan the
    /// full grid. Rows are sorted, so the result does not depend on thread
    /// scheduling.
    pub fn coverage_matrix(&self, sites: &[Site], grid: &DemandGrid) -> CoverageMatrix {
        let indexable = self.metric == Metric::Euclidean
            && SpatialGrid::fits(
                grid.points()
                    .iter()
                    .map(|p| (p.x, p.y))
                    .chain(sites.iter().map(|s| (s.x, s.y))),
                self.radius,
            );
        let rows: Vec<Vec<u32>> = if indexable {
            let index = SpatialGrid::build(grid.points(), self.radius);
            sites
                .par_iter()
                .map(|site| {
                    let mut row: Vec<u32> = index
                        .neighbourhood(site.x, site.y)
                        .filter(|&i| self.covers(site, &grid.points()[i as usize]))
                        .collect();
                    row.sort_unstable();
                    row
                })
                .collect()
        } else {
            if self.metric == Metric::Euclidean {
                debug!("Radius too small for the bucket index; scanning the full grid");
            }
            sites
                .par_iter()
                .map(|site| self.coverage_of(site, grid))
                .collect()
        };
        debug!(
            "Coverage matrix: {} sites x {} demand points, {} incidences",
            rows.len(),
            grid.len(),
            rows.iter().map(Vec::len).sum::<usize>()
        );
        CoverageMatrix::from_rows(rows, grid.len())
    }
}
