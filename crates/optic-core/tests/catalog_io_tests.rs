//! Catalog loading from disk and mask alignment with the raw table

use std::io::Write;

use optic_core::catalog::SiteCatalog;
use optic_core::config::{CatalogSettings, DistanceUnits, OptimizerConfig, RegionBounds};
use optic_core::error::OpticError;
use optic_core::mask::Mask;
use optic_core::pipeline::Pipeline;
use optic_core::qubo::QuboModel;
use optic_core::site::CoordinateFrame;
use optic_core::solver::{QuboSolver, SolverOutcome};
use tempfile::NamedTempFile;

struct NegativeLinear;

impl QuboSolver for NegativeLinear {
    fn name(&self) -> &'static str {
        "negative-linear"
    }

    fn minimize(&self, model: &QuboModel) -> optic_core::error::Result<SolverOutcome> {
        Ok(SolverOutcome::scored(
            model,
            model.negative_linear_assignment(),
            1,
            true,
        ))
    }
}

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_planar_file() {
    let file = write_csv("x_m,y_m,txpower_dbm,frequency_ghz,bandwidth_mhz\n0,0,40,3.5,20\n500,0,43,3.5,20\n");
    let catalog = SiteCatalog::from_csv_path(file.path(), &CatalogSettings::default()).unwrap();
    assert_eq!(catalog.frame(), CoordinateFrame::Planar);
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.sites()[1].tx_power_dbm, 43.0);
    assert_eq!(catalog.sites()[0].bandwidth_mhz, 20.0);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = SiteCatalog::from_csv_path("/nonexistent/optic5g/sites.csv", &CatalogSettings::default())
        .unwrap_err();
    assert!(matches!(err, OpticError::Io(_)));
}

#[test]
fn test_headers_without_coordinates_rejected() {
    let file = write_csv("name,height\nA,30\n");
    let err = SiteCatalog::from_csv_path(file.path(), &CatalogSettings::default()).unwrap_err();
    assert!(matches!(err, OpticError::Validation { .. }));
}

#[test]
fn test_mask_covers_dropped_rows() {
    // Rows 1 and 3 lack coordinates; the mask still has one slot per row.
    let file = write_csv("x_m,y_m\n0,0\n,\n100,0\nNaN,4\n5000,0\n");
    let catalog = SiteCatalog::from_csv_path(file.path(), &CatalogSettings::default()).unwrap();
    assert_eq!(catalog.raw_len(), 5);
    assert_eq!(catalog.dropped_missing(), 2);

    let config = OptimizerConfig::default()
        .with_coverage_radius(10_000.0, DistanceUnits::Meters)
        .with_grid_resolution(1);
    let report = Pipeline::new(config)
        .unwrap()
        .run(&catalog, &NegativeLinear)
        .unwrap();
    assert_eq!(report.mask.len(), 5);
    assert_eq!(report.mask.to_string(), "10000");
    assert!(report.mask.validate_against(catalog.raw_len()).is_ok());
}

#[test]
fn test_geographic_catalog_end_to_end() {
    let file = write_csv("site,latitude,longitude\nA,14.600,120.980\nB,14.601,120.980\nC,14.700,121.050\n");
    let catalog = SiteCatalog::from_csv_path(file.path(), &CatalogSettings::default()).unwrap();
    assert_eq!(catalog.frame(), CoordinateFrame::Geographic);

    let config = OptimizerConfig::default()
        .with_coverage_radius(2.0, DistanceUnits::Kilometers)
        .with_grid_resolution(3)
        .with_min_coverage(0.1)
        .with_interference_threshold(0.5);
    let report = Pipeline::new(config)
        .unwrap()
        .run(&catalog, &NegativeLinear)
        .unwrap();
    assert_eq!(report.mask.len(), 3);
    assert!(report.mask.active_count() >= 1);
}

#[test]
fn test_geographic_catalog_needs_kilometers() {
    let file = write_csv("lat,lon\n14.6,120.98\n14.7,121.05\n");
    let catalog = SiteCatalog::from_csv_path(file.path(), &CatalogSettings::default()).unwrap();
    let err = Pipeline::new(OptimizerConfig::default())
        .unwrap()
        .run(&catalog, &NegativeLinear)
        .unwrap_err();
    assert!(matches!(err, OpticError::InvalidParameter { .. }));
}

#[test]
fn test_region_filter_zeroes_excluded_rows() {
    let file = write_csv("x,y\n0,0\n100,0\n9000,0\n");
    let settings = CatalogSettings {
        project_geographic: false,
        bounds: Some(RegionBounds {
            min_x: 50.0,
            max_x: 10_000.0,
            min_y: -1.0,
            max_y: 1.0,
        }),
    };
    let catalog = SiteCatalog::from_csv_path(file.path(), &settings).unwrap();
    assert_eq!(catalog.dropped_out_of_bounds(), 1);
    let config = OptimizerConfig::default()
        .with_coverage_radius(20_000.0, DistanceUnits::Meters)
        .with_grid_resolution(1);
    let report = Pipeline::new(config)
        .unwrap()
        .run(&catalog, &NegativeLinear)
        .unwrap();
    assert_eq!(report.mask.to_string(), "010");
}

#[test]
fn test_mask_round_trip_through_file() {
    let mask = Mask::encode(5, &[0, 2, 4], &[true, false, true]).unwrap();
    let file = write_csv(&format!("{}\n", mask));
    let text = std::fs::read_to_string(file.path()).unwrap();
    let parsed: Mask = text.parse().unwrap();
    assert_eq!(parsed, mask);
}
