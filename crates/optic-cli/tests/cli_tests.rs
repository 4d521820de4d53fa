//! Command-line tests
//!
//! Tests cover:
//! - optimize: mask file, JSON report, flag overrides, external demand points
//! - validate-mask: accepted and rejected masks
//! - layout and export CSV output
//! - config printing and saving

use std::path::{Path, PathBuf};

use clap::Parser;
use optic_cli::{run, Cli};
use tempfile::TempDir;

const FOUR_SITES: &str = "x_m,y_m\n0,0\n100,0\n5000,0\n5100,0\n";

const FOUR_SITE_CONFIG: &str = r#"
[coverage]
coverage_radius = 10000.0
grid_resolution = 1

[qubo]
interference_threshold = 200.0
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        ws.write("sites.csv", FOUR_SITES);
        ws.write("optic5g.toml", FOUR_SITE_CONFIG);
        ws
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let p = self.path(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap()
    }

    /// Run `optic5g --config <ws>/optic5g.toml <args...>`
    fn exec(&self, args: &[&str]) -> anyhow::Result<()> {
        let config = self.path("optic5g.toml");
        let mut argv = vec!["optic5g".to_string(), "--config".to_string(), arg(&config)];
        argv.extend(args.iter().map(|s| s.to_string()));
        run(Cli::try_parse_from(argv)?)
    }
}

fn arg(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

#[cfg(test)]
mod optimize_tests {
    use super::*;

    #[test]
    fn test_mask_and_report_written() {
        let ws = Workspace::new();
        let input = arg(&ws.path("sites.csv"));
        let output = arg(&ws.path("mask.txt"));
        let report = arg(&ws.path("run.json"));

        ws.exec(&["optimize", "-i", &input, "-o", &output, "--report", &report])
            .unwrap();

        assert_eq!(ws.read("mask.txt"), "1000\n");
        let json: serde_json::Value = serde_json::from_str(&ws.read("run.json")).unwrap();
        assert_eq!(json["mask"], "1000");
        assert_eq!(json["refine"]["pool"], serde_json::json!([0]));
        assert_eq!(json["catalog"]["raw_rows"], 4);
    }

    #[test]
    fn test_backend_flag() {
        let ws = Workspace::new();
        let input = arg(&ws.path("sites.csv"));
        let report = arg(&ws.path("run.json"));

        for backend in ["annealing", "sampler", "exhaustive"] {
            ws.exec(&["optimize", "-i", &input, "--report", &report, "--backend", backend])
                .unwrap();
            let json: serde_json::Value = serde_json::from_str(&ws.read("run.json")).unwrap();
            assert_eq!(json["mask"], "1000", "backend {}", backend);
        }
    }

    #[test]
    fn test_demand_points_replace_grid() {
        let ws = Workspace::new();
        let input = arg(&ws.path("sites.csv"));
        let demand = arg(&ws.write("towers.csv", "x_m,y_m\n5050,0\n"));
        let report = arg(&ws.path("run.json"));

        ws.exec(&[
            "optimize", "-i", &input, "--demand", &demand, "--coverage-radius", "100",
            "--report", &report,
        ])
        .unwrap();

        // Sites 2 and 3 both reach the tower; the lower id wins the tie.
        let json: serde_json::Value = serde_json::from_str(&ws.read("run.json")).unwrap();
        assert_eq!(json["demand_points"], 1);
        assert_eq!(json["mask"], "0010");
    }

    #[test]
    fn test_demand_frame_mismatch_reported() {
        let ws = Workspace::new();
        let input = arg(&ws.path("sites.csv"));
        let demand = arg(&ws.write("towers.csv", "lat,lon\n52.3,4.9\n"));
        let err = ws
            .exec(&["optimize", "-i", &input, "--demand", &demand])
            .unwrap_err();
        assert!(format!("{:#}", err).contains("towers.csv"));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let ws = Workspace::new();
        let input = arg(&ws.path("sites.csv"));
        let err = ws
            .exec(&["optimize", "-i", &input, "--min-coverage", "1.5"])
            .unwrap_err();
        assert!(err.to_string().contains("min_coverage"), "{}", err);
    }

    #[test]
    fn test_missing_catalog_reports_path() {
        let ws = Workspace::new();
        let missing = arg(&ws.path("nope.csv"));
        let err = ws.exec(&["optimize", "-i", &missing]).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.csv"));
    }
}

#[cfg(test)]
mod mask_tests {
    use super::*;

    #[test]
    fn test_valid_mask_accepted() {
        let ws = Workspace::new();
        let catalog = arg(&ws.path("sites.csv"));
        ws.exec(&["validate-mask", "--catalog", &catalog, "--mask", "1001"])
            .unwrap();

        let mask_file = arg(&ws.write("mask.txt", "0110\n"));
        ws.exec(&["validate-mask", "--catalog", &catalog, "--mask-file", &mask_file])
            .unwrap();
    }

    #[test]
    fn test_wrong_length_rejected() {
        let ws = Workspace::new();
        let catalog = arg(&ws.path("sites.csv"));
        assert!(ws
            .exec(&["validate-mask", "--catalog", &catalog, "--mask", "100"])
            .is_err());
    }

    #[test]
    fn test_bad_alphabet_rejected() {
        let ws = Workspace::new();
        let catalog = arg(&ws.path("sites.csv"));
        let err = ws
            .exec(&["validate-mask", "--catalog", &catalog, "--mask", "10x1"])
            .unwrap_err();
        assert!(err.to_string().contains("invalid mask character"));
    }

    #[test]
    fn test_mask_required() {
        let ws = Workspace::new();
        let catalog = arg(&ws.path("sites.csv"));
        assert!(ws.exec(&["validate-mask", "--catalog", &catalog]).is_err());
    }
}

#[cfg(test)]
mod csv_tests {
    use super::*;

    const HEADER: &str = "x_m,y_m,txpower_dbm,frequency_ghz,bandwidth_mhz";

    #[test]
    fn test_layout_writes_simulator_columns() {
        let ws = Workspace::new();
        let out = arg(&ws.path("hex.csv"));
        ws.exec(&[
            "layout", "--min-x", "0", "--max-x", "400", "--min-y", "0", "--max-y", "400",
            "--cell-radius", "100", "-o", &out,
        ])
        .unwrap();

        let text = ws.read("hex.csv");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(lines.count(), 8);
    }

    #[test]
    fn test_layout_feeds_optimize() {
        let ws = Workspace::new();
        let hex = arg(&ws.path("hex.csv"));
        ws.exec(&[
            "layout", "--min-x", "0", "--max-x", "2000", "--min-y", "0", "--max-y", "2000",
            "--cell-radius", "500", "-o", &hex,
        ])
        .unwrap();

        let report = arg(&ws.path("run.json"));
        ws.exec(&[
            "optimize", "-i", &hex, "--report", &report, "--coverage-radius", "800",
            "--grid-resolution", "8", "--backend", "exhaustive",
        ])
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&ws.read("run.json")).unwrap();
        let rows = ws.read("hex.csv").lines().count() - 1;
        assert_eq!(json["mask"].as_str().unwrap().len(), rows);
    }

    #[test]
    fn test_export_active_rows() {
        let ws = Workspace::new();
        let catalog = arg(&ws.write(
            "radio.csv",
            "x_m,y_m,txpower_dbm\n0,0,40\n,5,41\n300,400,43\n",
        ));
        let out = arg(&ws.path("active.csv"));
        ws.exec(&["export", "--catalog", &catalog, "--mask", "001", "-o", &out])
            .unwrap();

        let text = ws.read("active.csv");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![HEADER, "300.0,400.0,43.0,1.8,10.0"]);
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_config_saved_with_file_values() {
        let ws = Workspace::new();
        let out = arg(&ws.path("effective.toml"));
        ws.exec(&["config", "-o", &out]).unwrap();

        let saved = optic_cli::config::parse(&ws.read("effective.toml")).unwrap();
        assert_eq!(saved.coverage.coverage_radius, 10000.0);
        assert_eq!(saved.coverage.grid_resolution, 1);
        assert_eq!(saved.qubo.interference_threshold, 200.0);
    }
}
