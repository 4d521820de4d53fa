//! `optic5g optimize`: catalog in, activation mask out

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use optic_core::config::{
    AnnealingParams, DistanceUnits, ExhaustiveParams, OptimizerConfig, SamplerParams,
    SolverBackend,
};
use optic_core::coverage::DemandGrid;
use optic_core::pipeline::{Pipeline, PipelineReport};
use optic_solvers::build_solver;
use tracing::info;

use super::load_catalog;

/// Backend selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Annealing,
    Sampler,
    Exhaustive,
}

/// Distance units selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitsArg {
    Meters,
    Kilometers,
}

impl From<UnitsArg> for DistanceUnits {
    fn from(u: UnitsArg) -> Self {
        match u {
            UnitsArg::Meters => DistanceUnits::Meters,
            UnitsArg::Kilometers => DistanceUnits::Kilometers,
        }
    }
}

/// Arguments for `optimize`; every flag overrides the loaded configuration
#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// Site catalog CSV
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the mask here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON run report
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Demand points CSV (for example existing towers) used instead of the grid
    #[arg(long)]
    pub demand: Option<PathBuf>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Independent solver runs, best kept
    #[arg(long)]
    pub restarts: Option<usize>,

    #[arg(long)]
    pub coverage_radius: Option<f64>,

    #[arg(long, value_enum)]
    pub units: Option<UnitsArg>,

    #[arg(long)]
    pub grid_resolution: Option<usize>,

    /// Coverage fraction at which greedy selection stops (0, 1]
    #[arg(long)]
    pub min_coverage: Option<f64>,

    #[arg(long)]
    pub candidate_limit: Option<usize>,

    #[arg(long)]
    pub interference_threshold: Option<f64>,

    #[arg(long)]
    pub penalty_weight: Option<f64>,

    /// Project lat/lon catalogs onto a local metric plane
    #[arg(long)]
    pub project_geographic: bool,

    /// Skip exact refinement of the greedy pool
    #[arg(long)]
    pub no_refine: bool,
}

impl OptimizeArgs {
    /// Fold command-line overrides into `config`
    pub fn apply(&self, mut config: OptimizerConfig) -> OptimizerConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(kind) = self.backend {
            config.solver.backend = match (kind, config.solver.backend) {
                (BackendKind::Annealing, b @ SolverBackend::Annealing(_))
                | (BackendKind::Sampler, b @ SolverBackend::Sampler(_))
                | (BackendKind::Exhaustive, b @ SolverBackend::Exhaustive(_)) => b,
                (BackendKind::Annealing, _) => SolverBackend::Annealing(AnnealingParams::default()),
                (BackendKind::Sampler, _) => SolverBackend::Sampler(SamplerParams::default()),
                (BackendKind::Exhaustive, _) => {
                    SolverBackend::Exhaustive(ExhaustiveParams::default())
                }
            };
        }
        if let Some(restarts) = self.restarts {
            config.solver.restarts = restarts;
        }
        if let Some(radius) = self.coverage_radius {
            config.coverage.coverage_radius = radius;
        }
        if let Some(units) = self.units {
            config.coverage.units = units.into();
        }
        if let Some(r) = self.grid_resolution {
            config.coverage.grid_resolution = r;
        }
        if let Some(pct) = self.min_coverage {
            config.coverage.min_coverage_pct = pct;
        }
        if let Some(limit) = self.candidate_limit {
            config.coverage.candidate_limit = limit;
        }
        if let Some(t) = self.interference_threshold {
            config.qubo.interference_threshold = t;
        }
        if let Some(w) = self.penalty_weight {
            config.qubo.penalty_weight = w;
        }
        if self.project_geographic {
            config.catalog.project_geographic = true;
        }
        if self.no_refine {
            config.refine.enabled = false;
        }
        config
    }
}

/// Run the full pipeline and return its report
pub fn optimize(args: &OptimizeArgs, config: OptimizerConfig) -> anyhow::Result<PipelineReport> {
    let config = args.apply(config);
    config.validate()?;

    let catalog = load_catalog(&args.input, &config.catalog)?;
    let solver = build_solver(&config.solver, config.seed)?;
    let pipeline = Pipeline::new(config)?;
    let report = match &args.demand {
        Some(path) => {
            let demand = DemandGrid::from_csv_path(path, &catalog)
                .with_context(|| format!("loading demand points {}", path.display()))?;
            pipeline.run_with_demand(&catalog, &demand, &solver)?
        }
        None => pipeline.run(&catalog, &solver)?,
    };
    Ok(report)
}

/// Execute the optimize command
pub fn run(args: OptimizeArgs, config: OptimizerConfig) -> anyhow::Result<()> {
    let report = optimize(&args, config)?;

    info!(
        "Selected {} of {} sites (greedy {}, refined {}), energy {:.3}",
        report.mask.active_count(),
        report.catalog.raw_rows,
        report.greedy.selected.len(),
        report.refine.pool.len(),
        report.solver.energy
    );

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", report.mask))
                .with_context(|| format!("writing mask {}", path.display()))?;
            info!("Mask written to {}", path.display());
        }
        None => println!("{}", report.mask),
    }

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
