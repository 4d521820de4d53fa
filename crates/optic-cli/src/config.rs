use std::path::Path;

use anyhow::Context;
use optic_core::config::OptimizerConfig;

/// Locations searched when no `--config` is given, in order
pub const DEFAULT_PATHS: [&str; 2] = ["optic5g.toml", "config/optic5g.toml"];

/// Load and validate the configuration.
///
/// An explicit path must exist. Otherwise the default locations are tried
/// and built-in defaults are used when none is readable.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OptimizerConfig> {
    let config = if let Some(p) = path {
        let content = std::fs::read_to_string(p)
            .with_context(|| format!("reading config {}", p.display()))?;
        parse(&content).with_context(|| format!("parsing config {}", p.display()))?
    } else {
        let mut found = None;
        for candidate in DEFAULT_PATHS {
            if let Ok(content) = std::fs::read_to_string(candidate) {
                tracing::debug!("Using configuration from {}", candidate);
                found = Some(parse(&content).with_context(|| format!("parsing config {}", candidate))?);
                break;
            }
        }
        found.unwrap_or_default()
    };
    config.validate()?;
    Ok(config)
}

/// Parse TOML; missing sections and keys take their defaults.
pub fn parse(content: &str) -> anyhow::Result<OptimizerConfig> {
    Ok(toml::from_str(content)?)
}

/// Render as TOML
pub fn to_toml(config: &OptimizerConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

pub fn save(config: &OptimizerConfig, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, to_toml(config)?)?;
    Ok(())
}
