//! Candidate radio sites

use serde::{Deserialize, Serialize};

/// Transmit power applied when the input table has no usable value (dBm)
pub const DEFAULT_TX_POWER_DBM: f64 = 46.0;
/// Carrier frequency applied when the input table has no usable value (GHz)
pub const DEFAULT_FREQUENCY_GHZ: f64 = 1.8;
/// Channel bandwidth applied when the input table has no usable value (MHz)
pub const DEFAULT_BANDWIDTH_MHZ: f64 = 10.0;

/// Coordinate frame of a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateFrame {
    /// `x`/`y` are meters on a plane
    Planar,
    /// `x` is longitude and `y` is latitude, in degrees
    Geographic,
}

/// A candidate radio installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Stable id: the site's row position in the raw input table, before any
    /// row was filtered out. Never reassigned.
    pub id: usize,
    /// Easting in meters, or longitude for geographic catalogs
    pub x: f64,
    /// Northing in meters, or latitude for geographic catalogs
    pub y: f64,
    pub tx_power_dbm: f64,
    pub frequency_ghz: f64,
    pub bandwidth_mhz: f64,
}

impl Site {
    /// Site with default radio parameters
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            tx_power_dbm: DEFAULT_TX_POWER_DBM,
            frequency_ghz: DEFAULT_FREQUENCY_GHZ,
            bandwidth_mhz: DEFAULT_BANDWIDTH_MHZ,
        }
    }

    /// Override the transmit power
    pub fn with_tx_power(mut self, dbm: f64) -> Self {
        self.tx_power_dbm = dbm;
        self
    }

    /// Transmit power in watts
    #[inline]
    pub fn tx_power_watts(&self) -> f64 {
        10f64.powf((self.tx_power_dbm - 30.0) / 10.0)
    }

    /// Both coordinates are finite numbers
    #[inline]
    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
