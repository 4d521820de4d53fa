//! Distance metrics and the fixed local projection used for geographic catalogs.

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const EARTH_RADIUS_M: f64 = EARTH_RADIUS_KM * 1000.0;

/// Great-circle distance in kilometers between two `(lat, lon)` points in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Planar Euclidean distance
#[inline]
pub fn euclidean(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}

/// How distances between two catalog points are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Straight-line distance in the catalog's planar units
    Euclidean,
    /// Great-circle distance in kilometers; points are `(lon, lat)` degrees
    Haversine,
}

impl Metric {
    /// Distance between `(ax, ay)` and `(bx, by)`.
    ///
    /// For [`Metric::Haversine`] `x` is longitude and `y` is latitude.
    #[inline]
    pub fn distance(&self, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
        match self {
            Metric::Euclidean => euclidean(ax, ay, bx, by),
            Metric::Haversine => haversine_km(ay, ax, by, bx),
        }
    }
}

/// Equirectangular projection about a fixed reference point.
///
/// Accurate to well under a percent over city-scale extents, which is the
/// scale the coverage and interference radii operate at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    lat0: f64,
    lon0: f64,
    cos_lat0: f64,
}

impl LocalProjection {
    /// Projection centred on `(lat0, lon0)` in degrees
    pub fn new(lat0: f64, lon0: f64) -> Self {
        Self {
            lat0,
            lon0,
            cos_lat0: lat0.to_radians().cos(),
        }
    }

    /// Projection centred on the mean of `points`, given as `(lon, lat)`.
    /// Returns `None` for an empty slice.
    pub fn centred_on(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let lon0 = points.iter().map(|p| p.0).sum::<f64>() / n;
        let lat0 = points.iter().map(|p| p.1).sum::<f64>() / n;
        Some(Self::new(lat0, lon0))
    }

    /// Map `(lon, lat)` degrees to `(x, y)` meters east/north of the reference.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS_M * (lon - self.lon0).to_radians() * self.cos_lat0;
        let y = EARTH_RADIUS_M * (lat - self.lat0).to_radians();
        (x, y)
    }
}
