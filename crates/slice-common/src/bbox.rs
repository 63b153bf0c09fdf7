//! Geographic bounds of a raster overlay.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees (WGS84).
///
/// Corners are stored as they are handed to a map overlay:
/// south-west `[min_lat, min_lon]` and north-east `[max_lat, max_lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Create bounds from corner coordinates.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Compute bounds from latitude and longitude coordinate axes.
    ///
    /// Axes may be ascending or descending, so the extremes are searched
    /// rather than read from the first and last element. Non-finite
    /// coordinates are ignored. Returns `None` when either axis has no
    /// finite value.
    pub fn from_axes(latitudes: &[f64], longitudes: &[f64]) -> Option<Self> {
        let (min_lat, max_lat) = finite_extent(latitudes)?;
        let (min_lon, max_lon) = finite_extent(longitudes)?;
        Some(Self::new(min_lat, min_lon, max_lat, max_lon))
    }

    /// South-west and north-east corners as `[[lat, lon], [lat, lon]]`.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.min_lat, self.min_lon], [self.max_lat, self.max_lon]]
    }

    /// Center point as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

fn finite_extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
