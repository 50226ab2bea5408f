//! Regular mesh generation.
//!
//! Sample centres sit half a cell inside each cell, so a domain of
//! [268, 269) at 0.5 deg spacing yields longitudes 268.25 and 268.75.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::points::PointSet;

/// Domain and spacing of a generated grid, all in degrees.
/// Upper bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub lat_start: f64,
    pub lat_stop: f64,
    pub lon_start: f64,
    pub lon_stop: f64,
    pub spacing: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            lat_start: 30.0,
            lat_stop: 31.0,
            lon_start: 268.0,
            lon_stop: 269.0,
            spacing: 0.0005,
        }
    }
}

impl GridSpec {
    pub fn validate(&self) -> Result<()> {
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(GridError::Config(format!(
                "Grid spacing must be a positive number, got {}",
                self.spacing
            )));
        }
        if !(self.lat_stop > self.lat_start) || !(self.lon_stop > self.lon_start) {
            return Err(GridError::Config(format!(
                "Empty grid domain: lat [{}, {}), lon [{}, {})",
                self.lat_start, self.lat_stop, self.lon_start, self.lon_stop
            )));
        }
        Ok(())
    }

    /// Cell-centre latitudes, south to north.
    pub fn lat_axis(&self) -> Vec<f64> {
        cell_centres(self.lat_start, self.lat_stop, self.spacing)
    }

    /// Cell-centre longitudes, west to east.
    pub fn lon_axis(&self) -> Vec<f64> {
        cell_centres(self.lon_start, self.lon_stop, self.spacing)
    }

    /// Flattened mesh, longitude varying fastest, with zero amplitude and phase.
    pub fn build(&self) -> Result<PointSet> {
        self.validate()?;
        let lats = self.lat_axis();
        let lons = self.lon_axis();
        debug!("Building {}x{} grid at {} deg spacing", lats.len(), lons.len(), self.spacing);

        let n = lats.len() * lons.len();
        let mut llon = Vec::with_capacity(n);
        let mut llat = Vec::with_capacity(n);
        for &lat in &lats {
            for &lon in &lons {
                llon.push(lon);
                llat.push(lat);
            }
        }
        PointSet::zeros(llon, llat)
    }
}

/// Half-open range `[start, stop)` with `ceil((stop - start) / step)`
/// samples at `start + i * step`.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n = ((stop - start) / step).ceil();
    if !(n > 0.0) {
        return Vec::new();
    }
    (0..n as usize).map(|i| start + i as f64 * step).collect()
}

fn cell_centres(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let half = step / 2.0;
    arange(start, stop, step).into_iter().map(|v| v + half).collect()
}
