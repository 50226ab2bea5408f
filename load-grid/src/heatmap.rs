use std::path::Path;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::points::Grid2D;

/// Available colormaps for the amplitude preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Blue -> Cyan -> Green -> Yellow -> Red
    #[default]
    Jet,
    /// Purple -> Blue -> Green -> Yellow
    Viridis,
    /// Blue -> Cyan -> Green -> Yellow -> Orange -> Red
    Turbo,
}

impl Colormap {
    /// Map a normalized value [0.0, 1.0] to an RGB color
    pub fn map(&self, value: f64) -> (u8, u8, u8) {
        let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        match self {
            Colormap::Jet => jet(v),
            Colormap::Viridis => interpolate(&VIRIDIS, v),
            Colormap::Turbo => interpolate(&TURBO, v),
        }
    }
}

const VIRIDIS: [(f64, f64, f64); 5] = [
    (0.267004, 0.004874, 0.329415),
    (0.282623, 0.140926, 0.457517),
    (0.163625, 0.471133, 0.558148),
    (0.477504, 0.821444, 0.318195),
    (0.993248, 0.906157, 0.143936),
];

const TURBO: [(f64, f64, f64); 6] = [
    (0.18995, 0.07176, 0.23217),
    (0.11770, 0.56700, 0.75088),
    (0.17205, 0.88797, 0.54362),
    (0.89567, 0.99343, 0.29685),
    (0.97809, 0.55414, 0.10540),
    (0.78801, 0.08080, 0.06051),
];

fn to_rgb((r, g, b): (f64, f64, f64)) -> (u8, u8, u8) {
    ((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

/// Piecewise-linear interpolation between evenly spaced control points
fn interpolate(points: &[(f64, f64, f64)], v: f64) -> (u8, u8, u8) {
    let idx = v * (points.len() - 1) as f64;
    let i = idx.floor() as usize;
    if i >= points.len() - 1 {
        return to_rgb(points[points.len() - 1]);
    }
    let t = idx - i as f64;
    let (r0, g0, b0) = points[i];
    let (r1, g1, b1) = points[i + 1];
    to_rgb((r0 + t * (r1 - r0), g0 + t * (g1 - g0), b0 + t * (b1 - b0)))
}

fn jet(v: f64) -> (u8, u8, u8) {
    let r = if v < 0.375 {
        0.0
    } else if v < 0.625 {
        (v - 0.375) / 0.25
    } else if v < 0.875 {
        1.0
    } else {
        1.0 - (v - 0.875) / 0.125 * 0.5
    };
    let g = if v < 0.125 {
        0.0
    } else if v < 0.375 {
        (v - 0.125) / 0.25
    } else if v < 0.625 {
        1.0
    } else if v < 0.875 {
        1.0 - (v - 0.625) / 0.25
    } else {
        0.0
    };
    let b = if v < 0.125 {
        0.5 + v / 0.125 * 0.5
    } else if v < 0.375 {
        1.0
    } else if v < 0.625 {
        1.0 - (v - 0.375) / 0.25
    } else {
        0.0
    };
    to_rgb((r, g, b))
}

/// Finite minimum and maximum of the grid, if any value is finite.
fn value_range(grid: &Grid2D) -> Option<(f64, f64)> {
    grid.data.iter().copied().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Linear position of `v` in `[lo, hi]`; a flat grid maps to 0.
fn normalize(v: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        (v - lo) / (hi - lo)
    } else {
        0.0
    }
}

/// Paint the amplitude grid, one pixel per cell with north up, and save to PNG.
pub fn save_heatmap_to_png(grid: &Grid2D, output_path: &Path, colormap: Colormap) -> Result<()> {
    info!(":: Writing amplitude preview.");
    let (lo, hi) = value_range(grid).unwrap_or((0.0, 0.0));
    debug!("Amplitude range in grid: [{}, {}]", lo, hi);

    let root = BitMapBackend::new(output_path, (grid.width as u32, grid.height as u32))
        .into_drawing_area();
    root.fill(&BLACK).map_err(plot_error)?;

    for row in 0..grid.height {
        // Row 0 is the southernmost latitude; image rows grow downwards.
        let y = (grid.height - 1 - row) as i32;
        for col in 0..grid.width {
            let (r, g, b) = colormap.map(normalize(grid.get(row, col), lo, hi));
            root.draw_pixel((col as i32, y), &RGBColor(r, g, b)).map_err(plot_error)?;
        }
    }

    root.present().map_err(plot_error)?;
    Ok(())
}

fn plot_error<E: std::fmt::Display>(e: E) -> GridError {
    GridError::Plot(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colormap_endpoints() {
        assert_eq!(Colormap::Jet.map(0.0), (0, 0, 127));
        assert_eq!(Colormap::Viridis.map(1.0), to_rgb(VIRIDIS[4]));
        assert_eq!(Colormap::Turbo.map(2.0), to_rgb(TURBO[5]));
        assert_eq!(Colormap::Turbo.map(f64::NAN), to_rgb(TURBO[0]));
    }

    #[test]
    fn range_ignores_non_finite_values() {
        let grid = Grid2D { width: 2, height: 2, data: vec![1.0, f64::NAN, -3.0, 8.41] };
        assert_eq!(value_range(&grid), Some((-3.0, 8.41)));
        assert_eq!(normalize(8.41, -3.0, 8.41), 1.0);
        assert_eq!(normalize(5.0, 5.0, 5.0), 0.0);
    }

    #[test]
    fn writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let mut grid = Grid2D::new(4, 3);
        grid.data[5] = 8.41;
        save_heatmap_to_png(&grid, &path, Colormap::Viridis).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
