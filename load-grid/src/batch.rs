//! Many runs over a table of boxes and a list of load heights.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::config::RunConfig;
use crate::error::{GridError, Result};
use crate::geometry::BoundingBox;
use crate::reader::GridReader;
use crate::run::{run, RunReport};

/// One row of the box table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoxRow {
    pub id: u32,
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl BoxRow {
    pub fn bbox(&self, lon_offset: f64) -> BoundingBox {
        BoundingBox::new(self.west, self.east, self.south, self.north).offset_longitudes(lon_offset)
    }
}

pub fn read_boxes(path: &Path) -> Result<Vec<BoxRow>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    /// Load heights (m); each one gets a full pass over the boxes
    pub heights: Vec<f64>,
    /// Leading part of every output name
    pub prefix: String,
    /// Only use rows whose `type` column equals this
    pub kind: Option<String>,
    /// Added to west and east of every row, e.g. 360 for tables in [-180,180]
    pub lon_offset: f64,
}

impl BatchPlan {
    /// Rows that take part, ordered by id.
    pub fn select<'a>(&self, rows: &'a [BoxRow]) -> Result<Vec<&'a BoxRow>> {
        let mut selected: Vec<&BoxRow> = rows
            .iter()
            .filter(|r| match &self.kind {
                Some(kind) => r.kind.as_deref() == Some(kind.as_str()),
                None => true,
            })
            .collect();
        if selected.is_empty() {
            return Err(GridError::Config(match &self.kind {
                Some(kind) => format!("Box table has no rows of type '{}'", kind),
                None => "Box table is empty".to_string(),
            }));
        }
        selected.sort_by_key(|r| r.id);
        Ok(selected)
    }

    /// Per-run configurations, heights outermost, area numbers restarting at 1.
    pub fn configs(&self, base: &RunConfig, rows: &[BoxRow]) -> Result<Vec<RunConfig>> {
        if self.heights.is_empty() {
            return Err(GridError::Config("No load heights given".to_string()));
        }
        let selected = self.select(rows)?;
        let mut configs = Vec::with_capacity(self.heights.len() * selected.len());
        for &height in &self.heights {
            for (n, row) in selected.iter().enumerate() {
                let mut config = base.clone();
                config.bbox = row.bbox(self.lon_offset);
                config.stamp.amplitude = height;
                config.outfile = run_name(&self.prefix, height, n + 1);
                configs.push(config);
            }
        }
        Ok(configs)
    }
}

pub fn run_batch(
    base: &RunConfig,
    plan: &BatchPlan,
    rows: &[BoxRow],
    reader: &dyn GridReader,
) -> Result<Vec<RunReport>> {
    let configs = plan.configs(base, rows)?;
    let total = configs.len();
    let mut reports = Vec::with_capacity(total);
    for (i, config) in configs.iter().enumerate() {
        info!("Run {}/{}: {} ({} m)", i + 1, total, config.outfile, config.stamp.amplitude);
        reports.push(run(config, reader)?);
    }
    Ok(reports)
}

/// `<prefix>_<amp>m-area<n>`
pub fn run_name(prefix: &str, amplitude: f64, area: usize) -> String {
    format!("{}_{}m-area{}", prefix, format_amp(amplitude), area)
}

/// Shortest round-trip form with a trailing `.0` on whole numbers. Values
/// below 1e-4 or from 1e16 upwards use exponent notation with a signed,
/// two-digit exponent (`1e-05`, `1.5e+16`).
fn format_amp(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let sci = format!("{:e}", v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if v != 0.0 && !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exp.abs());
    }
    let s = v.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}
