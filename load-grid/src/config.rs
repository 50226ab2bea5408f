//! Run configuration.
//!
//! Everything a run needs is carried in a `RunConfig`; defaults reproduce the
//! settings of the reference load model (a single box near 91.2 W, 30.3 N on
//! a 0.0005 deg grid). A config can be read from JSON, where every field is
//! optional, and the CLI then overrides individual values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::check_meridian_bounds;
use crate::error::{GridError, Result};
use crate::geometry::BoundingBox;
use crate::grid::GridSpec;
use crate::heatmap::Colormap;
use crate::output::NcFlavor;
use crate::stamp::Stamp;

/// Which files a run writes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSelection {
    /// NetCDF file for the convolution (default output)
    pub nc: bool,
    /// Plain-text `lat lon amp pha` file (alternative input for the convolution)
    pub txt: bool,
    /// GMT `lon lat amp` file
    pub gmt: bool,
    /// PNG preview of the amplitude field; regular grids only
    pub png: bool,
    /// Gzip both text outputs
    pub gzip_text: bool,
    pub nc_flavor: NcFlavor,
    pub colormap: Colormap,
}

impl Default for OutputSelection {
    fn default() -> Self {
        Self {
            nc: true,
            txt: false,
            gmt: false,
            png: false,
            gzip_text: false,
            nc_flavor: NcFlavor::default(),
            colormap: Colormap::default(),
        }
    }
}

impl OutputSelection {
    /// Whether at least one of the three data formats is selected.
    /// The PNG preview alone does not count.
    pub fn any_data_format(&self) -> bool {
        self.nc || self.txt || self.gmt
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Box to stamp, in degrees
    pub bbox: BoundingBox,

    /// Wrap longitudes >= 180 before classifying; the box must then use
    /// west in [-180,0] and east in [0,180]
    pub pm_correct: bool,

    /// Load height/phase and which side of the box receives it
    pub stamp: Stamp,

    /// Existing grid to start from instead of generating one
    pub initial_grid: Option<PathBuf>,

    /// Whether the initial grid is a full lat x lon mesh
    pub regular_grid: bool,

    /// Domain and spacing of the generated grid (unused with `initial_grid`)
    pub grid: GridSpec,

    /// Base name of the output files
    pub outfile: String,

    /// Directory holding the `GMT`, `nc`, `text` (and `PNG`) trees
    pub output_root: PathBuf,

    pub outputs: OutputSelection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::new(360.0 - 91.2277957, 360.0 - 91.2172368, 30.3089489, 30.31811),
            pm_correct: false,
            stamp: Stamp::default(),
            initial_grid: None,
            regular_grid: true,
            grid: GridSpec::default(),
            outfile: "custom_load".to_string(),
            output_root: PathBuf::from("output/Grid_Files"),
            outputs: OutputSelection::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Check every setting that would make the run fail. Nothing here
    /// touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        if !self.outputs.any_data_format() {
            return Err(GridError::Config(
                "No output file(s) selected. Options: netCDF, GMT, and/or plain-text.".to_string(),
            ));
        }
        if cfg!(not(feature = "netcdf"))
            && self.outputs.nc
            && self.outputs.nc_flavor == NcFlavor::Netcdf4Classic
        {
            return Err(GridError::Config(
                "NETCDF4 output requires building with the `netcdf` feature".to_string(),
            ));
        }

        let b = &self.bbox;
        if ![b.west, b.east, b.south, b.north].iter().all(|v| v.is_finite()) {
            return Err(GridError::Config(format!("Bounding box must be finite, got {}", b)));
        }
        if self.pm_correct {
            check_meridian_bounds(b)?;
        }

        if self.initial_grid.is_none() {
            self.grid.validate()?;
        }
        if self.outfile.trim().is_empty() {
            return Err(GridError::Config("Output file name is empty".to_string()));
        }
        Ok(())
    }
}
