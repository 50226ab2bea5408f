pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod heatmap;
#[cfg(feature = "netcdf")]
mod nc4;
pub mod nc_classic;
pub mod output;
pub mod points;
pub mod progress_writer;
pub mod reader;
pub mod run;
pub mod stamp;

pub use config::RunConfig;
pub use error::{GridError, Result};
