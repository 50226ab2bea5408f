use thiserror::Error;

/// Errors that can occur while generating or writing a load grid
#[derive(Debug, Error)]
pub enum GridError {
    /// Invalid run settings (no output selected, bad bounding box, bad spacing, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error while reading input or writing output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input grid
    #[error("Format error: {0}")]
    Format(String),

    /// Box table could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// PNG preview rendering failed
    #[error("Plot error: {0}")]
    Plot(String),

    /// libnetcdf reported an error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
}

/// Type alias for Results using GridError
pub type Result<T> = std::result::Result<T, GridError>;
