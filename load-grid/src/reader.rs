//! Loading an existing grid as the starting point of a run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::points::PointSet;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Source of an initial grid. Implementations only need to turn a path into
/// a point set; the run never inspects the file itself. With `regular_grid`
/// the points must form a full lat x lon mesh.
pub trait GridReader {
    fn read_grid(&self, path: &Path, regular_grid: bool) -> Result<PointSet>;
}

/// Reads NetCDF files (`.nc`) and `lat lon amp pha` text files, optionally
/// gzip-compressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileGridReader;

impl GridReader for FileGridReader {
    fn read_grid(&self, path: &Path, regular_grid: bool) -> Result<PointSet> {
        info!(":: Reading starting grid from {}", path.display());
        let points = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("nc") => read_nc(path)?,
            _ => parse_text(open_maybe_gzip(path)?)?,
        };
        if points.is_empty() {
            return Err(GridError::Format(format!("{} contains no points", path.display())));
        }
        debug!("Read {} points", points.len());

        if regular_grid {
            let (rows, cols) = points.regular_shape()?;
            debug!("Starting grid is a regular {}x{} mesh", rows, cols);
        }
        Ok(points)
    }
}

/// Open a file for buffered reading, decompressing transparently if it
/// starts with the gzip magic bytes.
pub fn open_maybe_gzip(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut file = BufReader::new(File::open(path)?);
    let is_gzip = file.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        debug!("{} is gzip-compressed", path.display());
        // The decoder is wrapped again so that lines can be read from it.
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Parse whitespace-separated `lat lon amp pha` rows. Blank lines and lines
/// starting with `#` are skipped; extra columns are ignored.
pub fn parse_text<R: BufRead>(reader: R) -> Result<PointSet> {
    let (mut lon, mut lat, mut amp, mut pha) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace().map(|f| {
            f.parse::<f64>().map_err(|_| {
                GridError::Format(format!("Line {}: '{}' is not a number", lineno + 1, f))
            })
        });
        let mut next = || {
            fields.next().unwrap_or_else(|| {
                Err(GridError::Format(format!(
                    "Line {}: expected 4 columns (lat lon amp pha)",
                    lineno + 1
                )))
            })
        };
        lat.push(next()?);
        lon.push(next()?);
        amp.push(next()?);
        pha.push(next()?);
    }
    PointSet::from_columns(lon, lat, amp, pha)
}

/// Read the `latitude`, `longitude`, `amplitude` and `phase` variables of a
/// NetCDF file.
#[cfg(feature = "netcdf")]
pub fn read_nc(path: &Path) -> Result<PointSet> {
    crate::nc4::read(path)
}

/// Read the `latitude`, `longitude`, `amplitude` and `phase` variables of a
/// classic (CDF-1/CDF-2) NetCDF file.
#[cfg(not(feature = "netcdf"))]
pub fn read_nc(path: &Path) -> Result<PointSet> {
    let ds = crate::nc_classic::NcDataset::from_bytes(std::fs::read(path)?)?;
    PointSet::from_columns(
        ds.values("longitude")?,
        ds.values("latitude")?,
        ds.values("amplitude")?,
        ds.values("phase")?,
    )
}
