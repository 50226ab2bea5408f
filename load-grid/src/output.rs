//! Serializers and the output directory layout.
//!
//! Layout below the output root:
//! - `GMT/Custom/height-anomaly_<name>.txt`: `lon lat amp`
//! - `nc/Custom/convgf_<name>.nc`: NetCDF, one dimension per variable
//! - `text/Custom/convgf_<name>.txt`: `lat lon amp pha`
//! - `PNG/Custom/height-anomaly_<name>.png`: amplitude preview

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::nc_classic::{self, NcVariable};
use crate::points::PointSet;
use crate::progress_writer::ProgressWriter;

/// Which NetCDF flavour to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NcFlavor {
    /// NETCDF4 with the classic data model, written through libnetcdf
    Netcdf4Classic,
    /// 64-bit offset format (CDF-2), written natively
    Offset64,
}

impl Default for NcFlavor {
    /// NETCDF4-classic whenever libnetcdf is linked in.
    fn default() -> Self {
        if cfg!(feature = "netcdf") {
            NcFlavor::Netcdf4Classic
        } else {
            NcFlavor::Offset64
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn gmt_dir(&self) -> PathBuf {
        self.root.join("GMT").join("Custom")
    }

    pub fn nc_dir(&self) -> PathBuf {
        self.root.join("nc").join("Custom")
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join("text").join("Custom")
    }

    pub fn png_dir(&self) -> PathBuf {
        self.root.join("PNG").join("Custom")
    }

    /// Create the GMT, nc and text directories (and the PNG one if asked).
    /// Safe to call repeatedly.
    pub fn create_dirs(&self, with_png: bool) -> Result<()> {
        let mut dirs = vec![self.gmt_dir(), self.nc_dir(), self.text_dir()];
        if with_png {
            dirs.push(self.png_dir());
        }
        for dir in dirs {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn gmt_path(&self, name: &str, gzip: bool) -> PathBuf {
        self.gmt_dir().join(text_file_name("height-anomaly_", name, gzip))
    }

    pub fn nc_path(&self, name: &str) -> PathBuf {
        self.nc_dir().join(format!("convgf_{}.nc", name))
    }

    pub fn text_path(&self, name: &str, gzip: bool) -> PathBuf {
        self.text_dir().join(text_file_name("convgf_", name, gzip))
    }

    pub fn png_path(&self, name: &str) -> PathBuf {
        self.png_dir().join(format!("height-anomaly_{}.png", name))
    }
}

fn text_file_name(prefix: &str, name: &str, gzip: bool) -> String {
    if gzip {
        format!("{}{}.txt.gz", prefix, name)
    } else {
        format!("{}{}.txt", prefix, name)
    }
}


// --------------------------------------------------------------------------
// Writers

fn create_file(path: &Path) -> Result<ProgressWriter<BufWriter<File>, impl FnMut(u64)>> {
    let file = BufWriter::new(File::create(path)?);
    let shown = path.display().to_string();
    Ok(ProgressWriter::new(file, move |n| {
        debug!("{}: {} MiB written", shown, n / (1024 * 1024))
    }))
}

/// Write rows through `write_rows`, optionally gzip-compressed.
fn write_text<F>(path: &Path, gzip: bool, write_rows: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let mut out = create_file(path)?;
    if gzip {
        let mut enc = GzEncoder::new(&mut out, Compression::default());
        write_rows(&mut enc)?;
        enc.finish()?;
    } else {
        write_rows(&mut out)?;
    }
    out.flush()?;
    Ok(())
}

/// `lon lat amp` rows, six decimals, for plotting with GMT.
pub fn write_gmt(path: &Path, points: &PointSet, gzip: bool) -> Result<()> {
    info!(":: Writing GMT-convenient text file.");
    write_text(path, gzip, |out| write_gmt_rows(out, points))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

pub fn write_gmt_rows(out: &mut dyn Write, points: &PointSet) -> std::io::Result<()> {
    for i in 0..points.len() {
        writeln!(out, "{:.6} {:.6} {:.6}", points.lon()[i], points.lat()[i], points.amp()[i])?;
    }
    Ok(())
}

/// `lat lon amp pha` rows, six decimals, for use by the convolution.
pub fn write_txt(path: &Path, points: &PointSet, gzip: bool) -> Result<()> {
    info!(":: Writing plain-text file.");
    write_text(path, gzip, |out| write_txt_rows(out, points))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

pub fn write_txt_rows(out: &mut dyn Write, points: &PointSet) -> std::io::Result<()> {
    for i in 0..points.len() {
        writeln!(
            out,
            "{:.6} {:.6} {:.6} {:.6}",
            points.lat()[i],
            points.lon()[i],
            points.amp()[i],
            points.pha()[i]
        )?;
    }
    Ok(())
}

/// Variables in the order they appear in the NetCDF file.
pub fn nc_variables(points: &PointSet) -> [NcVariable<'_>; 4] {
    [
        NcVariable { name: "latitude", units: "degree_north", values: points.lat() },
        NcVariable { name: "longitude", units: "degree_east", values: points.lon() },
        NcVariable { name: "amplitude", units: "m", values: points.amp() },
        NcVariable { name: "phase", units: "degree", values: points.pha() },
    ]
}

pub fn write_nc(path: &Path, points: &PointSet, flavor: NcFlavor) -> Result<()> {
    info!(":: Writing netCDF-formatted file.");
    match flavor {
        NcFlavor::Offset64 => {
            let mut out = create_file(path)?;
            nc_classic::write_classic(&mut out, &nc_variables(points))?;
            out.flush()?;
        }
        NcFlavor::Netcdf4Classic => write_netcdf4(path, points)?,
    }
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(feature = "netcdf")]
fn write_netcdf4(path: &Path, points: &PointSet) -> Result<()> {
    crate::nc4::write(path, &nc_variables(points))
}

#[cfg(not(feature = "netcdf"))]
fn write_netcdf4(_path: &Path, _points: &PointSet) -> Result<()> {
    Err(crate::error::GridError::Config(
        "NETCDF4 output requires building with the `netcdf` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{open_maybe_gzip, parse_text, read_nc};

    fn sample() -> PointSet {
        PointSet::from_columns(
            vec![268.25, 268.75, -0.5],
            vec![30.25, 30.25, -1.0 / 3.0],
            vec![0.0, 8.41, 1e-9],
            vec![0.0, 0.0, 90.0],
        )
        .unwrap()
    }

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new("out/Grid_Files");
        assert_eq!(
            layout.nc_path("MR_load_8.41m-area1"),
            Path::new("out/Grid_Files/nc/Custom/convgf_MR_load_8.41m-area1.nc")
        );
        assert_eq!(
            layout.gmt_path("a", false),
            Path::new("out/Grid_Files/GMT/Custom/height-anomaly_a.txt")
        );
        assert_eq!(
            layout.text_path("a", true),
            Path::new("out/Grid_Files/text/Custom/convgf_a.txt.gz")
        );
    }

    #[test]
    fn create_dirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("Grid_Files"));
        layout.create_dirs(false).unwrap();
        layout.create_dirs(false).unwrap();
        assert!(layout.gmt_dir().is_dir());
        assert!(layout.nc_dir().is_dir());
        assert!(layout.text_dir().is_dir());
        assert!(!layout.png_dir().exists());
    }

    #[test]
    fn text_rows_use_six_decimals() {
        let mut buf = Vec::new();
        write_txt_rows(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "30.250000 268.250000 0.000000 0.000000");
        assert_eq!(lines[2], "-0.333333 -0.500000 0.000000 90.000000");

        let mut buf = Vec::new();
        write_gmt_rows(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("268.750000 30.250000 8.410000"));
    }

    #[test]
    fn text_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        for gzip in [false, true] {
            let path = dir.path().join(text_file_name("convgf_", "t", gzip));
            write_txt(&path, &sample(), gzip).unwrap();
            let back = parse_text(open_maybe_gzip(&path).unwrap()).unwrap();
            assert_eq!(back.len(), 3);
            assert_eq!(back.lon(), sample().lon());
            assert!((back.lat()[2] + 0.333333).abs() < 1e-12);
        }
    }

    #[test]
    fn nc_file_reads_back_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        write_nc(&path, &sample(), NcFlavor::Offset64).unwrap();
        assert_eq!(read_nc(&path).unwrap(), sample());

        let bytes = std::fs::read(&path).unwrap();
        let ds = crate::nc_classic::NcDataset::from_bytes(bytes).unwrap();
        assert_eq!(ds.units("amplitude"), Some("m"));
        assert_eq!(ds.units("phase"), Some("degree"));
        assert_eq!(ds.units("longitude"), Some("degree_east"));
        assert_eq!(ds.dims.len(), 4);
    }

    #[cfg(not(feature = "netcdf"))]
    #[test]
    fn netcdf4_without_feature_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_nc(&dir.path().join("x.nc"), &sample(), NcFlavor::Netcdf4Classic);
        assert!(matches!(err, Err(crate::error::GridError::Config(_))));
    }

    #[cfg(feature = "netcdf")]
    #[test]
    fn default_nc_is_netcdf4_classic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.nc");
        write_nc(&path, &sample(), NcFlavor::default()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89HDF\r\n\x1a\n");
        assert_eq!(read_nc(&path).unwrap(), sample());
    }
}
