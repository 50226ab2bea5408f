//! NetCDF files through libnetcdf (feature `netcdf`).
//!
//! Writes NETCDF4 with the classic data model. Reading goes through
//! `netcdf::open`, so NETCDF4 and the classic CDF-1/CDF-2 formats are all
//! accepted.

use std::path::Path;

use crate::error::{GridError, Result};
use crate::nc_classic::NcVariable;
use crate::points::PointSet;

/// Same layout as the native writer: one dimension per variable.
pub fn write(path: &Path, vars: &[NcVariable]) -> Result<()> {
    let mut file =
        netcdf::create_with(path, netcdf::Options::NETCDF4 | netcdf::Options::CLASSIC)?;
    for var in vars {
        file.add_dimension(var.name, var.values.len())?;
    }
    for var in vars {
        let mut v = file.add_variable::<f64>(var.name, &[var.name])?;
        v.put_attribute("units", var.units)?;
        v.put_values(var.values, ..)?;
    }
    Ok(())
}

fn values(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| GridError::Format(format!("Missing NetCDF variable '{}'", name)))?;
    Ok(var.get_values::<f64, _>(..)?)
}

/// Read the `latitude`, `longitude`, `amplitude` and `phase` variables.
pub fn read(path: &Path) -> Result<PointSet> {
    let file = netcdf::open(path)?;
    PointSet::from_columns(
        values(&file, "longitude")?,
        values(&file, "latitude")?,
        values(&file, "amplitude")?,
        values(&file, "phase")?,
    )
}
