use crate::error::{GridError, Result};
use crate::geometry::CoordGeo;

// --------------------------------------------------------------------------
// PointSet

/// Parallel longitude, latitude, amplitude and phase sequences.
///
/// The four sequences always have the same length; the fields are private so
/// that nothing can grow one column without the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    lon: Vec<f64>,
    lat: Vec<f64>,
    amp: Vec<f64>,
    pha: Vec<f64>,
}

impl PointSet {
    /// Points at the given coordinates with zero amplitude and phase.
    pub fn zeros(lon: Vec<f64>, lat: Vec<f64>) -> Result<Self> {
        let n = lon.len();
        Self::from_columns(lon, lat, vec![0.0; n], vec![0.0; n])
    }

    pub fn from_columns(lon: Vec<f64>, lat: Vec<f64>, amp: Vec<f64>, pha: Vec<f64>) -> Result<Self> {
        let n = lon.len();
        if lat.len() != n || amp.len() != n || pha.len() != n {
            return Err(GridError::Format(format!(
                "Column lengths differ (lon {}, lat {}, amp {}, pha {})",
                n,
                lat.len(),
                amp.len(),
                pha.len()
            )));
        }
        Ok(Self { lon, lat, amp, pha })
    }

    pub fn len(&self) -> usize {
        self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn amp(&self) -> &[f64] {
        &self.amp
    }

    pub fn pha(&self) -> &[f64] {
        &self.pha
    }

    pub fn lon_mut(&mut self) -> &mut [f64] {
        &mut self.lon
    }

    /// Mutable amplitude and phase columns, borrowed together.
    pub fn values_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.amp, &mut self.pha)
    }

    pub fn coord(&self, i: usize) -> CoordGeo {
        CoordGeo { latitude: self.lat[i], longitude: self.lon[i] }
    }

    pub fn coords(&self) -> impl Iterator<Item = CoordGeo> + '_ {
        self.lat
            .iter()
            .zip(&self.lon)
            .map(|(&latitude, &longitude)| CoordGeo { latitude, longitude })
    }

    /// Check that the points form a regular lat x lon mesh and return its
    /// (rows, columns).
    pub fn regular_shape(&self) -> Result<(usize, usize)> {
        let (lat_axis, lon_axis, _) = self.mesh_cells()?;
        Ok((lat_axis.len(), lon_axis.len()))
    }

    /// Reshape into a regular lat x lon mesh.
    ///
    /// Fails with a format error unless every (lat, lon) combination of the
    /// distinct axis values occurs exactly once.
    pub fn to_regular(&self) -> Result<RegularGrid> {
        let (lat_axis, lon_axis, cells) = self.mesh_cells()?;
        let (height, width) = (lat_axis.len(), lon_axis.len());
        let mut amp = Grid2D::new(width, height);
        let mut pha = Grid2D::new(width, height);
        for (i, &idx) in cells.iter().enumerate() {
            amp.data[idx] = self.amp[i];
            pha.data[idx] = self.pha[i];
        }
        Ok(RegularGrid { lat: lat_axis, lon: lon_axis, amp, pha })
    }

    /// Distinct sorted axes plus the row-major cell of every point.
    fn mesh_cells(&self) -> Result<(Vec<f64>, Vec<f64>, Vec<usize>)> {
        let lat_axis = distinct_sorted(&self.lat);
        let lon_axis = distinct_sorted(&self.lon);
        let (height, width) = (lat_axis.len(), lon_axis.len());
        if height * width != self.len() {
            return Err(GridError::Format(format!(
                "{} points do not form a regular {}x{} grid",
                self.len(),
                height,
                width
            )));
        }

        let mut filled = vec![false; width * height];
        let mut cells = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let row = axis_index(&lat_axis, self.lat[i])?;
            let col = axis_index(&lon_axis, self.lon[i])?;
            let idx = row * width + col;
            if filled[idx] {
                return Err(GridError::Format(format!(
                    "Duplicate grid point at {}",
                    self.coord(i)
                )));
            }
            filled[idx] = true;
            cells.push(idx);
        }
        Ok((lat_axis, lon_axis, cells))
    }
}

fn distinct_sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v
}

fn axis_index(axis: &[f64], value: f64) -> Result<usize> {
    axis.binary_search_by(|x| x.total_cmp(&value))
        .map_err(|_| GridError::Format(format!("Coordinate {} is not on the grid axis", value)))
}


// --------------------------------------------------------------------------
// Grid2D / RegularGrid

/// Dense 2-D array stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Grid2D {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, data: vec![0.0; width * height] }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }
}

/// Regular-grid view of a point set: 1-D axes plus reshaped values.
/// Row 0 is the southernmost latitude, column 0 the westernmost longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGrid {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub amp: Grid2D,
    pub pha: Grid2D,
}
