use std::fmt;

use serde::{Deserialize, Serialize};

// --------------------------------------------------------------------------
// CoordGeo

/// A geographic sample position in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoordGeo {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for CoordGeo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ latitude: {}, longitude: {} }}", self.latitude, self.longitude)
    }
}


// --------------------------------------------------------------------------
// BoundingBox

/// Rectangular region in degrees.
///
/// Longitudes are normally given in [0,360]. When the prime-meridian
/// correction is used, `west` must lie in [-180,0] and `east` in [0,180].
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self { west, east, south, north }
    }

    /// Inside predicate; inclusive on all four edges.
    pub fn contains(&self, p: &CoordGeo) -> bool {
        p.longitude >= self.west
            && p.latitude >= self.south
            && p.longitude <= self.east
            && p.latitude <= self.north
    }

    /// Outside predicate. Also inclusive on the edges, so a point lying
    /// exactly on an edge satisfies both `contains` and `excludes`.
    pub fn excludes(&self, p: &CoordGeo) -> bool {
        p.longitude <= self.west
            || p.latitude <= self.south
            || p.longitude >= self.east
            || p.latitude >= self.north
    }

    /// Whether the bounds follow the signed convention the prime-meridian
    /// correction needs (west in [-180,0], east in [0,180]).
    pub fn straddles_prime_meridian(&self) -> bool {
        self.west <= 0.0 && self.east >= 0.0
    }

    /// Same box with `offset` added to both longitude bounds.
    pub fn offset_longitudes(&self, offset: f64) -> Self {
        Self {
            west: self.west + offset,
            east: self.east + offset,
            ..*self
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ west: {}, east: {}, south: {}, north: {} }}",
            self.west, self.east, self.south, self.north
        )
    }
}


// --------------------------------------------------------------------------
// Transform

pub trait Transform<CoordType> {
    fn transform(&self, input: &CoordType) -> CoordType;
}

#[derive(Copy, Clone)]
pub struct ShiftLongitude {
    pub degrees: f64,
}

impl Transform<f64> for ShiftLongitude {
    fn transform(&self, input: &f64) -> f64 {
        input + self.degrees
    }
}


// --------------------------------------------------------------------------
// MeridianShift

/// Longitudes at or above this value are wrapped by the correction.
pub const MERIDIAN_WRAP_THRESHOLD: f64 = 180.0;

/// Record of a prime-meridian correction applied to a longitude sequence.
///
/// `apply` moves every longitude >= 180 into [-180,0) and remembers which
/// indices it touched; `revert` moves exactly those back. For values in
/// [180,360] both subtractions are exact, so the round trip is bitwise.
#[derive(Debug)]
#[must_use = "a shifted longitude sequence must be reverted"]
pub struct MeridianShift {
    shifted: Vec<usize>,
}

impl MeridianShift {
    pub fn apply(lon: &mut [f64]) -> Self {
        let forward = ShiftLongitude { degrees: -360.0 };
        let mut shifted = Vec::new();
        for (i, l) in lon.iter_mut().enumerate() {
            if *l >= MERIDIAN_WRAP_THRESHOLD {
                *l = forward.transform(l);
                shifted.push(i);
            }
        }
        Self { shifted }
    }

    pub fn revert(self, lon: &mut [f64]) {
        let back = ShiftLongitude { degrees: 360.0 };
        for &i in &self.shifted {
            lon[i] = back.transform(&lon[i]);
        }
    }

    /// Number of longitudes that were wrapped.
    pub fn len(&self) -> usize {
        self.shifted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifted.is_empty()
    }
}
