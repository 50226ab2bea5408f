use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::geometry::{BoundingBox, MeridianShift};
use crate::points::PointSet;

/// Indices of the points inside and outside a bounding box.
///
/// The two predicates are both inclusive, so points exactly on an edge
/// appear in both lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub inside: Vec<usize>,
    pub outside: Vec<usize>,
}

impl Classification {
    /// Indices present in both sets.
    pub fn boundary(&self) -> Vec<usize> {
        // Both lists are produced in ascending order.
        let mut out = Vec::new();
        let (mut i, mut o) = (0, 0);
        while i < self.inside.len() && o < self.outside.len() {
            match self.inside[i].cmp(&self.outside[o]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => o += 1,
                std::cmp::Ordering::Equal => {
                    out.push(self.inside[i]);
                    i += 1;
                    o += 1;
                }
            }
        }
        out
    }
}

/// Split points by the box without any longitude correction.
pub fn classify(points: &PointSet, bbox: &BoundingBox) -> Classification {
    let mut result = Classification::default();
    for (i, p) in points.coords().enumerate() {
        if bbox.excludes(&p) {
            result.outside.push(i);
        }
        if bbox.contains(&p) {
            result.inside.push(i);
        }
    }
    debug!(
        "Classified {} points: {} inside, {} outside",
        points.len(),
        result.inside.len(),
        result.outside.len()
    );
    result
}

/// Classify, optionally wrapping longitudes >= 180 into [-180,0) first.
///
/// With `pm_correct` the box must follow the signed convention
/// (west <= 0, east >= 0); otherwise this is a configuration error and the
/// points are left untouched. Longitudes are restored before returning.
pub fn classify_with_correction(
    points: &mut PointSet,
    bbox: &BoundingBox,
    pm_correct: bool,
) -> Result<Classification> {
    if !pm_correct {
        return Ok(classify(points, bbox));
    }

    check_meridian_bounds(bbox)?;
    info!(":: Applying the prime-meridian correction.");
    let shift = MeridianShift::apply(points.lon_mut());
    debug!("Wrapped {} longitudes", shift.len());
    let result = classify(points, bbox);
    shift.revert(points.lon_mut());
    Ok(result)
}

pub fn check_meridian_bounds(bbox: &BoundingBox) -> Result<()> {
    if bbox.straddles_prime_meridian() {
        Ok(())
    } else {
        Err(GridError::Config(format!(
            "When applying the prime-meridian correction, the longitudes of the bounding box \
             must range from [-180,180] (west <= 0, east >= 0); got {}",
            bbox
        )))
    }
}
