use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::Classification;
use crate::points::PointSet;

/// Constant load applied to one or both sides of the bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stamp {
    /// Load height (m)
    pub amplitude: f64,
    /// Phase (deg)
    pub phase: f64,
    pub set_inside: bool,
    pub set_outside: bool,
}

impl Default for Stamp {
    fn default() -> Self {
        Self { amplitude: 8.41, phase: 0.0, set_inside: true, set_outside: false }
    }
}

impl Stamp {
    /// Write the constant values in place. The outside set is stamped first,
    /// so the inside value wins on boundary points when both flags are set.
    pub fn apply(&self, points: &mut PointSet, classes: &Classification) {
        let (amp, pha) = points.values_mut();
        if self.set_outside {
            fill(amp, pha, &classes.outside, self.amplitude, self.phase);
            debug!("Stamped {} points outside the box", classes.outside.len());
        }
        if self.set_inside {
            fill(amp, pha, &classes.inside, self.amplitude, self.phase);
            debug!("Stamped {} points inside the box", classes.inside.len());
        }
    }
}

fn fill(amp: &mut [f64], pha: &mut [f64], indices: &[usize], a: f64, p: f64) {
    for &i in indices {
        amp[i] = a;
        pha[i] = p;
    }
}
