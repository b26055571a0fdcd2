use serde::{Deserialize, Serialize};

/// Resolved tolerances for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Points closer than this are coincident. Also the broad-phase inflation
    /// margin and the narrow-phase distance tolerance.
    pub absolute: f64,
    /// Directions closer than this angle (radians) are parallel.
    pub angular: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: 1e-6,
            angular: 1e-10,
        }
    }
}

impl Tolerance {
    /// Absolute tolerance with the default angular tolerance.
    pub fn absolute(absolute: f64) -> Self {
        Self {
            absolute,
            ..Self::default()
        }
    }

    /// Both values finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.absolute.is_finite()
            && self.absolute >= 0.0
            && self.angular.is_finite()
            && self.angular >= 0.0
    }
}
