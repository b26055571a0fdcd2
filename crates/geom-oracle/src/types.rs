use geom_types::Point3d;
use serde::{Deserialize, Serialize};

/// One intersection event between two curves, or between two spans of the
/// same curve for self-intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveEvent {
    pub point: Point3d,
    /// Parameter on the first curve.
    pub t_a: f64,
    /// Parameter on the second curve.
    pub t_b: f64,
    /// True for tangential contact or a shared overlap span; false for a
    /// transversal crossing.
    pub overlap: bool,
}

/// One intersection event between a curve and a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSurfaceEvent {
    pub point: Point3d,
    /// Parameter on the curve.
    pub t: f64,
    pub u: f64,
    pub v: f64,
    pub overlap: bool,
}

/// The nearest hit of a ray on a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshRayEvent {
    pub point: Point3d,
    /// Ray parameter, in multiples of the ray direction.
    pub t: f64,
    pub face: usize,
}

/// Closest point on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveProjection {
    pub point: Point3d,
    pub t: f64,
}

/// Closest point on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceProjection {
    pub point: Point3d,
    pub u: f64,
    pub v: f64,
}

/// Errors raised by a geometry kernel.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("numerical failure: {reason}")]
    Numerical { reason: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

impl OracleError {
    /// Stable name of the variant, reported alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::NotSupported { .. } => "NotSupported",
            OracleError::Numerical { .. } => "Numerical",
            OracleError::Other { .. } => "Other",
        }
    }
}
