//! The kernel boundary. Every oracle call made by this crate goes through
//! [`guarded`], which turns kernel errors and panics into `OracleFault`.

use std::panic::{self, AssertUnwindSafe};

use geom_oracle::{GeometryOracle, OracleError};
use geom_types::BoundingBox;
use tracing::warn;

use crate::failure::{Failure, QueryResult};

pub(crate) fn guarded<T>(
    operation: &'static str,
    indices: &[usize],
    call: impl FnOnce() -> Result<T, OracleError>,
) -> QueryResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            warn!(operation, ?indices, %error, "oracle returned an error");
            Err(Failure::oracle_error(operation, indices, &error))
        }
        Err(payload) => {
            warn!(operation, ?indices, "oracle panicked");
            Err(Failure::oracle_panic(operation, indices, payload.as_ref()))
        }
    }
}

/// Validate every curve and collect its exact bounds.
pub(crate) fn curve_bounds<O: GeometryOracle>(
    oracle: &O,
    curves: &[O::Curve],
) -> QueryResult<Vec<BoundingBox>> {
    let mut boxes = Vec::with_capacity(curves.len());
    for (i, curve) in curves.iter().enumerate() {
        if !guarded("curve_is_valid", &[i], || Ok(oracle.curve_is_valid(curve)))? {
            return Err(Failure::geometry_invalid("curve", i));
        }
        let bounds = guarded("curve_bounds", &[i], || Ok(oracle.curve_bounds(curve)))?;
        if !bounds.is_valid() {
            return Err(Failure::geometry_invalid("curve", i));
        }
        boxes.push(bounds);
    }
    Ok(boxes)
}

/// Validate every surface and collect its exact bounds.
pub(crate) fn surface_bounds<O: GeometryOracle>(
    oracle: &O,
    surfaces: &[O::Surface],
) -> QueryResult<Vec<BoundingBox>> {
    let mut boxes = Vec::with_capacity(surfaces.len());
    for (i, surface) in surfaces.iter().enumerate() {
        if !guarded("surface_is_valid", &[i], || Ok(oracle.surface_is_valid(surface)))? {
            return Err(Failure::geometry_invalid("surface", i));
        }
        let bounds = guarded("surface_bounds", &[i], || Ok(oracle.surface_bounds(surface)))?;
        if !bounds.is_valid() {
            return Err(Failure::geometry_invalid("surface", i));
        }
        boxes.push(bounds);
    }
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureCode;
    use geom_oracle::{AnalyticOracle, Curve};
    use geom_types::Point3d;

    #[test]
    fn test_guarded_passes_values_through() {
        assert_eq!(guarded("op", &[0], || Ok(7)), Ok(7));
    }

    #[test]
    fn test_guarded_wraps_errors() {
        let err = guarded::<()>("intersect_curves", &[1, 2], || {
            Err(OracleError::Numerical {
                reason: "singular".into(),
            })
        })
        .unwrap_err();
        assert_eq!(err.code, FailureCode::OracleFault);
        let meta = err.metadata.unwrap();
        assert_eq!(meta["operation"], "intersect_curves");
        assert_eq!(meta["fault"], "error");
    }

    #[test]
    fn test_guarded_catches_panics() {
        let err = guarded::<()>("intersect_mesh_ray", &[4], || panic!("kernel bug")).unwrap_err();
        assert_eq!(err.code, FailureCode::OracleFault);
        assert_eq!(err.metadata.unwrap()["detail"], "kernel bug");
    }

    #[test]
    fn test_curve_bounds_reports_first_invalid() {
        let curves = [
            Curve::segment(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0)),
            Curve::segment(Point3d::ORIGIN, Point3d::ORIGIN),
            Curve::segment(Point3d::ORIGIN, Point3d::UNSET),
        ];
        let err = curve_bounds(&AnalyticOracle::new(), &curves).unwrap_err();
        assert_eq!(err.code, FailureCode::GeometryInvalid);
        assert_eq!(err.metadata.unwrap()["index"], 1);
    }
}
