//! Deterministic test double implementing GeometryOracle.
//!
//! Delegates geometry to `AnalyticOracle`, counts narrow-phase calls so tests
//! can prove the broad phase pruned a pair, and can inject a kernel error or a
//! panic on a chosen call.

use std::cell::Cell;

use geom_types::{BoundingBox, Point3d, Ray, Tolerance};

use crate::analytic::AnalyticOracle;
use crate::primitives::*;
use crate::traits::GeometryOracle;
use crate::types::*;

/// Failure injected on the call with the given zero-based index. `Error` and
/// `Panic` count pairwise narrow-phase calls; the `Self*` variants count
/// self-intersection calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Error { on_call: usize },
    Panic { on_call: usize },
    SelfError { on_call: usize },
    SelfPanic { on_call: usize },
}

#[derive(Debug, Default)]
pub struct MockOracle {
    inner: AnalyticOracle,
    narrow_calls: Cell<usize>,
    self_calls: Cell<usize>,
    fault: Option<Fault>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::default()
        }
    }

    /// Pairwise narrow-phase calls made so far (curve/curve, curve/surface,
    /// mesh/ray), failed calls included.
    pub fn narrow_phase_calls(&self) -> usize {
        self.narrow_calls.get()
    }

    /// Self-intersection calls made so far.
    pub fn self_intersection_calls(&self) -> usize {
        self.self_calls.get()
    }

    fn tick(&self, operation: &str) -> Result<(), OracleError> {
        let call = self.narrow_calls.get();
        self.narrow_calls.set(call + 1);
        self.inject(operation, call, false)
    }

    fn tick_self(&self, operation: &str) -> Result<(), OracleError> {
        let call = self.self_calls.get();
        self.self_calls.set(call + 1);
        self.inject(operation, call, true)
    }

    fn inject(&self, operation: &str, call: usize, self_call: bool) -> Result<(), OracleError> {
        match (self.fault, self_call) {
            (Some(Fault::Error { on_call }), false) | (Some(Fault::SelfError { on_call }), true)
                if on_call == call =>
            {
                Err(OracleError::Other {
                    message: format!("injected failure in {operation} (call {call})"),
                })
            }
            (Some(Fault::Panic { on_call }), false) | (Some(Fault::SelfPanic { on_call }), true)
                if on_call == call =>
            {
                panic!("injected panic in {operation} (call {call})")
            }
            _ => Ok(()),
        }
    }
}

impl GeometryOracle for MockOracle {
    type Curve = Curve;
    type Surface = Patch;
    type Mesh = TriangleMesh;

    fn curve_bounds(&self, curve: &Curve) -> BoundingBox {
        self.inner.curve_bounds(curve)
    }

    fn surface_bounds(&self, surface: &Patch) -> BoundingBox {
        self.inner.surface_bounds(surface)
    }

    fn curve_is_valid(&self, curve: &Curve) -> bool {
        self.inner.curve_is_valid(curve)
    }

    fn surface_is_valid(&self, surface: &Patch) -> bool {
        self.inner.surface_is_valid(surface)
    }

    fn mesh_is_valid(&self, mesh: &TriangleMesh) -> bool {
        self.inner.mesh_is_valid(mesh)
    }

    fn closest_point_on_curve(
        &self,
        curve: &Curve,
        point: &Point3d,
    ) -> Result<CurveProjection, OracleError> {
        self.tick("closest_point_on_curve")?;
        self.inner.closest_point_on_curve(curve, point)
    }

    fn closest_point_on_surface(
        &self,
        surface: &Patch,
        point: &Point3d,
    ) -> Result<SurfaceProjection, OracleError> {
        self.tick("closest_point_on_surface")?;
        self.inner.closest_point_on_surface(surface, point)
    }

    fn intersect_curves(
        &self,
        a: &Curve,
        b: &Curve,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveEvent>, OracleError> {
        self.tick("intersect_curves")?;
        self.inner.intersect_curves(a, b, tolerance)
    }

    fn intersect_curve_self(
        &self,
        curve: &Curve,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveEvent>, OracleError> {
        self.tick_self("intersect_curve_self")?;
        self.inner.intersect_curve_self(curve, tolerance)
    }

    fn intersect_curve_surface(
        &self,
        curve: &Curve,
        surface: &Patch,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveSurfaceEvent>, OracleError> {
        self.tick("intersect_curve_surface")?;
        self.inner.intersect_curve_surface(curve, surface, tolerance)
    }

    fn intersect_mesh_ray(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
    ) -> Result<Option<MeshRayEvent>, OracleError> {
        self.tick("intersect_mesh_ray")?;
        self.inner.intersect_mesh_ray(mesh, ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossing() -> (Curve, Curve) {
        (
            Curve::segment(Point3d::new(0.0, 0.0, 0.0), Point3d::new(2.0, 2.0, 0.0)),
            Curve::segment(Point3d::new(0.0, 2.0, 0.0), Point3d::new(2.0, 0.0, 0.0)),
        )
    }

    #[test]
    fn test_counts_calls() {
        let oracle = MockOracle::new();
        let (a, b) = crossing();
        let tol = Tolerance::default();
        assert_eq!(oracle.intersect_curves(&a, &b, &tol).unwrap().len(), 1);
        oracle.intersect_curve_self(&a, &tol).unwrap();
        assert_eq!(oracle.narrow_phase_calls(), 1);
        assert_eq!(oracle.self_intersection_calls(), 1);
    }

    #[test]
    fn test_injected_error_on_chosen_call() {
        let oracle = MockOracle::with_fault(Fault::Error { on_call: 1 });
        let (a, b) = crossing();
        let tol = Tolerance::default();
        assert!(oracle.intersect_curves(&a, &b, &tol).is_ok());
        assert!(matches!(
            oracle.intersect_curves(&a, &b, &tol),
            Err(OracleError::Other { .. })
        ));
        assert!(oracle.intersect_curves(&a, &b, &tol).is_ok());
    }

    #[test]
    fn test_self_fault_counts_self_calls_only() {
        let oracle = MockOracle::with_fault(Fault::SelfError { on_call: 0 });
        let (a, b) = crossing();
        let tol = Tolerance::default();
        assert!(oracle.intersect_curves(&a, &b, &tol).is_ok());
        assert!(matches!(
            oracle.intersect_curve_self(&a, &tol),
            Err(OracleError::Other { .. })
        ));
        assert!(oracle.intersect_curve_self(&a, &tol).is_ok());
        assert_eq!(oracle.narrow_phase_calls(), 1);
        assert_eq!(oracle.self_intersection_calls(), 2);
    }

    #[test]
    #[should_panic(expected = "injected panic in intersect_curve_self")]
    fn test_injected_self_panic() {
        let oracle = MockOracle::with_fault(Fault::SelfPanic { on_call: 0 });
        let (a, _) = crossing();
        let _ = oracle.intersect_curve_self(&a, &Tolerance::default());
    }

    #[test]
    #[should_panic(expected = "injected panic")]
    fn test_injected_panic() {
        let oracle = MockOracle::with_fault(Fault::Panic { on_call: 0 });
        let (a, b) = crossing();
        let _ = oracle.intersect_curves(&a, &b, &Tolerance::default());
    }
}
