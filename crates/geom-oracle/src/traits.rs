use geom_types::{BoundingBox, Point3d, Ray, Tolerance};

use crate::types::*;

/// Exact geometry provided by a kernel. The spatial query layer only prunes
/// and orchestrates; every exact answer comes through this trait.
///
/// Implemented by `AnalyticOracle` (closed-form segments, polylines, planar
/// patches and triangle meshes) and `MockOracle` (call-counting, fault
/// injecting test double).
pub trait GeometryOracle {
    type Curve;
    type Surface;
    type Mesh;

    /// Exact axis-aligned bounds of a curve.
    fn curve_bounds(&self, curve: &Self::Curve) -> BoundingBox;

    /// Exact axis-aligned bounds of a surface.
    fn surface_bounds(&self, surface: &Self::Surface) -> BoundingBox;

    /// The kernel's own validity predicate for a curve.
    fn curve_is_valid(&self, curve: &Self::Curve) -> bool;

    fn surface_is_valid(&self, surface: &Self::Surface) -> bool;

    fn mesh_is_valid(&self, mesh: &Self::Mesh) -> bool;

    /// Project `point` onto a curve.
    fn closest_point_on_curve(
        &self,
        curve: &Self::Curve,
        point: &Point3d,
    ) -> Result<CurveProjection, OracleError>;

    /// Project `point` onto a surface.
    fn closest_point_on_surface(
        &self,
        surface: &Self::Surface,
        point: &Point3d,
    ) -> Result<SurfaceProjection, OracleError>;

    /// All intersection events between two curves within `tolerance`.
    fn intersect_curves(
        &self,
        a: &Self::Curve,
        b: &Self::Curve,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveEvent>, OracleError>;

    /// Self-intersection events of one curve. `t_a < t_b` for every event.
    fn intersect_curve_self(
        &self,
        curve: &Self::Curve,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveEvent>, OracleError>;

    fn intersect_curve_surface(
        &self,
        curve: &Self::Curve,
        surface: &Self::Surface,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveSurfaceEvent>, OracleError>;

    /// Nearest hit of `ray` on `mesh`, or `None` when the ray misses.
    fn intersect_mesh_ray(
        &self,
        mesh: &Self::Mesh,
        ray: &Ray,
    ) -> Result<Option<MeshRayEvent>, OracleError>;
}
