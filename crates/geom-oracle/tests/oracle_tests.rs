//! Contract tests run against every GeometryOracle implementation.

use geom_oracle::{AnalyticOracle, Curve, GeometryOracle, MockOracle, Patch, TriangleMesh};
use geom_types::{Point3d, Ray, Tolerance, Vec3};

fn p(x: f64, y: f64, z: f64) -> Point3d {
    Point3d::new(x, y, z)
}

/// Events from `intersect_curves(a, b)` lie on both curves within tolerance.
fn check_events_lie_on_both_curves<O>(oracle: &O)
where
    O: GeometryOracle<Curve = Curve>,
{
    let tol = Tolerance::absolute(1e-9);
    let a = Curve::polyline(vec![p(0.0, 0.0, 0.0), p(4.0, 4.0, 0.0), p(8.0, 0.0, 0.0)]);
    let b = Curve::segment(p(0.0, 1.0, 0.0), p(8.0, 1.0, 0.0));
    let events = oracle.intersect_curves(&a, &b, &tol).unwrap();
    assert_eq!(events.len(), 2);
    for e in &events {
        assert!(a.point_at(e.t_a).distance_to(&e.point) < 1e-9);
        assert!(b.point_at(e.t_b).distance_to(&e.point) < 1e-9);
        assert!(!e.overlap);
    }
    assert!(events[0].t_a < events[1].t_a);
}

/// Bounds enclose the sampled curve.
fn check_bounds_enclose_curve<O>(oracle: &O)
where
    O: GeometryOracle<Curve = Curve>,
{
    let curve = Curve::polyline(vec![p(-1.0, 2.0, 3.0), p(4.0, -5.0, 6.0), p(0.0, 0.0, -7.0)]);
    let bounds = oracle.curve_bounds(&curve);
    for i in 0..=20 {
        let t = i as f64 * 0.1;
        assert!(bounds.contains_point(&curve.point_at(t)), "t = {t}");
    }
}

/// Coplanar ray misses, perpendicular ray hits the nearer of two stacked faces.
fn check_mesh_ray<O>(oracle: &O)
where
    O: GeometryOracle<Mesh = TriangleMesh>,
{
    let mesh = TriangleMesh::new(
        vec![
            p(0.0, 0.0, 0.0),
            p(2.0, 0.0, 0.0),
            p(0.0, 2.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(2.0, 0.0, 1.0),
            p(0.0, 2.0, 1.0),
        ],
        vec![[0, 1, 2], [3, 4, 5]],
    );
    assert!(oracle.mesh_is_valid(&mesh));

    let down = Ray::new(p(0.5, 0.5, 5.0), Vec3::new(0.0, 0.0, -1.0));
    let event = oracle.intersect_mesh_ray(&mesh, &down).unwrap().unwrap();
    assert_eq!(event.face, 1);
    assert!((event.t - 4.0).abs() < 1e-12);

    let sideways = Ray::new(p(5.0, 5.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
    assert!(oracle.intersect_mesh_ray(&mesh, &sideways).unwrap().is_none());
}

fn check_surface_projection<O>(oracle: &O)
where
    O: GeometryOracle<Surface = Patch>,
{
    let patch = Patch::xy_rect(0.0, 0.0, 4.0, 2.0, 1.0);
    let inside = oracle.closest_point_on_surface(&patch, &p(1.0, 1.0, 3.0)).unwrap();
    assert!((inside.u - 0.25).abs() < 1e-12);
    assert!((inside.v - 0.5).abs() < 1e-12);
    assert!(inside.point.distance_to(&p(1.0, 1.0, 1.0)) < 1e-12);

    let outside = oracle.closest_point_on_surface(&patch, &p(6.0, 1.0, 1.0)).unwrap();
    assert!(outside.point.distance_to(&p(4.0, 1.0, 1.0)) < 1e-12);
    assert!((outside.u - 1.0).abs() < 1e-12);
}

#[test]
fn analytic_oracle_contract() {
    let oracle = AnalyticOracle::new();
    check_events_lie_on_both_curves(&oracle);
    check_bounds_enclose_curve(&oracle);
    check_mesh_ray(&oracle);
    check_surface_projection(&oracle);
}

#[test]
fn mock_oracle_contract() {
    let oracle = MockOracle::new();
    check_events_lie_on_both_curves(&oracle);
    check_bounds_enclose_curve(&oracle);
    check_mesh_ray(&oracle);
    check_surface_projection(&oracle);
    // One curve pair, two rays, two projections.
    assert_eq!(oracle.narrow_phase_calls(), 5);
}
