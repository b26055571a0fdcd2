//! Closed-form reference kernel for segments, polylines, planar patches and
//! triangle meshes.

use geom_types::{BoundingBox, Point3d, Ray, Tolerance};
use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};
use tracing::trace;

use crate::primitives::*;
use crate::traits::GeometryOracle;
use crate::types::*;

/// Stateless analytic kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticOracle;

impl AnalyticOracle {
    pub fn new() -> Self {
        Self
    }
}

// ─── Segment helpers ───────────────────────────────────────────────────────

/// Unclamped parameter of the projection of `p` onto the line through `seg`.
fn line_parameter(seg: &Segment, p: &Point3d) -> f64 {
    let d = seg.direction();
    (*p - seg.start).dot(&d) / d.length_squared()
}

/// Parameters `(s, t)` of the closest points between two non-degenerate
/// segments, both clamped to `[0, 1]`.
pub fn segment_closest_params(a: &Segment, b: &Segment) -> (f64, f64) {
    let d1 = a.direction();
    let d2 = b.direction();
    let r = a.start - b.start;
    let aa = d1.length_squared();
    let ee = d2.length_squared();
    let f = d2.dot(&r);
    let c = d1.dot(&r);
    let bb = d1.dot(&d2);
    let denom = aa * ee - bb * bb;

    let mut s = if denom > 0.0 {
        ((bb * f - c * ee) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = (bb * s + f) / ee;
    if t < 0.0 {
        t = 0.0;
        s = (-c / aa).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((bb - c) / aa).clamp(0.0, 1.0);
    }
    (s, t)
}

fn segment_segment(a: &Segment, b: &Segment, tol: &Tolerance) -> Vec<CurveEvent> {
    if a.direction().is_parallel_to(&b.direction(), tol.angular) {
        return collinear_contact(a, b, tol);
    }
    let (s, t) = segment_closest_params(a, b);
    let pa = a.point_at(s);
    if pa.distance_to(&b.point_at(t)) <= tol.absolute {
        vec![CurveEvent {
            point: pa,
            t_a: s,
            t_b: t,
            overlap: false,
        }]
    } else {
        vec![]
    }
}

/// Parallel segments: nothing, a single end-to-end touch, or an overlap span
/// reported as two overlap events at its ends.
fn collinear_contact(a: &Segment, b: &Segment, tol: &Tolerance) -> Vec<CurveEvent> {
    let d1 = a.direction();
    let offset = (b.start - a.start).cross(&d1).length() / d1.length();
    if offset > tol.absolute {
        return vec![];
    }

    let s0 = line_parameter(a, &b.start);
    let s1 = line_parameter(a, &b.end);
    let lo = s0.min(s1).max(0.0);
    let hi = s0.max(s1).min(1.0);
    let slack = tol.absolute / a.length();
    if lo > hi + slack {
        return vec![];
    }

    let event = |s: f64, overlap: bool| {
        let point = a.point_at(s);
        CurveEvent {
            point,
            t_a: s,
            t_b: b.closest_parameter(&point),
            overlap,
        }
    };

    if hi - lo <= slack {
        vec![event(((lo + hi) * 0.5).clamp(0.0, 1.0), false)]
    } else {
        vec![event(lo, true), event(hi, true)]
    }
}

/// Merge events that landed on the same point, e.g. a crossing exactly at a
/// polyline vertex reported by both adjacent spans.
fn merge_curve_events(events: &mut Vec<CurveEvent>, tol: &Tolerance) {
    events.sort_by(|a, b| a.t_a.total_cmp(&b.t_a).then(a.t_b.total_cmp(&b.t_b)));
    events.dedup_by(|a, b| a.overlap == b.overlap && a.point.distance_to(&b.point) <= tol.absolute);
}

// ─── Patch helpers ─────────────────────────────────────────────────────────

/// In-plane `(u, v)` coordinates of the projection of `p` onto the patch plane.
fn patch_parameters(patch: &Patch, p: &Point3d) -> Option<(f64, f64)> {
    let w = *p - patch.origin;
    let uu = patch.u_axis.dot(&patch.u_axis);
    let uv = patch.u_axis.dot(&patch.v_axis);
    let vv = patch.v_axis.dot(&patch.v_axis);
    let gram = Matrix2::new(uu, uv, uv, vv);
    let rhs = Vector2::new(w.dot(&patch.u_axis), w.dot(&patch.v_axis));
    let sol = gram.try_inverse()? * rhs;
    Some((sol[0], sol[1]))
}

fn within(value: f64, slack: f64) -> bool {
    value >= -slack && value <= 1.0 + slack
}

fn segment_patch(seg: &Segment, patch: &Patch, tol: &Tolerance) -> Vec<CurveSurfaceEvent> {
    let Some(normal) = patch.normal() else {
        return vec![];
    };
    let d = seg.direction();
    let u_slack = tol.absolute / patch.u_axis.length();
    let v_slack = tol.absolute / patch.v_axis.length();

    if (std::f64::consts::FRAC_PI_2 - d.angle_to(&normal)).abs() < tol.angular {
        // Segment parallel to the plane.
        if (seg.start - patch.origin).dot(&normal).abs() > tol.absolute {
            return vec![];
        }
        return [0.0, 1.0]
            .iter()
            .filter_map(|&t| {
                let point = seg.point_at(t);
                let (u, v) = patch_parameters(patch, &point)?;
                (within(u, u_slack) && within(v, v_slack)).then(|| CurveSurfaceEvent {
                    point,
                    t,
                    u: u.clamp(0.0, 1.0),
                    v: v.clamp(0.0, 1.0),
                    overlap: true,
                })
            })
            .collect();
    }

    let m = Matrix3::new(
        patch.u_axis.x, patch.v_axis.x, -d.x,
        patch.u_axis.y, patch.v_axis.y, -d.y,
        patch.u_axis.z, patch.v_axis.z, -d.z,
    );
    let w = seg.start - patch.origin;
    let Some(sol) = m.lu().solve(&Vector3::new(w.x, w.y, w.z)) else {
        return vec![];
    };
    let (u, v, t) = (sol[0], sol[1], sol[2]);
    let t_slack = tol.absolute / seg.length();
    if !(within(t, t_slack) && within(u, u_slack) && within(v, v_slack)) {
        return vec![];
    }
    let t = t.clamp(0.0, 1.0);
    vec![CurveSurfaceEvent {
        point: seg.point_at(t),
        t,
        u: u.clamp(0.0, 1.0),
        v: v.clamp(0.0, 1.0),
        overlap: false,
    }]
}

// ─── Ray / triangle ────────────────────────────────────────────────────────

/// Möller-Trumbore. Returns the ray parameter of the hit, if any, with `t >= 0`.
fn ray_triangle(ray: &Ray, tri: &[Point3d; 3]) -> Option<f64> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let pvec = ray.direction.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < 1e-14 {
        return None;
    }
    let inv = 1.0 / det;
    let tvec = ray.origin - tri[0];
    let u = tvec.dot(&pvec) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let v = ray.direction.dot(&qvec) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv;
    (t >= 0.0).then_some(t)
}

impl GeometryOracle for AnalyticOracle {
    type Curve = Curve;
    type Surface = Patch;
    type Mesh = TriangleMesh;

    fn curve_bounds(&self, curve: &Curve) -> BoundingBox {
        curve.bounds()
    }

    fn surface_bounds(&self, surface: &Patch) -> BoundingBox {
        surface.bounds()
    }

    fn curve_is_valid(&self, curve: &Curve) -> bool {
        curve.is_valid()
    }

    fn surface_is_valid(&self, surface: &Patch) -> bool {
        surface.is_valid()
    }

    fn mesh_is_valid(&self, mesh: &TriangleMesh) -> bool {
        mesh.is_valid()
    }

    fn closest_point_on_curve(
        &self,
        curve: &Curve,
        point: &Point3d,
    ) -> Result<CurveProjection, OracleError> {
        curve
            .spans()
            .into_iter()
            .map(|(offset, span)| {
                let s = span.closest_parameter(point);
                CurveProjection {
                    point: span.point_at(s),
                    t: offset + s,
                }
            })
            .min_by(|a, b| {
                a.point
                    .distance_squared_to(point)
                    .total_cmp(&b.point.distance_squared_to(point))
            })
            .ok_or_else(|| OracleError::Numerical {
                reason: "curve has no spans".into(),
            })
    }

    fn closest_point_on_surface(
        &self,
        surface: &Patch,
        point: &Point3d,
    ) -> Result<SurfaceProjection, OracleError> {
        let (u, v) = patch_parameters(surface, point).ok_or_else(|| OracleError::Numerical {
            reason: "degenerate patch axes".into(),
        })?;
        if within(u, 0.0) && within(v, 0.0) {
            return Ok(SurfaceProjection {
                point: surface.point_at(u, v),
                u,
                v,
            });
        }

        // Outside the patch: nearest point on the boundary.
        let boundary: [(Point3d, Point3d, fn(f64) -> (f64, f64)); 4] = [
            (surface.point_at(0.0, 0.0), surface.point_at(1.0, 0.0), |t| (t, 0.0)),
            (surface.point_at(1.0, 0.0), surface.point_at(1.0, 1.0), |t| (1.0, t)),
            (surface.point_at(1.0, 1.0), surface.point_at(0.0, 1.0), |t| (1.0 - t, 1.0)),
            (surface.point_at(0.0, 1.0), surface.point_at(0.0, 0.0), |t| (0.0, 1.0 - t)),
        ];
        let mut best: Option<(f64, SurfaceProjection)> = None;
        for (start, end, to_uv) in boundary {
            let edge = Segment::new(start, end);
            let t = edge.closest_parameter(point);
            let candidate = edge.point_at(t);
            let dist = candidate.distance_squared_to(point);
            if best.as_ref().map_or(true, |(d, _)| dist < *d) {
                let (u, v) = to_uv(t);
                best = Some((
                    dist,
                    SurfaceProjection {
                        point: candidate,
                        u,
                        v,
                    },
                ));
            }
        }
        best.map(|(_, p)| p).ok_or_else(|| OracleError::Numerical {
            reason: "patch boundary projection failed".into(),
        })
    }

    fn intersect_curves(
        &self,
        a: &Curve,
        b: &Curve,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveEvent>, OracleError> {
        let spans_b = b.spans();
        let mut events = Vec::new();
        for (offset_a, span_a) in a.spans() {
            for (offset_b, span_b) in &spans_b {
                events.extend(segment_segment(&span_a, span_b, tolerance).into_iter().map(|e| {
                    CurveEvent {
                        t_a: e.t_a + offset_a,
                        t_b: e.t_b + offset_b,
                        ..e
                    }
                }));
            }
        }
        merge_curve_events(&mut events, tolerance);
        trace!(event_count = events.len(), "curve/curve");
        Ok(events)
    }

    fn intersect_curve_self(
        &self,
        curve: &Curve,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveEvent>, OracleError> {
        let Curve::Polyline(polyline) = curve else {
            return Ok(vec![]);
        };
        let n = polyline.span_count();
        let closed = polyline.is_closed();
        let mut events = Vec::new();
        for i in 0..n {
            for j in (i + 2)..n {
                if closed && i == 0 && j == n - 1 {
                    continue;
                }
                let (span_i, span_j) = (polyline.span(i), polyline.span(j));
                events.extend(segment_segment(&span_i, &span_j, tolerance).into_iter().map(|e| {
                    CurveEvent {
                        t_a: e.t_a + i as f64,
                        t_b: e.t_b + j as f64,
                        ..e
                    }
                }));
            }
        }
        merge_curve_events(&mut events, tolerance);
        Ok(events)
    }

    fn intersect_curve_surface(
        &self,
        curve: &Curve,
        surface: &Patch,
        tolerance: &Tolerance,
    ) -> Result<Vec<CurveSurfaceEvent>, OracleError> {
        if surface.normal().is_none() {
            return Err(OracleError::Numerical {
                reason: "degenerate patch axes".into(),
            });
        }
        let mut events: Vec<CurveSurfaceEvent> = Vec::new();
        for (offset, span) in curve.spans() {
            events.extend(
                segment_patch(&span, surface, tolerance)
                    .into_iter()
                    .map(|e| CurveSurfaceEvent { t: e.t + offset, ..e }),
            );
        }
        events.sort_by(|a, b| a.t.total_cmp(&b.t));
        events.dedup_by(|a, b| {
            a.overlap == b.overlap && a.point.distance_to(&b.point) <= tolerance.absolute
        });
        Ok(events)
    }

    fn intersect_mesh_ray(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
    ) -> Result<Option<MeshRayEvent>, OracleError> {
        let mut best: Option<MeshRayEvent> = None;
        for face in 0..mesh.faces.len() {
            let Some(t) = ray_triangle(ray, &mesh.triangle(face)) else {
                continue;
            };
            if best.map_or(true, |b| t < b.t) {
                best = Some(MeshRayEvent {
                    point: ray.at(t),
                    t,
                    face,
                });
            }
        }
        Ok(best)
    }
}
