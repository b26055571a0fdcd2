//! Primitive shapes understood by the analytic kernel.
//!
//! Curve parameters: a segment runs over `[0, 1]`; a polyline with `n`
//! vertices runs over `[0, n - 1]`, span `i` covering `[i, i + 1]`.
//! Patch parameters `(u, v)` both run over `[0, 1]`.

use geom_types::{BoundingBox, Point3d, Vec3};
use serde::{Deserialize, Serialize};

/// A bounded straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point3d,
    pub end: Point3d,
}

impl Segment {
    pub fn new(start: Point3d, end: Point3d) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn point_at(&self, t: f64) -> Point3d {
        self.start.lerp(&self.end, t)
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid() && self.length() > 0.0
    }

    /// Parameter of the point of the segment nearest to `p`, clamped to `[0, 1]`.
    pub fn closest_parameter(&self, p: &Point3d) -> f64 {
        let d = self.direction();
        let len2 = d.length_squared();
        if len2 == 0.0 {
            return 0.0;
        }
        ((*p - self.start).dot(&d) / len2).clamp(0.0, 1.0)
    }
}

/// A connected chain of segments. Closed when the first and last vertices
/// coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point3d>,
}

impl Polyline {
    pub fn new(points: Vec<Point3d>) -> Self {
        Self { points }
    }

    pub fn span_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn span(&self, i: usize) -> Segment {
        Segment::new(self.points[i], self.points[i + 1])
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 3 && self.points.first() == self.points.last()
    }
}

/// Curves handled by the analytic kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    Segment(Segment),
    Polyline(Polyline),
}

impl Curve {
    pub fn segment(start: Point3d, end: Point3d) -> Self {
        Curve::Segment(Segment::new(start, end))
    }

    pub fn polyline(points: Vec<Point3d>) -> Self {
        Curve::Polyline(Polyline::new(points))
    }

    /// The straight spans of the curve with the parameter offset of each.
    pub fn spans(&self) -> Vec<(f64, Segment)> {
        match self {
            Curve::Segment(s) => vec![(0.0, *s)],
            Curve::Polyline(p) => (0..p.span_count())
                .map(|i| (i as f64, p.span(i)))
                .collect(),
        }
    }

    pub fn point_at(&self, t: f64) -> Point3d {
        match self {
            Curve::Segment(s) => s.point_at(t),
            Curve::Polyline(p) => {
                let n = p.span_count();
                if n == 0 {
                    return p.points.first().copied().unwrap_or(Point3d::UNSET);
                }
                let i = (t.floor().max(0.0) as usize).min(n - 1);
                p.span(i).point_at(t - i as f64)
            }
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        match self {
            Curve::Segment(s) => BoundingBox::from_points(&[s.start, s.end]),
            Curve::Polyline(p) => BoundingBox::from_points(&p.points),
        }
    }

    /// Every span has finite, distinct end points.
    pub fn is_valid(&self) -> bool {
        match self {
            Curve::Segment(s) => s.is_valid(),
            Curve::Polyline(p) => {
                p.points.len() >= 2 && (0..p.span_count()).all(|i| p.span(i).is_valid())
            }
        }
    }
}

/// A planar parallelogram `origin + u * u_axis + v * v_axis`, `u, v` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub origin: Point3d,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl Patch {
    pub fn new(origin: Point3d, u_axis: Vec3, v_axis: Vec3) -> Self {
        Self {
            origin,
            u_axis,
            v_axis,
        }
    }

    /// Axis-aligned rectangle in the XY plane at height `z`.
    pub fn xy_rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64, z: f64) -> Self {
        Self {
            origin: Point3d::new(min_x, min_y, z),
            u_axis: Vec3::new(max_x - min_x, 0.0, 0.0),
            v_axis: Vec3::new(0.0, max_y - min_y, 0.0),
        }
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3d {
        self.origin + self.u_axis * u + self.v_axis * v
    }

    pub fn normal(&self) -> Option<Vec3> {
        self.u_axis.cross(&self.v_axis).normalized()
    }

    pub fn corners(&self) -> [Point3d; 4] {
        [
            self.point_at(0.0, 0.0),
            self.point_at(1.0, 0.0),
            self.point_at(1.0, 1.0),
            self.point_at(0.0, 1.0),
        ]
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.corners())
    }

    pub fn is_valid(&self) -> bool {
        self.origin.is_valid()
            && self.u_axis.is_finite()
            && self.v_axis.is_finite()
            && self.normal().is_some()
    }
}

/// An indexed triangle mesh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3d>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point3d>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn triangle(&self, face: usize) -> [Point3d; 3] {
        let [a, b, c] = self.faces[face];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// At least one face, every index in range, every vertex finite.
    pub fn is_valid(&self) -> bool {
        !self.faces.is_empty()
            && self.vertices.iter().all(Point3d::is_valid)
            && self
                .faces
                .iter()
                .all(|f| f.iter().all(|&i| i < self.vertices.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_parameterization() {
        let curve = Curve::polyline(vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 2.0, 0.0),
        ]);
        assert_eq!(curve.point_at(1.5), Point3d::new(1.0, 1.0, 0.0));
        assert_eq!(curve.point_at(2.0), Point3d::new(1.0, 2.0, 0.0));
        assert_eq!(curve.spans().len(), 2);
        assert!(curve.is_valid());
    }

    #[test]
    fn test_degenerate_curves_are_invalid() {
        assert!(!Curve::segment(Point3d::ORIGIN, Point3d::ORIGIN).is_valid());
        assert!(!Curve::polyline(vec![Point3d::ORIGIN]).is_valid());
        assert!(!Curve::segment(Point3d::ORIGIN, Point3d::UNSET).is_valid());
    }

    #[test]
    fn test_closed_polyline() {
        let square = Polyline::new(vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 0.0, 0.0),
        ]);
        assert!(square.is_closed());
    }

    #[test]
    fn test_patch_and_mesh_validity() {
        assert!(Patch::xy_rect(0.0, 0.0, 1.0, 1.0, 0.0).is_valid());
        assert!(!Patch::new(Point3d::ORIGIN, Vec3::X, Vec3::X).is_valid());

        let mesh = TriangleMesh::new(
            vec![Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0), Point3d::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        assert!(mesh.is_valid());
        assert!(!TriangleMesh::new(mesh.vertices.clone(), vec![[0, 1, 3]]).is_valid());
        assert!(!TriangleMesh::default().is_valid());
    }
}
