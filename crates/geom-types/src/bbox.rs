use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// Axis-aligned bounding box.
///
/// Overlap and containment tests are inclusive on faces: two boxes that only
/// touch still intersect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    /// A degenerate box around a single point.
    pub fn from_point(p: Point3d) -> Self {
        Self { min: p, max: p }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3d::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: &Point3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Offset from the nearest point of the box to `p`; zero inside.
    pub fn offset_to_point(&self, p: &Point3d) -> Vec3 {
        let axis = |v: f64, lo: f64, hi: f64| {
            if v < lo {
                lo - v
            } else if v > hi {
                v - hi
            } else {
                0.0
            }
        };
        Vec3::new(
            axis(p.x, self.min.x, self.max.x),
            axis(p.y, self.min.y, self.max.y),
            axis(p.z, self.min.z, self.max.z),
        )
    }

    /// Squared distance from `p` to the box; zero inside.
    pub fn distance_squared_to_point(&self, p: &Point3d) -> f64 {
        self.offset_to_point(p).length_squared()
    }

    /// Closed sphere test, exact for radii whose square overflows.
    pub fn intersects_sphere(&self, center: &Point3d, radius: f64) -> bool {
        self.offset_to_point(center).within_length(radius)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half the surface area; the insertion cost metric of the index tree.
    pub fn half_area(&self) -> f64 {
        let s = self.size();
        s.x * s.y + s.y * s.z + s.z * s.x
    }

    /// Ordered, finite corners.
    pub fn is_valid(&self) -> bool {
        self.min.is_valid()
            && self.max.is_valid()
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point3d::new(
                self.min.x - margin,
                self.min.y - margin,
                self.min.z - margin,
            ),
            max: Point3d::new(
                self.max.x + margin,
                self.max.y + margin,
                self.max.z + margin,
            ),
        }
    }
}
