use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// A half-infinite ray. `direction` need not be unit length; ray parameters
/// are measured in multiples of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    /// Finite origin and a finite, non-zero direction.
    pub fn is_valid(&self) -> bool {
        self.origin.is_valid() && self.direction.normalized().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3d::ORIGIN, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(ray.at(1.5), Point3d::new(0.0, 0.0, 3.0));
        assert!(ray.is_valid());
        assert!(!Ray::new(Point3d::ORIGIN, Vec3::ZERO).is_valid());
    }
}
