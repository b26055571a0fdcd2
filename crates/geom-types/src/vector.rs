use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A vector in 3D Euclidean space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const X: Self = Self {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };
    pub const Y: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const Z: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len < 1e-15 || !len.is_finite() {
            None
        } else {
            Some(*self / len)
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Angle between the two vectors in radians, zero if either is degenerate.
    pub fn angle_to(&self, other: &Self) -> f64 {
        let d = self.dot(other);
        let len_product = self.length() * other.length();
        if len_product < 1e-15 {
            return 0.0;
        }
        (d / len_product).clamp(-1.0, 1.0).acos()
    }

    pub fn is_parallel_to(&self, other: &Self, angular_tol: f64) -> bool {
        let angle = self.angle_to(other);
        angle < angular_tol || (std::f64::consts::PI - angle) < angular_tol
    }

    /// Whether the length is at most `radius`, without overflowing when the
    /// squares exceed `f64::MAX`. A negative or NaN radius admits nothing.
    pub fn within_length(&self, radius: f64) -> bool {
        if !(radius >= 0.0) {
            return false;
        }
        let d2 = self.length_squared();
        let r2 = radius * radius;
        if d2.is_finite() || r2.is_finite() {
            return d2 <= r2;
        }
        let scale = self.x.abs().max(self.y.abs()).max(self.z.abs()).max(radius);
        if !scale.is_finite() {
            return radius.is_infinite() && self.is_finite();
        }
        (*self / scale).length_squared() <= (radius / scale) * (radius / scale)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cross_product() {
        let result = Vec3::X.cross(&Vec3::Y);
        assert_eq!(result, Vec3::Z);
    }

    #[test]
    fn test_normalized_zero_is_none() {
        assert!(Vec3::ZERO.normalized().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parallel() {
        assert!(Vec3::X.is_parallel_to(&(Vec3::X * 5.0), 1e-10));
        assert!(Vec3::X.is_parallel_to(&(-Vec3::X), 1e-10));
        assert!(!Vec3::X.is_parallel_to(&Vec3::Y, 1e-10));
        assert!((Vec3::X.angle_to(&Vec3::Y) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_within_length() {
        let v = Vec3::new(3.0, 0.0, 4.0);
        assert!(v.within_length(5.0));
        assert!(!v.within_length(4.9));
        assert!(!v.within_length(-5.0));
        assert!(!v.within_length(f64::NAN));
        assert!(Vec3::ZERO.within_length(0.0));
    }

    #[test]
    fn test_within_length_huge_values() {
        // Both squares overflow to infinity here.
        assert!(!Vec3::new(1e300, 0.0, 0.0).within_length(1e155));
        assert!(Vec3::new(1e300, 1e300, 0.0).within_length(1.5e300));
        assert!(!Vec3::new(1e300, 1e300, 0.0).within_length(1.4e300));
        assert!(Vec3::new(1e100, 0.0, 0.0).within_length(1e200));
        assert!(!Vec3::new(f64::INFINITY, 0.0, 0.0).within_length(1e300));
    }
}
