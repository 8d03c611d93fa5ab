//! Common types for container and item geometry.
//!
//! Coordinates follow the scene convention of the viewer: `x` is width,
//! `y` is the vertical axis and `z` is depth. Footprints live in the
//! horizontal `x`/`z` plane.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in scene space.
///
/// # Examples
/// ```
/// use pack_planner::types::Vec3;
///
/// let base = Vec3::new(1.0, 0.0, 3.0);
/// let lifted = base + Vec3::new(0.0, 2.5, 0.0);
/// assert_eq!(lifted.y, 2.5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (width)
    /// * `y` - Y component (height)
    /// * `z` - Z component (depth)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit scale, the default for scene objects without an explicit scale.
    #[inline]
    pub const fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector, or `None` for a zero-length or non-finite vector.
    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Some(*self * (1.0 / len))
        } else {
            None
        }
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// A point in a 2D footprint plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Trait for objects with a position in 3D space.
pub trait Positioned {
    /// Returns the position of the object in scene space.
    fn position(&self) -> Vec3;
}

impl<T: Positioned + ?Sized> Positioned for &T {
    fn position(&self) -> Vec3 {
        (**self).position()
    }
}

/// Trait for objects that may carry a pack-sequence hint.
pub trait PackSequenced {
    /// Position in the pack sequence; `None` sorts after every assigned index.
    fn pack_index(&self) -> Option<f64>;
}

impl<T: PackSequenced + ?Sized> PackSequenced for &T {
    fn pack_index(&self) -> Option<f64> {
        (**self).pack_index()
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing all points, `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| Self {
            min: Vec3::new(acc.min.x.min(p.x), acc.min.y.min(p.y), acc.min.z.min(p.z)),
            max: Vec3::new(acc.max.x.max(p.x), acc.max.y.max(p.y), acc.max.z.max(p.z)),
        }))
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Returns the dimensions (width, height, depth).
    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_vec3_cross_follows_right_hand_rule() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vec3::new(0.0, 0.0, 1.0));
        assert!((x.dot(&y)).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_vec3_normalized_rejects_zero() {
        assert!(Vec3::zero().normalized().is_none());
        let n = Vec3::new(0.0, 3.0, 4.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < EPSILON_GENERAL);
        let tiny = Vec3::new(0.0, 0.0, 1e-9).normalized().unwrap();
        assert!((tiny.z - 1.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_bounding_box_from_points() {
        let points = [
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, 5.0, -2.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(bbox.max, Vec3::new(3.0, 5.0, 2.0));
        assert_eq!(bbox.center(), Vec3::new(1.0, 2.5, 0.0));
        assert_eq!(bbox.dimensions(), Vec3::new(4.0, 5.0, 4.0));
    }

    #[test]
    fn test_bounding_box_empty_input() {
        let points: Vec<Vec3> = Vec::new();
        assert!(BoundingBox::from_points(&points).is_none());
    }
}
