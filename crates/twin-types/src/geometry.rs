//! Geometry primitives shared by the world interface, the sensors and the
//! motion controller.
//!
//! The world is **z-up**: `+Z` is the vertical axis, the ground plane is
//! `z = 0`, and a body with the identity orientation faces `+X`.
//!
//! # Example
//!
//! ```rust
//! use twin_types::geometry::{Quaternion, Vec3};
//!
//! // Quarter turn to the left about the vertical axis.
//! let q = Quaternion::from_axis_angle(Vec3::UP, std::f32::consts::FRAC_PI_2);
//! let v = q.rotate(Vec3::FORWARD);
//! assert!((v.y - 1.0).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector (positions, directions, velocities, accelerations).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// The vertical axis.
    pub const UP: Self = Self::new(0.0, 0.0, 1.0);
    /// Forward axis of a body with the identity orientation.
    pub const FORWARD: Self = Self::new(1.0, 0.0, 0.0);

    /// Create a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or `None` when the length is too
    /// small to normalise reliably.
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > 1e-6 {
            Some(self.scale(1.0 / len))
        } else {
            None
        }
    }

    /// Drop the vertical component.
    pub fn flatten(self) -> Self {
        Self::new(self.x, self.y, 0.0)
    }

    /// `true` when every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about `axis` (right-hand rule).
    ///
    /// `axis` is normalised internally; a degenerate axis yields the
    /// identity.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        let Some(axis) = axis.try_normalize() else {
            return Self::identity();
        };
        let (s, c) = (angle_rad * 0.5).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Rotation of `yaw_rad` about the vertical axis.
    pub fn from_yaw(yaw_rad: f32) -> Self {
        Self::from_axis_angle(Vec3::UP, yaw_rad)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Re-normalise to counter floating-point drift after repeated
    /// composition.  A zero quaternion becomes the identity.
    pub fn normalize(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if n.is_finite() && n > 1e-9 {
            Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
        } else {
            Self::identity()
        }
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // Express v as a pure quaternion.
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Position and orientation of a body in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The body's forward axis expressed in the world frame.
    pub fn forward(&self) -> Vec3 {
        self.orientation.rotate(Vec3::FORWARD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.sub(b).length() < 1e-5
    }

    #[test]
    fn yaw_rotates_forward_counter_clockwise() {
        let q = Quaternion::from_yaw(FRAC_PI_2);
        assert!(approx(q.rotate(Vec3::FORWARD), Vec3::new(0.0, 1.0, 0.0)));

        let q = Quaternion::from_yaw(PI);
        assert!(approx(q.rotate(Vec3::FORWARD), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn rotation_about_up_preserves_vertical_component() {
        let q = Quaternion::from_yaw(0.7);
        let v = q.rotate(Vec3::new(1.0, 2.0, 3.0));
        assert!((v.z - 3.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_axis_yields_identity() {
        let q = Quaternion::from_axis_angle(Vec3::zero(), 1.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn try_normalize_rejects_zero_vector() {
        assert!(Vec3::zero().try_normalize().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).try_normalize().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_recovers_unit_length() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0).normalize();
        assert_eq!(q, Quaternion::identity());
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalize(), Quaternion::identity());
    }

    #[test]
    fn pose_forward_follows_orientation() {
        let pose = Pose::new(Vec3::zero(), Quaternion::from_yaw(-FRAC_PI_2));
        assert!(approx(pose.forward(), Vec3::new(0.0, -1.0, 0.0)));
    }
}
