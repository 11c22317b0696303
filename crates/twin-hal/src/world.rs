//! World-query and rigid-body traits.
//!
//! Implementations are expected to be synchronous and cheap: the core calls
//! them from inside a render or physics tick and never blocks on them.

use twin_types::{Pose, SimError, Vec3};

use crate::camera::CameraFrame;

/// Read-only view of the simulated world as seen from the robot body.
///
/// Every method reflects the state at the moment of the call; the core does
/// not hold on to returned values beyond the current sampling call.
pub trait WorldQuery: Send + Sync {
    /// Cast a ray from `origin` along the unit vector `direction`.
    ///
    /// Returns the distance to the first hit within `max_distance`, or
    /// `None` when nothing is hit.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32>;

    /// Position and orientation of the robot body.
    fn pose(&self) -> Pose;

    /// Linear velocity of the robot body in the world frame (m/s).
    fn linear_velocity(&self) -> Vec3;

    /// Angular velocity of the robot body in the world frame (rad/s).
    fn angular_velocity(&self) -> Vec3;

    /// `true` when a render surface called `surface` exists and can be
    /// captured.
    fn has_surface(&self, surface: &str) -> bool;

    /// Read the render surface `surface` into a CPU-side RGB24 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Capture`] when the surface does not exist or the
    /// read-back fails.
    fn capture_frame(&self, surface: &str) -> Result<CameraFrame, SimError>;
}

/// The simulated body the motion controller drives.
pub trait RigidBody {
    /// Forward axis of the body in the world frame.
    fn forward(&self) -> Vec3;

    /// Current linear velocity (m/s).
    fn velocity(&self) -> Vec3;

    fn set_velocity(&mut self, velocity: Vec3);

    fn set_angular_velocity(&mut self, velocity: Vec3);
}
