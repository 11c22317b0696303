//! [`MotionController`]: ramps the body's planar velocity toward the latest
//! drive target.
//!
//! Each physics tick moves the current forward speed and yaw rate toward
//! their targets by at most `accel * dt` and `yaw_accel * dt`, then writes
//! them to the body.  There is no feedback term: the controller never reads
//! the body's actual speed back.
//!
//! # Example
//!
//! ```rust
//! use twin_control::{DriveConfig, MotionController};
//! use twin_hal::{RigidBody, SimWorld};
//! use twin_types::Twist;
//!
//! let mut controller = MotionController::new(DriveConfig::default()).unwrap();
//! let mut body = SimWorld::new();
//!
//! controller.slot().submit(&Twist::planar(1.0, 0.0));
//! controller.physics_tick(0.1, &mut body);
//! assert!((body.velocity().x - 0.5).abs() < 1e-6); // 5 m/s² for 0.1 s
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;
use twin_hal::RigidBody;
use twin_types::{SimError, Vec3};

use crate::command::CommandSlot;

const COMPONENT: &str = "drive";

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Drive limits and the command topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub topic: String,
    /// m/s
    pub max_speed: f32,
    /// rad/s
    pub max_yaw_rate: f32,
    /// m/s²
    pub accel: f32,
    /// rad/s²
    pub yaw_accel: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            topic: "/cmd_vel".to_string(),
            max_speed: 2.0,
            max_yaw_rate: 2.0,
            accel: 5.0,
            yaw_accel: 5.0,
        }
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.topic.trim().is_empty() {
            return Err(SimError::config(COMPONENT, "topic must not be empty"));
        }
        for (field, value) in [
            ("max_speed", self.max_speed),
            ("max_yaw_rate", self.max_yaw_rate),
            ("accel", self.accel),
            ("yaw_accel", self.yaw_accel),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::config(
                    COMPONENT,
                    format!("{field} must be finite and non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

/// Move `current` toward `target` by at most `max_delta`, without
/// overshooting.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(diff)
    }
}

/// Acceleration-limited planar velocity controller.
#[derive(Debug)]
pub struct MotionController {
    config: DriveConfig,
    slot: CommandSlot,
    linear: f32,
    yaw_rate: f32,
}

impl MotionController {
    /// Validate `config` and create a controller at rest.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] for negative or non-finite limits.
    pub fn new(config: DriveConfig) -> Result<Self, SimError> {
        config.validate()?;
        info!(
            topic = %config.topic,
            max_speed = config.max_speed,
            max_yaw_rate = config.max_yaw_rate,
            "motion controller ready"
        );
        let slot = CommandSlot::new(config.max_speed, config.max_yaw_rate);
        Ok(Self {
            config,
            slot,
            linear: 0.0,
            yaw_rate: 0.0,
        })
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Handle for writing new targets; share it with the command handler.
    pub fn slot(&self) -> CommandSlot {
        self.slot.clone()
    }

    /// Current forward speed (m/s).
    pub fn linear_speed(&self) -> f32 {
        self.linear
    }

    /// Current yaw rate (rad/s).
    pub fn yaw_rate(&self) -> f32 {
        self.yaw_rate
    }

    /// Advance the ramps by `dt` seconds and apply them to `body`.
    ///
    /// The speed is applied along the body's forward axis and only the
    /// horizontal part of the result is written, so a pitched body moves at
    /// `speed * cos(pitch)` and a vertical one not at all.  The vertical
    /// component of the velocity is preserved.  Angular velocity is set to a
    /// pure yaw.  Non-positive or non-finite `dt` does nothing.
    pub fn physics_tick(&mut self, dt: f32, body: &mut dyn RigidBody) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let target = self.slot.target();
        self.linear = move_towards(self.linear, target.linear, self.config.accel * dt);
        self.yaw_rate = move_towards(self.yaw_rate, target.yaw_rate, self.config.yaw_accel * dt);

        let v = body.forward().scale(self.linear);
        let vz = body.velocity().z;
        body.set_velocity(Vec3::new(v.x, v.y, vz));
        body.set_angular_velocity(Vec3::UP.scale(self.yaw_rate));
    }
}
