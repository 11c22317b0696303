//! IMU: orientation and angular velocity pass through from the world;
//! linear acceleration is the finite difference of linear velocity between
//! consecutive samples.
//!
//! Gravity compensation, when enabled, subtracts the configured gravity
//! vector from that coordinate-frame acceleration.  The result is not
//! rotated into the body frame.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use twin_hal::WorldQuery;
use twin_types::{Header, Imu, Message, MessageSchema, SimError, UNKNOWN_COVARIANCE, Vec3};

use crate::scheduler::PublishScheduler;
use crate::sensor::{Sensor, validate_common};

const COMPONENT: &str = "imu";

/// Lower bound on the differencing interval (seconds).
pub const MIN_DT: f64 = 1e-4;

/// Rate floor for the IMU.
pub const IMU_MIN_RATE_HZ: f64 = 1.0;

/// IMU parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuConfig {
    pub topic: String,
    pub frame_id: String,
    pub publish_hz: f64,
    /// Subtract `gravity` from the estimated acceleration.
    pub remove_gravity: bool,
    /// World gravity vector, m/s².
    pub gravity: Vec3,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            topic: "/imu/data".to_string(),
            frame_id: "imu".to_string(),
            publish_hz: 50.0,
            remove_gravity: false,
            gravity: Vec3::new(0.0, 0.0, -9.81),
        }
    }
}

impl ImuConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        validate_common(COMPONENT, &self.topic, &self.frame_id)?;
        if !self.gravity.is_finite() {
            return Err(SimError::config(COMPONENT, "gravity must be finite"));
        }
        Ok(())
    }
}

/// Finite-difference acceleration estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuEstimator {
    prev_velocity: Vec3,
    prev_time: f64,
    gravity: Option<Vec3>,
}

impl ImuEstimator {
    /// Seed the estimator with the body velocity at `start_time`.
    /// `gravity` is subtracted from every estimate when given.
    pub fn new(initial_velocity: Vec3, start_time: f64, gravity: Option<Vec3>) -> Self {
        Self {
            prev_velocity: initial_velocity,
            prev_time: start_time,
            gravity,
        }
    }

    /// Estimate the acceleration at `now` from `velocity`, then remember
    /// both for the next call.
    pub fn estimate(&mut self, velocity: Vec3, now: f64) -> Vec3 {
        let elapsed = now - self.prev_time;
        let dt = if elapsed.is_finite() { elapsed.max(MIN_DT) } else { MIN_DT };

        let raw = velocity.sub(self.prev_velocity).scale((1.0 / dt) as f32);
        self.prev_velocity = velocity;
        if now.is_finite() {
            self.prev_time = now;
        }

        match self.gravity {
            Some(g) => raw.sub(g),
            None => raw,
        }
    }

    pub fn prev_velocity(&self) -> Vec3 {
        self.prev_velocity
    }
}

/// Scheduler-gated IMU publishing [`Imu`] messages.
#[derive(Debug)]
pub struct ImuSensor {
    config: ImuConfig,
    estimator: ImuEstimator,
    scheduler: PublishScheduler,
}

impl ImuSensor {
    /// Validate `config` and seed the estimator from the world's current
    /// velocity.
    pub fn new(
        config: ImuConfig,
        world: &dyn WorldQuery,
        start_time: f64,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let gravity = config.remove_gravity.then_some(config.gravity);
        let estimator = ImuEstimator::new(world.linear_velocity(), start_time, gravity);
        let scheduler = PublishScheduler::new(config.publish_hz, IMU_MIN_RATE_HZ, start_time);
        info!(
            topic = %config.topic,
            rate_hz = scheduler.effective_rate(),
            remove_gravity = config.remove_gravity,
            "imu ready"
        );
        Ok(Self {
            config,
            estimator,
            scheduler,
        })
    }

    pub fn config(&self) -> &ImuConfig {
        &self.config
    }
}

impl Sensor for ImuSensor {
    fn name(&self) -> &str {
        COMPONENT
    }

    fn topic(&self) -> &str {
        &self.config.topic
    }

    fn schema(&self) -> MessageSchema {
        MessageSchema::Imu
    }

    fn tick(&mut self, now: f64, world: &dyn WorldQuery) -> Result<Option<Message>, SimError> {
        if !self.scheduler.should_publish(now) {
            return Ok(None);
        }
        let accel = self.estimator.estimate(world.linear_velocity(), now);
        debug!(topic = %self.config.topic, ax = accel.x, ay = accel.y, az = accel.z, "imu");
        Ok(Some(
            Imu {
                header: Header::new(self.config.frame_id.clone(), now),
                orientation: world.pose().orientation,
                orientation_covariance: UNKNOWN_COVARIANCE,
                angular_velocity: world.angular_velocity(),
                angular_velocity_covariance: UNKNOWN_COVARIANCE,
                linear_acceleration: accel,
                linear_acceleration_covariance: UNKNOWN_COVARIANCE,
            }
            .into(),
        ))
    }
}
