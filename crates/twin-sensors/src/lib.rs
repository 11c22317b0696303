//! `twin-sensors` – Simulated sensors for the digital twin.
//!
//! Every sensor reads the world through [`twin_hal::WorldQuery`] and turns
//! a sample into a transport message.  Sensors never publish themselves:
//! the host calls [`Sensor::tick`] on each render tick and publishes
//! whatever comes back.
//!
//! | Sensor | Message | Default topic | Default rate |
//! |---|---|---|---|
//! | [`LidarSensor`] | `LaserScan` | `/scan` | 10 Hz |
//! | [`CameraSensor`] | `Image` | `/camera/image_raw` | 10 Hz |
//! | [`ImuSensor`] | `Imu` | `/imu/data` | 50 Hz |
//!
//! Rates are enforced by a per-sensor [`PublishScheduler`].

pub mod camera;
pub mod imu;
pub mod lidar;
pub mod scheduler;
pub mod sensor;

pub use camera::{CameraConfig, CameraSensor};
pub use imu::{ImuConfig, ImuEstimator, ImuSensor};
pub use lidar::{LidarConfig, LidarScanSynthesizer, LidarSensor};
pub use scheduler::PublishScheduler;
pub use sensor::Sensor;
