//! `twin-control` – velocity commands in, body motion out.
//!
//! # Modules
//!
//! - [`command`] – [`CommandSlot`]: guarded last-write-wins drive target
//!   shared between the transport handler and the physics tick.
//! - [`controller`] – [`MotionController`]: acceleration-limited ramps for
//!   forward speed and yaw rate, applied to a [`twin_hal::RigidBody`].
//! - [`subscriber`] – hooks a [`CommandSlot`] up to the `/cmd_vel` topic.

pub mod command;
pub mod controller;
pub mod subscriber;

pub use command::{CommandSlot, DriveTarget};
pub use controller::{DriveConfig, MotionController, move_towards};
pub use subscriber::subscribe_commands;
