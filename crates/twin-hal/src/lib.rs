//! `twin-hal` – the world boundary.
//!
//! The sensor and motion core never reads a physics engine or renderer
//! directly.  It talks to the two traits defined here, so any substrate (a
//! game engine, a headless kinematic model, a recorded log) can drive it.
//!
//! # Modules
//!
//! - [`world`] – [`WorldQuery`]: read-only ray-casts, pose, velocities and
//!   pixel capture; [`RigidBody`]: the velocity setters the motion
//!   controller drives.
//! - [`camera`] – [`CameraFrame`]: a captured 3-channel pixel buffer.
//! - [`sim`] – [`SimWorld`]: an in-process kinematic world with box
//!   obstacles and synthetic render surfaces, used by tests and the `twin`
//!   binary.

pub mod camera;
pub mod sim;
pub mod world;

pub use camera::CameraFrame;
pub use sim::{Aabb, DEMO_CAMERA_SURFACE, SimWorld};
pub use world::{RigidBody, WorldQuery};
