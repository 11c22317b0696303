//! `twin-runtime` – Hosts the sensor and motion core.
//!
//! The engine (or the `twin` binary standing in for one) owns the clock and
//! calls two ticks: a render tick, on which sensors sample and publish, and
//! a fixed physics tick, on which the motion controller drives the body.
//!
//! # Modules
//!
//! - [`simulation`] – [`Simulation`]: builds the lidar, camera, IMU and
//!   motion controller from a [`SimConfig`], registers their topics on the
//!   transport and runs them from [`Simulation::render_tick`] /
//!   [`Simulation::physics_tick`].
//! - [`config`] – [`SimConfig`]: the TOML configuration document with
//!   per-component tables and `TWIN_*` environment overrides.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod config;
pub mod simulation;
pub mod telemetry;

pub use config::{DemoCommand, SimConfig, SimulationSettings};
pub use simulation::Simulation;
pub use telemetry::{TracerProviderGuard, init_tracing};
