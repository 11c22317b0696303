//! Simulation configuration: one TOML document, one table per component.
//!
//! ```toml
//! [simulation]
//! render_hz = 60.0
//! physics_hz = 50.0
//! duration_secs = 10.0
//! demo_command = { linear_x = 0.5, angular_z = 0.3 }
//!
//! [lidar]
//! rays = 360
//!
//! [camera]
//! surface = "main_camera"
//! encoding = "mono8"
//!
//! [imu]
//! remove_gravity = true
//!
//! [drive]
//! max_speed = 1.0
//! ```
//!
//! Every field is optional; an empty document is a valid configuration.
//! Component validation happens when the [`Simulation`][crate::Simulation]
//! is built, not here.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use twin_control::DriveConfig;
use twin_hal::DEMO_CAMERA_SURFACE;
use twin_sensors::{CameraConfig, ImuConfig, LidarConfig};
use twin_types::{SimError, Twist};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "twin.toml";

/// A velocity command the host issues once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemoCommand {
    /// m/s
    pub linear_x: f32,
    /// rad/s
    pub angular_z: f32,
}

impl From<DemoCommand> for Twist {
    fn from(cmd: DemoCommand) -> Self {
        Twist::planar(cmd.linear_x, cmd.angular_z)
    }
}

/// Host loop timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_render_hz")]
    pub render_hz: f64,
    #[serde(default = "default_physics_hz")]
    pub physics_hz: f64,
    /// `0` runs until interrupted.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_command: Option<DemoCommand>,
}

fn default_render_hz() -> f64 {
    60.0
}
fn default_physics_hz() -> f64 {
    50.0
}
fn default_duration_secs() -> f64 {
    10.0
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            render_hz: default_render_hz(),
            physics_hz: default_physics_hz(),
            duration_secs: default_duration_secs(),
            demo_command: None,
        }
    }
}

impl SimulationSettings {
    /// Render tick period in seconds.  Non-positive rates fall back to the
    /// default.
    pub fn render_period(&self) -> f64 {
        period_or(self.render_hz, default_render_hz())
    }

    /// Physics tick period in seconds.
    pub fn physics_period(&self) -> f64 {
        period_or(self.physics_hz, default_physics_hz())
    }

    /// `None` when the run is unbounded.
    pub fn duration(&self) -> Option<f64> {
        (self.duration_secs.is_finite() && self.duration_secs > 0.0).then_some(self.duration_secs)
    }
}

fn period_or(rate_hz: f64, fallback_hz: f64) -> f64 {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        1.0 / rate_hz
    } else {
        1.0 / fallback_hz
    }
}

/// The complete configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationSettings,
    pub lidar: LidarConfig,
    pub camera: CameraConfig,
    pub imu: ImuConfig,
    pub drive: DriveConfig,
}

impl Default for SimConfig {
    /// Component defaults, with the camera pointed at the demo room's
    /// surface.
    fn default() -> Self {
        Self {
            simulation: SimulationSettings::default(),
            lidar: LidarConfig::default(),
            camera: CameraConfig {
                surface: Some(DEMO_CAMERA_SURFACE.to_string()),
                ..CameraConfig::default()
            },
            imu: ImuConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, SimError> {
        toml::from_str(raw).map_err(|e| SimError::Serialization(format!("invalid config: {e}")))
    }

    pub fn to_toml(&self) -> Result<String, SimError> {
        toml::to_string_pretty(self)
            .map_err(|e| SimError::Serialization(format!("failed to serialize config: {e}")))
    }
}

/// Load the config from `path` and apply environment overrides.
/// Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<SimConfig>, SimError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SimError::config("config", format!("failed to read {}: {e}", path.display()))
    })?;
    let mut cfg = SimConfig::from_toml(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `TWIN_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TWIN_RENDER_HZ` | `simulation.render_hz` |
/// | `TWIN_PHYSICS_HZ` | `simulation.physics_hz` |
/// | `TWIN_DURATION_SECS` | `simulation.duration_secs` |
///
/// Values that do not parse as numbers are ignored.
pub fn apply_env_overrides(cfg: &mut SimConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(cfg: &mut SimConfig, lookup: impl Fn(&str) -> Option<String>) {
    let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
    if let Some(hz) = number("TWIN_RENDER_HZ") {
        cfg.simulation.render_hz = hz;
    }
    if let Some(hz) = number("TWIN_PHYSICS_HZ") {
        cfg.simulation.physics_hz = hz;
    }
    if let Some(secs) = number("TWIN_DURATION_SECS") {
        cfg.simulation.duration_secs = secs;
    }
}
