//! Planar lidar: a fan of ray-casts turned into a [`LaserScan`].
//!
//! The scan plane is horizontal regardless of how the body pitches or rolls:
//! the body's forward axis is projected onto the ground plane before the
//! fan is laid out, and every ray is rotated about the vertical axis only.
//!
//! | Ray result | Reported range |
//! |---|---|
//! | hit at `d` with `range_min <= d <= range_max` | `d` |
//! | hit at `d < range_min` | [`NO_RETURN`] |
//! | no hit within `range_max` | [`NO_RETURN`] |

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use twin_hal::WorldQuery;
use twin_types::{
    Header, LaserScan, Message, MessageSchema, NO_RETURN, Pose, Quaternion, SimError, Vec3,
};

use crate::scheduler::PublishScheduler;
use crate::sensor::{Sensor, validate_common};

/// Height above the body base the rays start from, so they clear the
/// ground and the body's own collider.
pub const RAY_ORIGIN_HEIGHT: f32 = 0.05;

const COMPONENT: &str = "lidar";

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Lidar parameters.  Immutable once the sensor is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_frame_id")]
    pub frame_id: String,
    #[serde(default = "default_publish_hz")]
    pub publish_hz: f64,
    /// Horizontal field of view in degrees, centred on the forward axis.
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f32,
    #[serde(default = "default_rays")]
    pub rays: u32,
    /// Metres.
    #[serde(default = "default_range_min")]
    pub range_min: f32,
    /// Metres.
    #[serde(default = "default_range_max")]
    pub range_max: f32,
}

fn default_topic() -> String {
    "/scan".to_string()
}
fn default_frame_id() -> String {
    "laser".to_string()
}
fn default_publish_hz() -> f64 {
    10.0
}
fn default_fov_deg() -> f32 {
    270.0
}
fn default_rays() -> u32 {
    720
}
fn default_range_min() -> f32 {
    0.01
}
fn default_range_max() -> f32 {
    10.0
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            frame_id: default_frame_id(),
            publish_hz: default_publish_hz(),
            fov_deg: default_fov_deg(),
            rays: default_rays(),
            range_min: default_range_min(),
            range_max: default_range_max(),
        }
    }
}

impl LidarConfig {
    /// Reject configurations that cannot produce a well-formed scan.
    pub fn validate(&self) -> Result<(), SimError> {
        validate_common(COMPONENT, &self.topic, &self.frame_id)?;
        if self.rays < 1 {
            return Err(SimError::config(COMPONENT, "rays must be at least 1"));
        }
        if !(self.fov_deg.is_finite() && self.fov_deg > 0.0 && self.fov_deg <= 360.0) {
            return Err(SimError::config(
                COMPONENT,
                format!("fov_deg {} must lie in (0, 360]", self.fov_deg),
            ));
        }
        if !(self.range_max.is_finite() && self.range_max > 0.0) {
            return Err(SimError::config(
                COMPONENT,
                format!("range_max {} must be positive and finite", self.range_max),
            ));
        }
        if !(self.range_min.is_finite() && self.range_min >= 0.0) {
            return Err(SimError::config(
                COMPONENT,
                format!("range_min {} must be non-negative and finite", self.range_min),
            ));
        }
        if self.range_min >= self.range_max {
            return Err(SimError::config(
                COMPONENT,
                format!(
                    "range_min {} must be below range_max {}",
                    self.range_min, self.range_max
                ),
            ));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Synthesizer
// ────────────────────────────────────────────────────────────────────────────

/// Angular layout of a scan, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanAngles {
    pub min: f32,
    pub max: f32,
    pub increment: f32,
}

impl ScanAngles {
    /// Lay out `rays` bearings symmetrically across `fov_deg`.
    ///
    /// With a single ray the increment is zero and that ray points at
    /// `min`.
    pub fn new(fov_deg: f32, rays: u32) -> Self {
        let max = 0.5 * fov_deg.to_radians();
        let min = -max;
        let increment = if rays > 1 {
            (max - min) / (rays - 1) as f32
        } else {
            0.0
        };
        Self {
            min,
            max,
            increment,
        }
    }

    /// Bearing of ray `i`.
    pub fn bearing(&self, i: u32) -> f32 {
        self.min + i as f32 * self.increment
    }
}

/// Turns ray-cast results into range arrays.
#[derive(Debug, Clone)]
pub struct LidarScanSynthesizer {
    rays: u32,
    range_min: f32,
    range_max: f32,
    angles: ScanAngles,
}

impl LidarScanSynthesizer {
    /// Build from a configuration, validating it first.
    pub fn new(config: &LidarConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            rays: config.rays,
            range_min: config.range_min,
            range_max: config.range_max,
            angles: ScanAngles::new(config.fov_deg, config.rays),
        })
    }

    pub fn angles(&self) -> ScanAngles {
        self.angles
    }

    /// Project `forward` onto the ground plane.  A vertical (or zero)
    /// forward axis falls back to `+X`.
    pub fn scan_plane_forward(forward: Vec3) -> Vec3 {
        forward.flatten().try_normalize().unwrap_or(Vec3::FORWARD)
    }

    /// Map a ray-cast result to a reported range.
    pub fn classify(&self, hit: Option<f32>) -> f32 {
        match hit {
            Some(d) if d >= self.range_min && d <= self.range_max => d,
            _ => NO_RETURN,
        }
    }

    /// Cast the full fan from `pose` and return one range per ray, ordered
    /// from `angles().min` to `angles().max`.
    pub fn synthesize(&self, pose: Pose, world: &dyn WorldQuery) -> Vec<f32> {
        let forward = Self::scan_plane_forward(pose.forward());
        let origin = pose.position.add(Vec3::UP.scale(RAY_ORIGIN_HEIGHT));

        (0..self.rays)
            .map(|i| {
                let dir = Quaternion::from_yaw(self.angles.bearing(i)).rotate(forward);
                self.classify(world.raycast(origin, dir, self.range_max))
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensor
// ────────────────────────────────────────────────────────────────────────────

/// Scheduler-gated lidar publishing [`LaserScan`] messages.
#[derive(Debug)]
pub struct LidarSensor {
    config: LidarConfig,
    synthesizer: LidarScanSynthesizer,
    scheduler: PublishScheduler,
}

impl LidarSensor {
    /// Validate `config` and build the sensor.  The first scan is due at
    /// `start_time`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] for a malformed configuration.
    pub fn new(config: LidarConfig, start_time: f64) -> Result<Self, SimError> {
        let synthesizer = LidarScanSynthesizer::new(&config)?;
        let scheduler = PublishScheduler::new(
            config.publish_hz,
            PublishScheduler::DEFAULT_MIN_RATE_HZ,
            start_time,
        );
        info!(
            topic = %config.topic,
            rays = config.rays,
            fov_deg = config.fov_deg,
            rate_hz = scheduler.effective_rate(),
            "lidar ready"
        );
        Ok(Self {
            config,
            synthesizer,
            scheduler,
        })
    }

    pub fn config(&self) -> &LidarConfig {
        &self.config
    }

    /// Produce a scan from the current world state, ignoring the schedule.
    pub fn scan(&self, now: f64, world: &dyn WorldQuery) -> LaserScan {
        let angles = self.synthesizer.angles();
        LaserScan {
            header: Header::new(self.config.frame_id.clone(), now),
            angle_min: angles.min,
            angle_max: angles.max,
            angle_increment: angles.increment,
            time_increment: 0.0,
            scan_time: self.scheduler.period() as f32,
            range_min: self.config.range_min,
            range_max: self.config.range_max,
            ranges: self.synthesizer.synthesize(world.pose(), world),
            intensities: Vec::new(),
        }
    }
}

impl Sensor for LidarSensor {
    fn name(&self) -> &str {
        COMPONENT
    }

    fn topic(&self) -> &str {
        &self.config.topic
    }

    fn schema(&self) -> MessageSchema {
        MessageSchema::LaserScan
    }

    fn tick(&mut self, now: f64, world: &dyn WorldQuery) -> Result<Option<Message>, SimError> {
        if !self.scheduler.should_publish(now) {
            return Ok(None);
        }
        let scan = self.scan(now, world);
        debug!(
            topic = %self.config.topic,
            returns = scan.ranges.iter().filter(|r| r.is_finite()).count(),
            "scan"
        );
        Ok(Some(scan.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use std::sync::Mutex;
    use twin_hal::{CameraFrame, SimWorld};

    /// World that answers every ray with the same result and records the
    /// rays it was asked to cast.
    struct FixedHitWorld {
        hit: Option<f32>,
        pose: Pose,
        rays: Mutex<Vec<(Vec3, Vec3, f32)>>,
    }

    impl FixedHitWorld {
        fn new(hit: Option<f32>) -> Self {
            Self {
                hit,
                pose: Pose::default(),
                rays: Mutex::new(Vec::new()),
            }
        }
    }

    impl WorldQuery for FixedHitWorld {
        fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
            self.rays.lock().unwrap().push((origin, direction, max_distance));
            self.hit.filter(|d| *d <= max_distance)
        }
        fn pose(&self) -> Pose {
            self.pose
        }
        fn linear_velocity(&self) -> Vec3 {
            Vec3::zero()
        }
        fn angular_velocity(&self) -> Vec3 {
            Vec3::zero()
        }
        fn has_surface(&self, _surface: &str) -> bool {
            false
        }
        fn capture_frame(&self, surface: &str) -> Result<CameraFrame, SimError> {
            Err(SimError::Capture {
                surface: surface.to_string(),
                details: "none".to_string(),
            })
        }
    }

    fn config(fov_deg: f32, rays: u32) -> LidarConfig {
        LidarConfig {
            fov_deg,
            rays,
            range_min: 0.1,
            range_max: 10.0,
            ..LidarConfig::default()
        }
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.sub(b).length() < 1e-5
    }

    #[test]
    fn range_array_has_one_entry_per_ray() {
        let world = FixedHitWorld::new(Some(3.0));
        for rays in [1, 2, 7, 720] {
            let synth = LidarScanSynthesizer::new(&config(270.0, rays)).unwrap();
            let ranges = synth.synthesize(Pose::default(), &world);
            assert_eq!(ranges.len(), rays as usize);
            assert!(ranges.iter().all(|r| *r == NO_RETURN || (0.1..=10.0).contains(r)));
        }
    }

    #[test]
    fn angles_span_field_of_view() {
        for (fov, rays) in [(270.0, 720), (360.0, 4), (90.0, 2), (1.0, 33)] {
            let a = ScanAngles::new(fov, rays);
            assert!((a.min + (rays - 1) as f32 * a.increment - a.max).abs() < 1e-4);
            assert!((a.max - a.min - f32::to_radians(fov)).abs() < 1e-5);
        }
        let single = ScanAngles::new(90.0, 1);
        assert_eq!(single.increment, 0.0);
    }

    #[test]
    fn under_range_hit_is_no_return() {
        let synth = LidarScanSynthesizer::new(&config(90.0, 3)).unwrap();
        assert_eq!(synth.classify(Some(0.05)), NO_RETURN);
        assert_eq!(synth.classify(Some(0.1)), 0.1);
        assert_eq!(synth.classify(Some(4.2)), 4.2);
        assert_eq!(synth.classify(Some(10.0)), 10.0);
        assert_eq!(synth.classify(None), NO_RETURN);

        let world = FixedHitWorld::new(Some(0.05));
        let ranges = synth.synthesize(Pose::default(), &world);
        assert!(ranges.iter().all(|r| r.is_infinite()));
    }

    #[test]
    fn miss_is_no_return() {
        let synth = LidarScanSynthesizer::new(&config(90.0, 5)).unwrap();
        let ranges = synth.synthesize(Pose::default(), &FixedHitWorld::new(None));
        assert_eq!(ranges, vec![NO_RETURN; 5]);
    }

    #[test]
    fn rays_fan_out_from_raised_origin_in_order() {
        let synth = LidarScanSynthesizer::new(&config(180.0, 3)).unwrap();
        let world = FixedHitWorld::new(Some(1.0));
        let pose = Pose::new(Vec3::new(1.0, 2.0, 0.0), Quaternion::identity());
        synth.synthesize(pose, &world);

        let rays = world.rays.lock().unwrap();
        assert_eq!(rays.len(), 3);
        for (origin, _, max) in rays.iter() {
            assert!(approx(*origin, Vec3::new(1.0, 2.0, RAY_ORIGIN_HEIGHT)));
            assert_eq!(*max, 10.0);
        }
        // angle_min = -90° points to the right (-Y), then forward, then left.
        assert!(approx(rays[0].1, Vec3::new(0.0, -1.0, 0.0)));
        assert!(approx(rays[1].1, Vec3::FORWARD));
        assert!(approx(rays[2].1, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn pitched_body_still_scans_horizontally() {
        let pitched = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), -0.3);
        let fwd = LidarScanSynthesizer::scan_plane_forward(pitched.rotate(Vec3::FORWARD));
        assert!(fwd.z.abs() < 1e-6);
        assert!((fwd.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn vertical_forward_falls_back_to_default_direction() {
        // Pitch straight up: forward is +Z and has no horizontal component.
        let up = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), -FRAC_PI_2);
        assert!(approx(up.rotate(Vec3::FORWARD), Vec3::UP));

        let synth = LidarScanSynthesizer::new(&config(90.0, 3)).unwrap();
        let world = FixedHitWorld::new(None);
        synth.synthesize(Pose::new(Vec3::zero(), up), &world);
        let rays = world.rays.lock().unwrap();
        assert!(approx(rays[1].1, Vec3::FORWARD));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            LidarConfig {
                rays: 0,
                ..LidarConfig::default()
            },
            LidarConfig {
                fov_deg: 0.0,
                ..LidarConfig::default()
            },
            LidarConfig {
                fov_deg: 400.0,
                ..LidarConfig::default()
            },
            LidarConfig {
                range_max: f32::INFINITY,
                ..LidarConfig::default()
            },
            LidarConfig {
                range_min: -1.0,
                ..LidarConfig::default()
            },
            LidarConfig {
                range_min: 10.0,
                range_max: 5.0,
                ..LidarConfig::default()
            },
            LidarConfig {
                topic: " ".to_string(),
                ..LidarConfig::default()
            },
        ];
        for cfg in bad {
            let err = LidarSensor::new(cfg.clone(), 0.0).unwrap_err();
            assert!(matches!(err, SimError::Config { .. }), "{cfg:?} accepted");
        }
    }

    #[test]
    fn sensor_publishes_on_schedule() {
        let mut sensor = LidarSensor::new(
            LidarConfig {
                publish_hz: 10.0,
                rays: 5,
                fov_deg: 90.0,
                ..LidarConfig::default()
            },
            0.0,
        )
        .unwrap();
        let world = SimWorld::demo_room();

        let first = sensor.tick(0.0, &world).unwrap();
        assert!(first.is_some());
        assert!(sensor.tick(0.05, &world).unwrap().is_none());

        let Some(Message::LaserScan(scan)) = sensor.tick(0.1, &world).unwrap() else {
            panic!("expected a scan");
        };
        assert_eq!(scan.header.frame_id, "laser");
        assert_eq!(scan.header.stamp.nanosec, 100_000_000);
        assert!((scan.scan_time - 0.1).abs() < 1e-6);
        assert_eq!(scan.time_increment, 0.0);
        assert!(scan.intensities.is_empty());
        // Middle ray looks straight at the pillar 2 m ahead.
        assert!((scan.ranges[2] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: LidarConfig = toml::from_str("rays = 90\nfov_deg = 180.0").unwrap();
        assert_eq!(cfg.rays, 90);
        assert_eq!(cfg.topic, "/scan");
        assert_eq!(cfg.range_max, 10.0);
    }
}
