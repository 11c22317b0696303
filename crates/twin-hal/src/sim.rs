//! In-process kinematic world for headless runs and tests.
//!
//! [`SimWorld`] holds a single robot body, a set of axis-aligned box
//! obstacles, and named render surfaces that produce synthetic RGB frames.
//! It implements both [`WorldQuery`] and [`RigidBody`], so the full sensor
//! and motion stack can run without a physics engine or GPU.
//!
//! The body is kinematic: [`SimWorld::step`] integrates the pose from the
//! current velocities and nothing else (no gravity, no collisions).
//!
//! # Example
//!
//! ```rust
//! use twin_hal::sim::{Aabb, SimWorld};
//! use twin_hal::WorldQuery;
//! use twin_types::Vec3;
//!
//! let world = SimWorld::new()
//!     .with_obstacle(Aabb::new(Vec3::new(4.0, -1.0, 0.0), Vec3::new(5.0, 1.0, 2.0)));
//!
//! let hit = world.raycast(Vec3::new(0.0, 0.0, 0.5), Vec3::FORWARD, 10.0);
//! assert_eq!(hit, Some(4.0));
//! ```

use std::collections::HashMap;

use tracing::debug;
use twin_types::{Pose, Quaternion, SimError, Vec3};

use crate::camera::CameraFrame;
use crate::world::{RigidBody, WorldQuery};

// ────────────────────────────────────────────────────────────────────────────
// Obstacles
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned box obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from two opposite corners (in any order).
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Distance along the ray to the box surface (slab method), or `None`
    /// when the ray misses.  A ray starting inside the box hits at `0`.
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for (o, d, lo, hi) in [
            (origin.x, direction.x, self.min.x, self.max.x),
            (origin.y, direction.y, self.min.y, self.max.y),
            (origin.z, direction.z, self.min.z, self.max.z),
        ] {
            if d.abs() < 1e-12 {
                // Parallel to this slab: must already be between the planes.
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (t0, t1) = {
                let a = (lo - o) / d;
                let b = (hi - o) / d;
                if a <= b { (a, b) } else { (b, a) }
            };
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimWorld
// ────────────────────────────────────────────────────────────────────────────

/// Name of the render surface [`SimWorld::demo_room`] provides.
pub const DEMO_CAMERA_SURFACE: &str = "main_camera";

/// A headless kinematic world with one robot body.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    pose: Pose,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    obstacles: Vec<Aabb>,
    /// Render surfaces by name: (width, height).
    surfaces: HashMap<String, (u32, u32)>,
}

impl SimWorld {
    /// An empty world with the body at the origin facing `+X`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A 10 m × 10 m walled room centred on the origin with one pillar in
    /// front of the robot and a 64×48 `main_camera` surface.
    pub fn demo_room() -> Self {
        const HALF: f32 = 5.0;
        const WALL: f32 = 0.2;
        const HEIGHT: f32 = 2.5;
        Self::new()
            // north / south
            .with_obstacle(Aabb::new(
                Vec3::new(-HALF, HALF, 0.0),
                Vec3::new(HALF, HALF + WALL, HEIGHT),
            ))
            .with_obstacle(Aabb::new(
                Vec3::new(-HALF, -HALF - WALL, 0.0),
                Vec3::new(HALF, -HALF, HEIGHT),
            ))
            // east / west
            .with_obstacle(Aabb::new(
                Vec3::new(HALF, -HALF, 0.0),
                Vec3::new(HALF + WALL, HALF, HEIGHT),
            ))
            .with_obstacle(Aabb::new(
                Vec3::new(-HALF - WALL, -HALF, 0.0),
                Vec3::new(-HALF, HALF, HEIGHT),
            ))
            // pillar
            .with_obstacle(Aabb::new(
                Vec3::new(2.0, -0.25, 0.0),
                Vec3::new(2.5, 0.25, HEIGHT),
            ))
            .with_surface(DEMO_CAMERA_SURFACE, 64, 48)
    }

    /// Add a box obstacle.
    pub fn with_obstacle(mut self, obstacle: Aabb) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Add a render surface that [`WorldQuery::capture_frame`] can read.
    pub fn with_surface(mut self, name: impl Into<String>, width: u32, height: u32) -> Self {
        self.surfaces.insert(name.into(), (width, height));
        self
    }

    /// Place the body.
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Teleport the body.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Integrate the body pose over `dt` seconds using the current linear
    /// and angular velocities.  Non-positive `dt` is ignored.
    pub fn step(&mut self, dt: f32) {
        if dt.is_nan() || dt <= 0.0 {
            return;
        }
        self.pose.position = self.pose.position.add(self.linear_velocity.scale(dt));

        let omega = self.angular_velocity.length();
        if omega > 0.0 {
            let delta = Quaternion::from_axis_angle(self.angular_velocity, omega * dt);
            self.pose.orientation = delta.mul(self.pose.orientation).normalize();
        }
    }

    /// Synthetic frame: red ramps left→right, green top→bottom, blue encodes
    /// the body heading so consecutive frames differ while turning.
    fn render(&self, width: u32, height: u32) -> CameraFrame {
        let fwd = self.pose.forward();
        let heading = fwd.y.atan2(fwd.x);
        let blue = (((heading + std::f32::consts::PI) / std::f32::consts::TAU) * 255.0) as u8;

        let mut data = Vec::with_capacity(width as usize * height as usize * CameraFrame::CHANNELS);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width.saturating_sub(1).max(1)) as u8;
                let g = (y * 255 / height.saturating_sub(1).max(1)) as u8;
                data.extend_from_slice(&[r, g, blue]);
            }
        }
        CameraFrame {
            width,
            height,
            data,
        }
    }
}

impl WorldQuery for SimWorld {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        self.obstacles
            .iter()
            .filter_map(|b| b.intersect(origin, direction))
            .filter(|&t| t <= max_distance)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn has_surface(&self, surface: &str) -> bool {
        self.surfaces.contains_key(surface)
    }

    fn capture_frame(&self, surface: &str) -> Result<CameraFrame, SimError> {
        let &(width, height) = self.surfaces.get(surface).ok_or_else(|| SimError::Capture {
            surface: surface.to_string(),
            details: "no such render surface".to_string(),
        })?;
        debug!(surface, width, height, "capturing synthetic frame");
        Ok(self.render(width, height))
    }
}

impl RigidBody for SimWorld {
    fn forward(&self) -> Vec3 {
        self.pose.forward()
    }

    fn velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn ray_hits_nearest_obstacle() {
        let world = SimWorld::new()
            .with_obstacle(Aabb::new(Vec3::new(6.0, -1.0, 0.0), Vec3::new(7.0, 1.0, 1.0)))
            .with_obstacle(Aabb::new(Vec3::new(3.0, -1.0, 0.0), Vec3::new(4.0, 1.0, 1.0)));
        let hit = world.raycast(Vec3::new(0.0, 0.0, 0.5), Vec3::FORWARD, 10.0);
        assert_eq!(hit, Some(3.0));
    }

    #[test]
    fn ray_beyond_max_distance_misses() {
        let world = SimWorld::new()
            .with_obstacle(Aabb::new(Vec3::new(3.0, -1.0, 0.0), Vec3::new(4.0, 1.0, 1.0)));
        assert_eq!(world.raycast(Vec3::new(0.0, 0.0, 0.5), Vec3::FORWARD, 2.0), None);
        assert_eq!(
            world.raycast(Vec3::new(0.0, 0.0, 0.5), Vec3::new(-1.0, 0.0, 0.0), 10.0),
            None
        );
    }

    #[test]
    fn ray_starting_inside_box_hits_at_zero() {
        let b = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(b.intersect(Vec3::zero(), Vec3::FORWARD), Some(0.0));
    }

    #[test]
    fn demo_room_walls_enclose_the_robot() {
        let world = SimWorld::demo_room();
        let origin = Vec3::new(0.0, 0.0, 0.05);
        for dir in [Vec3::new(0.0, 1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)] {
            let d = world.raycast(origin, dir, 20.0).expect("wall must be hit");
            assert!((d - 5.0).abs() < 1e-4);
        }
        // The pillar sits 2 m ahead.
        let d = world.raycast(origin, Vec3::FORWARD, 20.0).unwrap();
        assert!((d - 2.0).abs() < 1e-4);
    }

    #[test]
    fn step_integrates_position_and_yaw() {
        let mut world = SimWorld::new();
        world.set_velocity(Vec3::new(1.0, 0.0, 0.0));
        world.set_angular_velocity(Vec3::new(0.0, 0.0, FRAC_PI_2));
        for _ in 0..10 {
            world.step(0.1);
        }
        let pose = WorldQuery::pose(&world);
        assert!((pose.position.x - 1.0).abs() < 1e-4);
        let fwd = pose.forward();
        assert!(fwd.x.abs() < 1e-4, "after a quarter turn forward is +Y: {fwd:?}");
        assert!((fwd.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn step_ignores_non_positive_dt() {
        let mut world = SimWorld::new();
        world.set_velocity(Vec3::new(1.0, 0.0, 0.0));
        world.step(0.0);
        world.step(-1.0);
        world.step(f32::NAN);
        assert_eq!(WorldQuery::pose(&world).position, Vec3::zero());
    }

    #[test]
    fn capture_unknown_surface_fails() {
        let world = SimWorld::new();
        assert!(!world.has_surface("main_camera"));
        assert!(matches!(
            world.capture_frame("main_camera"),
            Err(SimError::Capture { .. })
        ));
    }

    #[test]
    fn captured_frame_matches_surface_size() {
        let world = SimWorld::new().with_surface("cam", 8, 4);
        let frame = world.capture_frame("cam").unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert!(frame.validate("cam").is_ok());
        assert_eq!(frame.pixel(0, 0).map(|p| p[0]), Some(0));
        assert_eq!(frame.pixel(7, 0).map(|p| p[0]), Some(255));
    }
}
