//! [`Simulation`]: the host harness that drives sensors and the motion
//! controller from two externally clocked ticks.
//!
//! | Tick | Caller cadence | Work |
//! |---|---|---|
//! | [`Simulation::render_tick`] | every rendered frame | each due sensor samples the world; results are published |
//! | [`Simulation::physics_tick`] | fixed physics step | controller ramps toward the latest command; the world integrates |
//!
//! Components whose configuration is invalid are reported once with
//! `error!` and left out; everything else keeps running.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use twin_hal::SimWorld;
//! use twin_middleware::EventBus;
//! use twin_runtime::{SimConfig, Simulation};
//!
//! let bus = EventBus::default();
//! let mut sim = Simulation::new(&SimConfig::default(), SimWorld::demo_room(), Arc::new(bus), 0.0);
//!
//! // First render tick: every sensor is due.
//! assert_eq!(sim.render_tick(0.0), 3);
//! sim.physics_tick(0.02);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use twin_control::{CommandSlot, MotionController, subscribe_commands};
use twin_hal::SimWorld;
use twin_middleware::{Subscription, Transport};
use twin_sensors::{CameraSensor, ImuSensor, LidarSensor, Sensor};
use twin_types::SimError;

use crate::config::SimConfig;

/// Drives one [`SimWorld`] and its sensors over a [`Transport`].
pub struct Simulation {
    world: SimWorld,
    transport: Arc<dyn Transport>,
    sensors: Vec<Box<dyn Sensor>>,
    controller: Option<MotionController>,
    commands: Option<Subscription>,
    published: BTreeMap<String, u64>,
    skipped: u64,
}

impl Simulation {
    /// Build every component from `config`.
    ///
    /// Never fails as a whole: a component that cannot be built, or whose
    /// topic cannot be registered, is disabled and logged.  The command
    /// subscription needs a Tokio runtime; without one the controller still
    /// runs and accepts targets through [`Simulation::command_slot`].
    #[instrument(skip_all, name = "simulation_init")]
    pub fn new(
        config: &SimConfig,
        world: SimWorld,
        transport: Arc<dyn Transport>,
        start_time: f64,
    ) -> Self {
        let mut sensors: Vec<Box<dyn Sensor>> = Vec::new();

        let candidates: [(&str, Result<Box<dyn Sensor>, SimError>); 3] = [
            (
                "lidar",
                LidarSensor::new(config.lidar.clone(), start_time)
                    .map(|s| Box::new(s) as Box<dyn Sensor>),
            ),
            (
                "camera",
                CameraSensor::new(config.camera.clone(), &world, start_time)
                    .map(|s| Box::new(s) as Box<dyn Sensor>),
            ),
            (
                "imu",
                ImuSensor::new(config.imu.clone(), &world, start_time)
                    .map(|s| Box::new(s) as Box<dyn Sensor>),
            ),
        ];
        for (component, built) in candidates {
            let registered =
                built.and_then(|s| transport.register_topic(s.topic(), s.schema()).map(|()| s));
            match registered {
                Ok(sensor) => sensors.push(sensor),
                Err(e) => error!(component, error = %e, "component disabled"),
            }
        }

        let controller = MotionController::new(config.drive.clone())
            .map_err(|e| error!(component = "drive", error = %e, "component disabled"))
            .ok();

        let commands = controller.as_ref().and_then(|c| {
            subscribe_commands(transport.as_ref(), &c.config().topic, c.slot())
                .map_err(|e| {
                    error!(
                        component = "drive",
                        error = %e,
                        "command subscription failed; commands are only accepted in-process"
                    )
                })
                .ok()
        });

        info!(
            sensors = sensors.len(),
            controller = controller.is_some(),
            "simulation ready"
        );

        Self {
            world,
            transport,
            sensors,
            controller,
            commands,
            published: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Give every sensor a chance to sample at simulation time `now` and
    /// publish what they produce.  Returns the number of messages published.
    pub fn render_tick(&mut self, now: f64) -> usize {
        let Self {
            world,
            transport,
            sensors,
            published,
            skipped,
            ..
        } = self;

        let mut count = 0;
        for sensor in sensors.iter_mut() {
            let message = match sensor.tick(now, &*world) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    *skipped += 1;
                    warn!(sensor = sensor.name(), error = %e, "sample skipped");
                    continue;
                }
            };
            match transport.publish(sensor.topic(), message) {
                Ok(receivers) => {
                    count += 1;
                    *published.entry(sensor.topic().to_string()).or_default() += 1;
                    debug!(topic = sensor.topic(), receivers, now, "published");
                }
                Err(e) => {
                    *skipped += 1;
                    warn!(topic = sensor.topic(), error = %e, "publish failed");
                }
            }
        }
        count
    }

    /// Run the controller and integrate the world over `dt` seconds.
    /// Non-positive or non-finite `dt` is ignored.
    pub fn physics_tick(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let dt = dt as f32;
        if let Some(controller) = self.controller.as_mut() {
            controller.physics_tick(dt, &mut self.world);
        }
        self.world.step(dt);
    }

    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    /// Names of the sensors that passed validation, in tick order.
    pub fn active_sensors(&self) -> Vec<&str> {
        self.sensors.iter().map(|s| s.name()).collect()
    }

    /// In-process handle to the controller's drive target, if the
    /// controller is enabled.
    pub fn command_slot(&self) -> Option<CommandSlot> {
        self.controller.as_ref().map(MotionController::slot)
    }

    pub fn controller(&self) -> Option<&MotionController> {
        self.controller.as_ref()
    }

    /// `true` while commands arriving on the transport reach the controller.
    pub fn accepts_remote_commands(&self) -> bool {
        self.commands.as_ref().is_some_and(Subscription::is_active)
    }

    /// Messages published so far, per topic.
    pub fn published(&self) -> &BTreeMap<String, u64> {
        &self.published
    }

    /// Samples dropped because capture or publishing failed.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if let Some(sub) = self.commands.take() {
            sub.cancel();
        }
    }
}
