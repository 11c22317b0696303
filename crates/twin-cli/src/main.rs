//! `twin` – runs the sensor and motion core against a headless demo room.
//!
//! 1. Loads the configuration: the path given as the first argument, else
//!    `twin.toml` in the working directory, else built-in defaults.
//! 2. Builds a [`SimWorld::demo_room`] and a [`Simulation`] over an
//!    in-process [`EventBus`], with one counting subscriber per topic.
//! 3. Drives render and physics ticks from two Tokio intervals until the
//!    configured duration elapses or Ctrl-C is pressed.
//! 4. Prints a per-topic summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use colored::Colorize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use twin_hal::{SimWorld, WorldQuery};
use twin_middleware::{EventBus, Subscription, Transport};
use twin_runtime::config::{self, DEFAULT_CONFIG_FILE};
use twin_runtime::{SimConfig, Simulation, init_tracing};
use twin_types::{Message, SimError, Twist};

fn main() -> ExitCode {
    // Tracing first: the OTLP exporter must be built outside any runtime.
    let _guard = init_tracing("twin");

    let arg = std::env::args().nth(1).map(PathBuf::from);
    let cfg = match resolve_config(arg.as_deref(), Path::new(DEFAULT_CONFIG_FILE)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red());
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "Ctrl-C received, stopping simulation".yellow().bold());
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to start Tokio runtime".red());
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(cfg, shutdown));
    ExitCode::SUCCESS
}

/// Pick the configuration source.
///
/// An explicit path must exist; the default file is optional.
fn resolve_config(explicit: Option<&Path>, default_file: &Path) -> Result<SimConfig, SimError> {
    if let Some(path) = explicit {
        return config::load_from(path)?.ok_or_else(|| {
            SimError::config("config", format!("{} does not exist", path.display()))
        });
    }
    match config::load_from(default_file)? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = SimConfig::default();
            config::apply_env_overrides(&mut cfg);
            Ok(cfg)
        }
    }
}

/// Per-topic receive counters fed by bus subscriptions.
struct TopicCounters {
    counts: BTreeMap<String, Arc<AtomicU64>>,
    subscriptions: Vec<Subscription>,
}

impl TopicCounters {
    fn attach(bus: &EventBus) -> Result<Self, SimError> {
        let mut counts = BTreeMap::new();
        let mut subscriptions = Vec::new();
        for (topic, _) in bus.topics()? {
            let counter = Arc::new(AtomicU64::new(0));
            let c = counter.clone();
            subscriptions.push(bus.subscribe(
                &topic,
                Box::new(move |_: &Message| {
                    c.fetch_add(1, Ordering::Relaxed);
                }),
            )?);
            counts.insert(topic, counter);
        }
        Ok(Self {
            counts,
            subscriptions,
        })
    }

    fn received(&self, topic: &str) -> u64 {
        self.counts
            .get(topic)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

impl Drop for TopicCounters {
    fn drop(&mut self) {
        for sub in &self.subscriptions {
            sub.cancel();
        }
    }
}

async fn run(cfg: SimConfig, shutdown: Arc<AtomicBool>) {
    let settings = cfg.simulation.clone();
    let bus = EventBus::default();
    let mut sim = Simulation::new(&cfg, SimWorld::demo_room(), Arc::new(bus.clone()), 0.0);

    let counters = match TopicCounters::attach(&bus) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!(error = %e, "topic counters unavailable");
            None
        }
    };

    if let Some(cmd) = settings.demo_command {
        match bus.publish(&cfg.drive.topic, Twist::from(cmd).into()) {
            Ok(_) => info!(linear_x = cmd.linear_x, angular_z = cmd.angular_z, "demo command sent"),
            Err(e) => warn!(error = %e, "demo command not sent"),
        }
    }

    let physics_dt = settings.physics_period();
    let mut render = tokio::time::interval(Duration::from_secs_f64(settings.render_period()));
    let mut physics = tokio::time::interval(Duration::from_secs_f64(physics_dt));
    render.set_missed_tick_behavior(MissedTickBehavior::Skip);

    print_banner(&sim, &settings);
    let started = Instant::now();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let elapsed = started.elapsed().as_secs_f64();
        if settings.duration().is_some_and(|limit| elapsed >= limit) {
            break;
        }
        tokio::select! {
            _ = render.tick() => {
                sim.render_tick(started.elapsed().as_secs_f64());
            }
            _ = physics.tick() => {
                sim.physics_tick(physics_dt);
            }
        }
    }
    // Let handler tasks drain what is already queued.
    tokio::time::sleep(Duration::from_millis(20)).await;

    print_summary(&sim, counters.as_ref(), started.elapsed().as_secs_f64());
}

fn print_banner(sim: &Simulation, settings: &twin_runtime::SimulationSettings) {
    println!("{}", "  twin · headless digital twin".bold().cyan());
    println!(
        "  sensors: {}   render {} Hz   physics {} Hz   {}",
        sim.active_sensors().join(", ").bold(),
        settings.render_hz,
        settings.physics_hz,
        match settings.duration() {
            Some(d) => format!("running {d} s"),
            None => "running until Ctrl-C".to_string(),
        }
    );
    if sim.controller().is_none() {
        println!("  {}", "motion controller disabled (see log)".yellow());
    }
}

fn print_summary(sim: &Simulation, counters: Option<&TopicCounters>, elapsed: f64) {
    println!();
    println!("{}", format!("  Summary after {elapsed:.2} s").bold());
    println!("  {:<24} {:>10} {:>10} {:>9}", "topic", "published", "received", "rate Hz");
    for (topic, published) in sim.published() {
        let received = counters.map_or(0, |c| c.received(topic));
        let rate = if elapsed > 0.0 { *published as f64 / elapsed } else { 0.0 };
        let row = format!("  {topic:<24} {published:>10} {received:>10} {rate:>9.1}");
        if received == *published {
            println!("{}", row.green());
        } else {
            println!("{}", row.yellow());
        }
    }
    if sim.skipped_samples() > 0 {
        println!("  {} {}", "skipped samples:".red(), sim.skipped_samples());
    }
    let pose = sim.world().pose();
    println!(
        "  final position: ({:.2}, {:.2}, {:.2})",
        pose.position.x, pose.position.y, pose.position.z
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve_config(Some(&missing), &dir.path().join("twin.toml")).unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn default_file_is_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twin.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[lidar]\nrays = 42").unwrap();
        let cfg = resolve_config(None, &path).unwrap();
        assert_eq!(cfg.lidar.rays, 42);
    }

    #[test]
    fn falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = resolve_config(None, &dir.path().join("twin.toml")).unwrap();
        assert_eq!(cfg.lidar, SimConfig::default().lidar);
    }

    #[tokio::test]
    async fn counters_see_published_messages() {
        let bus = EventBus::default();
        let mut sim = Simulation::new(
            &SimConfig::default(),
            SimWorld::demo_room(),
            Arc::new(bus.clone()),
            0.0,
        );
        let counters = TopicCounters::attach(&bus).unwrap();
        sim.render_tick(0.0);
        for _ in 0..100 {
            if counters.received("/imu/data") == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(counters.received("/imu/data"), 1);
        assert_eq!(counters.received("/unknown"), 0);
    }
}
