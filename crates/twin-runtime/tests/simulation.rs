//! End-to-end runs of the simulation over the event bus.

use std::sync::Arc;
use std::time::Duration;

use twin_hal::{SimWorld, WorldQuery};
use twin_middleware::{EventBus, Transport};
use twin_runtime::{SimConfig, Simulation};
use twin_types::{Message, NO_RETURN, Pose, Quaternion, Twist, Vec3};

fn small_config() -> SimConfig {
    let mut cfg = SimConfig::default();
    cfg.lidar.rays = 31;
    cfg.lidar.fov_deg = 90.0;
    cfg
}

#[tokio::test]
async fn subscribers_receive_scans_from_the_room() {
    let bus = EventBus::default();
    let mut scans = bus.subscribe_to("/scan").unwrap();
    let mut sim = Simulation::new(
        &small_config(),
        SimWorld::demo_room(),
        Arc::new(bus.clone()),
        0.0,
    );

    assert_eq!(sim.render_tick(0.0), 3);

    let event = tokio::time::timeout(Duration::from_secs(1), scans.recv())
        .await
        .expect("scan within a second")
        .unwrap();
    let Message::LaserScan(scan) = &event.payload else {
        panic!("expected a LaserScan, got {}", event.payload.schema());
    };
    assert_eq!(event.topic, "/scan");
    assert_eq!(scan.ranges.len(), 31);
    // Centre ray hits the pillar 2 m ahead; nothing reads closer than range_min.
    assert!((scan.ranges[15] - 2.0).abs() < 1e-3);
    assert!(scan.ranges.iter().all(|r| *r == NO_RETURN || *r >= scan.range_min));
}

#[tokio::test]
async fn invalid_sensor_is_disabled_and_the_rest_keeps_running() {
    let mut cfg = small_config();
    cfg.lidar.rays = 0;
    cfg.camera.surface = Some("no_such_surface".to_string());

    let bus = EventBus::default();
    let mut imu = bus.subscribe_to("/imu/data").unwrap();
    let mut sim = Simulation::new(&cfg, SimWorld::demo_room(), Arc::new(bus.clone()), 0.0);
    assert_eq!(sim.active_sensors(), vec!["imu"]);

    // Ticks 31.25 ms apart: slower than the IMU period, so every tick fires.
    for i in 0..10 {
        sim.render_tick(i as f64 / 32.0);
    }
    assert_eq!(sim.published().get("/imu/data"), Some(&10));
    assert!(!sim.published().contains_key("/scan"));

    let event = imu.recv().await.unwrap();
    assert!(matches!(event.payload, Message::Imu(_)));

    // The disabled sensors never registered their topics.
    let err = bus.publish("/scan", Message::Twist(Twist::default())).unwrap_err();
    assert!(matches!(err, twin_types::SimError::UnknownTopic(_)));
}

#[tokio::test]
async fn cmd_vel_on_the_bus_moves_the_body_forward() {
    let bus = EventBus::default();
    let mut sim = Simulation::new(
        &small_config(),
        SimWorld::demo_room(),
        Arc::new(bus.clone()),
        0.0,
    );
    assert!(sim.accepts_remote_commands());

    let receivers = bus.publish("/cmd_vel", Twist::planar(1.0, 0.0).into()).unwrap();
    assert_eq!(receivers, 1);

    let slot = sim.command_slot().unwrap();
    for _ in 0..200 {
        if slot.target().linear > 0.0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(slot.target().linear, 1.0);

    let start = sim.world().pose().position;
    for _ in 0..50 {
        sim.physics_tick(0.02);
    }
    let moved = sim.world().pose().position.sub(start);
    assert!(moved.x > 0.5, "moved {moved:?}");
    assert!(moved.y.abs() < 1e-4);
    assert_eq!(sim.world().linear_velocity().x, 1.0);
}

#[tokio::test]
async fn turning_command_rotates_the_heading() {
    let bus = EventBus::default();
    let mut sim = Simulation::new(
        &small_config(),
        SimWorld::demo_room(),
        Arc::new(bus.clone()),
        0.0,
    );
    let slot = sim.command_slot().unwrap();
    slot.submit(&Twist::planar(0.0, 1.0));

    for _ in 0..100 {
        sim.physics_tick(0.01);
    }
    let fwd = sim.world().pose().forward();
    // 1 rad/s reached after 0.2 s; about 0.9 rad of yaw in one second.
    let yaw = fwd.y.atan2(fwd.x);
    assert!((yaw - 0.9).abs() < 0.02, "yaw {yaw}");
    assert_eq!(sim.world().angular_velocity().z, 1.0);
}

#[test]
fn teleported_body_scans_from_its_new_pose() {
    let bus = EventBus::default();
    let mut scans = bus.subscribe_to("/scan").unwrap();
    let mut sim = Simulation::new(
        &small_config(),
        SimWorld::demo_room(),
        Arc::new(bus.clone()),
        0.0,
    );

    // Face -X: the west wall is 5 m away and the pillar is behind.
    sim.world_mut()
        .set_pose(Pose::new(Vec3::zero(), Quaternion::from_yaw(std::f32::consts::PI)));
    sim.render_tick(0.0);

    let event = scans.try_recv().unwrap();
    let Message::LaserScan(scan) = &event.payload else {
        panic!("expected a LaserScan");
    };
    assert!((scan.ranges[15] - 5.0).abs() < 1e-3, "centre {}", scan.ranges[15]);
}
