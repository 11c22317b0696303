//! Message schemas exchanged over the transport.
//!
//! Field layouts mirror the familiar `sensor_msgs` / `geometry_msgs`
//! definitions so downstream consumers can map them one-to-one.  Bit-level
//! encoding is the transport's concern, not this crate's.

use serde::{Deserialize, Serialize};

use crate::geometry::{Quaternion, Vec3};

/// Range value reported for a ray with no valid detection.
pub const NO_RETURN: f32 = f32::INFINITY;

/// Row-major 3×3 covariance declaring the quantity as unknown: diagonal
/// `-1`, off-diagonal `0`.
pub const UNKNOWN_COVARIANCE: [f64; 9] = [-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0];

// ────────────────────────────────────────────────────────────────────────────
// Header
// ────────────────────────────────────────────────────────────────────────────

/// A simulation timestamp split into whole seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    /// Convert a simulation time in seconds, rounded to the nearest
    /// nanosecond.  Negative and non-finite inputs map to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::default();
        }
        let whole = secs.floor();
        let nanosec = ((secs - whole) * 1e9).round() as u32;
        if nanosec >= 1_000_000_000 {
            return Self {
                sec: whole as i32 + 1,
                nanosec: 0,
            };
        }
        Self {
            sec: whole as i32,
            nanosec,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 * 1e-9
    }
}

/// Stamp and coordinate frame attached to every outbound message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    pub fn new(frame_id: impl Into<String>, sim_time: f64) -> Self {
        Self {
            stamp: Time::from_secs_f64(sim_time),
            frame_id: frame_id.into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensor messages
// ────────────────────────────────────────────────────────────────────────────

/// A planar range scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    pub header: Header,
    /// Bearing of the first ray (radians).
    pub angle_min: f32,
    /// Bearing of the last ray (radians).
    pub angle_max: f32,
    /// Angular step between consecutive rays (radians).
    pub angle_increment: f32,
    /// Time between consecutive rays (seconds).
    pub time_increment: f32,
    /// Time between consecutive scans (seconds).
    pub scan_time: f32,
    pub range_min: f32,
    pub range_max: f32,
    /// One entry per ray, ordered from `angle_min` to `angle_max`.  Values
    /// lie in `[range_min, range_max]` or equal [`NO_RETURN`].
    pub ranges: Vec<f32>,
    pub intensities: Vec<f32>,
}

/// Pixel layout of an [`Image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    /// Three bytes per pixel, red first.
    #[default]
    Rgb8,
    /// One luma byte per pixel.
    Mono8,
}

impl ImageEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageEncoding::Rgb8 => "rgb8",
            ImageEncoding::Mono8 => "mono8",
        }
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            ImageEncoding::Rgb8 => 3,
            ImageEncoding::Mono8 => 1,
        }
    }
}

impl std::fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uncompressed image.  `data.len() == height * step` always holds for
/// images produced by the camera encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub encoding: ImageEncoding,
    pub is_bigendian: u8,
    /// Row length in bytes.
    pub step: u32,
    pub data: Vec<u8>,
}

/// An inertial measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub header: Header,
    pub orientation: Quaternion,
    pub orientation_covariance: [f64; 9],
    /// rad/s
    pub angular_velocity: Vec3,
    pub angular_velocity_covariance: [f64; 9],
    /// m/s²
    pub linear_acceleration: Vec3,
    pub linear_acceleration_covariance: [f64; 9],
}

// ────────────────────────────────────────────────────────────────────────────
// Command messages
// ────────────────────────────────────────────────────────────────────────────

/// A velocity command.  The motion controller consumes `linear.x` (forward
/// speed, m/s) and `angular.z` (yaw rate, rad/s) and ignores the rest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Twist {
    /// A planar drive command.
    pub fn planar(linear_x: f32, angular_z: f32) -> Self {
        Self {
            linear: Vec3::new(linear_x, 0.0, 0.0),
            angular: Vec3::new(0.0, 0.0, angular_z),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Message / MessageSchema
// ────────────────────────────────────────────────────────────────────────────

/// Schema identifier a topic is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageSchema {
    LaserScan,
    Image,
    Imu,
    Twist,
}

impl MessageSchema {
    /// Conventional type name, e.g. `"sensor_msgs/LaserScan"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageSchema::LaserScan => "sensor_msgs/LaserScan",
            MessageSchema::Image => "sensor_msgs/Image",
            MessageSchema::Imu => "sensor_msgs/Imu",
            MessageSchema::Twist => "geometry_msgs/Twist",
        }
    }
}

impl std::fmt::Display for MessageSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Any message that can travel over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "msg")]
pub enum Message {
    LaserScan(LaserScan),
    Image(Image),
    Imu(Imu),
    Twist(Twist),
}

impl Message {
    pub fn schema(&self) -> MessageSchema {
        match self {
            Message::LaserScan(_) => MessageSchema::LaserScan,
            Message::Image(_) => MessageSchema::Image,
            Message::Imu(_) => MessageSchema::Imu,
            Message::Twist(_) => MessageSchema::Twist,
        }
    }
}

impl From<LaserScan> for Message {
    fn from(msg: LaserScan) -> Self {
        Message::LaserScan(msg)
    }
}

impl From<Image> for Message {
    fn from(msg: Image) -> Self {
        Message::Image(msg)
    }
}

impl From<Imu> for Message {
    fn from(msg: Imu) -> Self {
        Message::Imu(msg)
    }
}

impl From<Twist> for Message {
    fn from(msg: Twist) -> Self {
        Message::Twist(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_splits_seconds_and_nanoseconds() {
        let t = Time::from_secs_f64(12.25);
        assert_eq!(t.sec, 12);
        assert_eq!(t.nanosec, 250_000_000);
        assert!((t.as_secs_f64() - 12.25).abs() < 1e-9);
    }

    #[test]
    fn time_rounds_to_the_nearest_nanosecond() {
        assert_eq!(
            Time::from_secs_f64(1.9),
            Time {
                sec: 1,
                nanosec: 900_000_000
            }
        );
        assert_eq!(Time::from_secs_f64(0.1).nanosec, 100_000_000);
        // Within half a nanosecond of the next second: carries over.
        assert_eq!(Time::from_secs_f64(2.999_999_999_8), Time { sec: 3, nanosec: 0 });
    }

    #[test]
    fn time_clamps_invalid_input_to_zero() {
        assert_eq!(Time::from_secs_f64(-1.0), Time::default());
        assert_eq!(Time::from_secs_f64(f64::NAN), Time::default());
    }

    #[test]
    fn unknown_covariance_has_negative_diagonal() {
        for (i, v) in UNKNOWN_COVARIANCE.iter().enumerate() {
            let expected = if i % 4 == 0 { -1.0 } else { 0.0 };
            assert_eq!(*v, expected, "entry {i}");
        }
    }

    #[test]
    fn message_reports_its_schema() {
        let msg: Message = Twist::planar(1.0, 0.5).into();
        assert_eq!(msg.schema(), MessageSchema::Twist);
        assert_eq!(msg.schema().type_name(), "geometry_msgs/Twist");
    }

    #[test]
    fn twist_json_uses_tagged_layout() {
        let msg: Message = Twist::planar(1.5, -0.3).into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"Twist\""));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn image_encoding_names() {
        assert_eq!(ImageEncoding::Rgb8.to_string(), "rgb8");
        assert_eq!(ImageEncoding::Mono8.as_str(), "mono8");
        assert_eq!(ImageEncoding::Mono8.bytes_per_pixel(), 1);
    }
}
