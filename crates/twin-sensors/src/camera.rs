//! Camera: captured RGB24 frames encoded into [`Image`] messages.
//!
//! | Encoding | Bytes per pixel | `step` | Pixel value |
//! |---|---|---|---|
//! | `rgb8` | 3 | `width * 3` | copied unchanged |
//! | `mono8` | 1 | `width` | `round(0.299 R + 0.587 G + 0.114 B)` |

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use twin_hal::{CameraFrame, WorldQuery};
use twin_types::{Header, Image, ImageEncoding, Message, MessageSchema, SimError};

use crate::scheduler::PublishScheduler;
use crate::sensor::{Sensor, validate_common};

const COMPONENT: &str = "camera";

/// Camera parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub topic: String,
    pub frame_id: String,
    pub publish_hz: f64,
    pub encoding: ImageEncoding,
    /// Render surface to capture from.  Required.
    pub surface: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            topic: "/camera/image_raw".to_string(),
            frame_id: "camera".to_string(),
            publish_hz: 10.0,
            encoding: ImageEncoding::Rgb8,
            surface: None,
        }
    }
}

impl CameraConfig {
    /// Check the configuration against the world the camera will capture
    /// from.
    pub fn validate(&self, world: &dyn WorldQuery) -> Result<(), SimError> {
        validate_common(COMPONENT, &self.topic, &self.frame_id)?;
        match self.surface.as_deref() {
            None => Err(SimError::config(COMPONENT, "no render surface configured")),
            Some(s) if !world.has_surface(s) => Err(SimError::config(
                COMPONENT,
                format!("render surface '{s}' does not exist"),
            )),
            Some(_) => Ok(()),
        }
    }
}

/// ITU-R BT.601 luma, rounded to the nearest integer.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    y.round().clamp(0.0, 255.0) as u8
}

/// Encode a validated RGB24 frame.
///
/// The caller is expected to have run [`CameraFrame::validate`]; a trailing
/// partial pixel in a malformed buffer is ignored.
pub fn encode(frame: &CameraFrame, encoding: ImageEncoding, header: Header) -> Image {
    let data = match encoding {
        ImageEncoding::Rgb8 => frame.data.clone(),
        ImageEncoding::Mono8 => frame
            .data
            .chunks_exact(CameraFrame::CHANNELS)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect(),
    };
    Image {
        header,
        height: frame.height,
        width: frame.width,
        encoding,
        is_bigendian: 0,
        step: frame.width * encoding.bytes_per_pixel(),
        data,
    }
}

/// Scheduler-gated camera publishing [`Image`] messages.
#[derive(Debug)]
pub struct CameraSensor {
    config: CameraConfig,
    surface: String,
    scheduler: PublishScheduler,
}

impl CameraSensor {
    /// Validate `config` against `world` and build the sensor.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] when no surface is configured or the
    /// named surface does not exist.
    pub fn new(
        config: CameraConfig,
        world: &dyn WorldQuery,
        start_time: f64,
    ) -> Result<Self, SimError> {
        config.validate(world)?;
        let surface = config.surface.clone().unwrap_or_default();
        let scheduler = PublishScheduler::new(
            config.publish_hz,
            PublishScheduler::DEFAULT_MIN_RATE_HZ,
            start_time,
        );
        info!(
            topic = %config.topic,
            surface = %surface,
            encoding = %config.encoding,
            rate_hz = scheduler.effective_rate(),
            "camera ready"
        );
        Ok(Self {
            config,
            surface,
            scheduler,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

impl Sensor for CameraSensor {
    fn name(&self) -> &str {
        COMPONENT
    }

    fn topic(&self) -> &str {
        &self.config.topic
    }

    fn schema(&self) -> MessageSchema {
        MessageSchema::Image
    }

    fn tick(&mut self, now: f64, world: &dyn WorldQuery) -> Result<Option<Message>, SimError> {
        if !self.scheduler.should_publish(now) {
            return Ok(None);
        }
        let frame = world.capture_frame(&self.surface)?;
        frame.validate(&self.surface)?;
        let image = encode(
            &frame,
            self.config.encoding,
            Header::new(self.config.frame_id.clone(), now),
        );
        debug!(topic = %self.config.topic, bytes = image.data.len(), "frame");
        Ok(Some(image.into()))
    }
}
