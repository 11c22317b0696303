//! Captured pixel buffers returned by the rendering collaborator.

use twin_types::SimError;

/// A raw RGB24 frame: three bytes per pixel, red first, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// Bytes per RGB24 pixel.
    pub const CHANNELS: usize = 3;

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(pixels * Self::CHANNELS).collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of bytes a well-formed frame of this size holds.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * Self::CHANNELS
    }

    /// Check that the buffer length matches the declared dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Capture`] naming `surface` when it does not.
    pub fn validate(&self, surface: &str) -> Result<(), SimError> {
        if self.data.len() != self.expected_len() {
            return Err(SimError::Capture {
                surface: surface.to_string(),
                details: format!(
                    "buffer holds {} bytes, expected {} for {}x{} rgb24",
                    self.data.len(),
                    self.expected_len(),
                    self.width,
                    self.height
                ),
            });
        }
        Ok(())
    }

    /// RGB triple of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        let px = self.data.get(i..i + Self::CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_frame_has_expected_layout() {
        let frame = CameraFrame::solid(2, 2, [10, 20, 30]);
        assert_eq!(frame.data.len(), 12);
        assert_eq!(frame.pixel(1, 1), Some([10, 20, 30]));
        assert_eq!(frame.pixel(2, 0), None);
        assert!(frame.validate("front").is_ok());
    }

    #[test]
    fn short_buffer_fails_validation() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: vec![0u8; 11],
        };
        let err = frame.validate("front").unwrap_err();
        assert!(matches!(err, SimError::Capture { ref surface, .. } if surface == "front"));
    }
}
