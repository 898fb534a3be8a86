use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Number of 8-bit components per pixel carried by a [`Frame`]
pub const RGB_CHANNELS: usize = 3;

/// Represents a single decoded video frame
///
/// This is a thin wrapper around an 8-bit RGB image buffer. Every decoder in
/// this crate hands frames to the comparison pipeline in this layout, so the
/// PSNR kernel can work on the raw component slice directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self { buffer: ImageBuffer::new(width, height) }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Create a frame from packed RGB bytes (row-major, no padding)
    ///
    /// Returns `None` when `data` is not exactly `width * height * 3` bytes.
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * RGB_CHANNELS {
            return None;
        }
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Frame size as `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Components per pixel (always 3 for RGB frames)
    pub fn channels(&self) -> usize {
        RGB_CHANNELS
    }

    /// Packed component bytes, `width * height * channels` long
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save_with_format(path, image::ImageFormat::Png)
    }
}

/// Which side of a comparison a source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSide {
    Reference,
    Compressed,
}

impl std::fmt::Display for StreamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Compressed => write!(f, "compressed"),
        }
    }
}

/// Frame counts as reported by each container
///
/// These are advisory only; decoders regularly deliver fewer frames than
/// their metadata promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameCounts {
    pub reference: u64,
    pub compressed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_rgb_bytes_checks_length() {
        assert!(Frame::from_rgb_bytes(2, 2, vec![0; 12]).is_some());
        assert!(Frame::from_rgb_bytes(2, 2, vec![0; 11]).is_none());
        assert!(Frame::from_rgb_bytes(2, 2, vec![0; 13]).is_none());
    }

    #[test]
    fn test_frame_pixel_access() {
        let mut frame = Frame::new_black(4, 3);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.as_bytes().len(), 4 * 3 * RGB_CHANNELS);

        frame.set_pixel(1, 2, [10, 20, 30]);
        assert_eq!(frame.get_pixel(1, 2), [10, 20, 30]);
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_filled_frame_bytes() {
        let frame = Frame::new_filled(2, 1, [1, 2, 3]);
        assert_eq!(frame.as_bytes(), &[1, 2, 3, 1, 2, 3]);
    }
}
