//! Screen capture capability
//!
//! The real window grabber lives outside this crate; the engine only sees
//! [`CaptureSource`]. Replay sources here let the bot run headless.

pub mod replay;

pub use replay::{ReplayCapture, StaticCapture};

use image::RgbImage;
use image::imageops;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rectangle of the target window, in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Crop `image` to this region, rejecting regions that leave the image.
    pub fn crop(&self, image: &RgbImage) -> Result<RgbImage, CaptureError> {
        let (w, h) = image.dimensions();
        let inside = self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|right| right <= w)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= h);
        if !inside {
            return Err(CaptureError::InvalidRegion {
                region: *self,
                width: w,
                height: h,
            });
        }

        Ok(imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("capture source unavailable: {0}")]
    Unavailable(String),
    #[error("region {region:?} does not fit a {width}x{height} frame")]
    InvalidRegion { region: Region, width: u32, height: u32 },
}

/// Returns the pixels of `region`, or of the whole target when `None`.
pub trait CaptureSource {
    fn capture(&mut self, region: Option<Region>) -> Result<RgbImage, CaptureError>;
}

impl<T: CaptureSource + ?Sized> CaptureSource for Box<T> {
    fn capture(&mut self, region: Option<Region>) -> Result<RgbImage, CaptureError> {
        (**self).capture(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_inside_frame() {
        let frame = RgbImage::from_fn(10, 8, |x, y| Rgb([x as u8, y as u8, 0]));
        let cropped = Region::new(2, 3, 4, 5).crop(&frame).unwrap();

        assert_eq!(cropped.dimensions(), (4, 5));
        assert_eq!(*cropped.get_pixel(0, 0), Rgb([2, 3, 0]));
    }

    #[test]
    fn test_crop_outside_frame_is_rejected() {
        let frame = RgbImage::new(10, 8);
        assert!(matches!(
            Region::new(8, 0, 4, 4).crop(&frame),
            Err(CaptureError::InvalidRegion { .. })
        ));
        assert!(Region::new(0, 0, 0, 4).crop(&frame).is_err());
        assert!(Region::new(u32::MAX, 0, 2, 2).crop(&frame).is_err());
    }
}
