//! Image processing utilities on top of the `image` and `imageproc` crates

use crate::Result;
use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::borrow::Cow;
use std::path::Path;

/// Outline colour for annotated matches
const MATCH_OUTLINE: Rgb<u8> = Rgb([0, 255, 0]);

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Load image as grayscale
    pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;
        Ok(img.to_luma8())
    }

    /// Load image as RGB, dropping any alpha channel
    pub fn load_color<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?;
        Ok(img.to_rgb8())
    }

    /// Save image, format picked from the extension
    pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
        image
            .save(&path)
            .with_context(|| format!("Failed to save image: {:?}", path.as_ref()))
    }

    pub fn to_grayscale(image: &RgbImage) -> GrayImage {
        imageops::grayscale(image)
    }

    /// Rescale a reference authored at `reference_height` to a frame of
    /// `frame_height` pixels. Heights within `tolerance` are left alone.
    pub fn scale_for_frame(
        template: &GrayImage,
        frame_height: u32,
        reference_height: u32,
        tolerance: f64,
    ) -> Cow<'_, GrayImage> {
        if reference_height == 0 {
            return Cow::Borrowed(template);
        }

        let ratio = frame_height as f64 / reference_height as f64;
        if (ratio - 1.0).abs() <= tolerance {
            return Cow::Borrowed(template);
        }

        let new_width = ((template.width() as f64 * ratio) as u32).max(1);
        let new_height = ((template.height() as f64 * ratio) as u32).max(1);
        Cow::Owned(imageops::resize(template, new_width, new_height, FilterType::Triangle))
    }

    /// Half-resolution copy, one pyramid level down
    pub fn halve(image: &GrayImage) -> GrayImage {
        let width = (image.width() / 2).max(1);
        let height = (image.height() / 2).max(1);
        imageops::resize(image, width, height, FilterType::Triangle)
    }

    /// Copy of `frame` with a 2px outline around the matched region
    pub fn annotate_match(frame: &RgbImage, x: u32, y: u32, size: (u32, u32)) -> RgbImage {
        let mut output = frame.clone();
        let (width, height) = size;
        if width == 0 || height == 0 {
            return output;
        }

        draw_hollow_rect_mut(
            &mut output,
            Rect::at(x as i32, y as i32).of_size(width, height),
            MATCH_OUTLINE,
        );
        if width > 2 && height > 2 {
            draw_hollow_rect_mut(
                &mut output,
                Rect::at(x as i32 + 1, y as i32 + 1).of_size(width - 2, height - 2),
                MATCH_OUTLINE,
            );
        }

        output
    }
}
