//! Owned RGBA pixel buffers and the handful of operations stitching needs.

use crate::error::{CaptureError, Result};
use crate::geometry::{Region, RectangleSize};
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: RgbaImage,
}

impl Image {
    /// A transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decodes a PNG (or any format the `image` crate sniffs) screenshot.
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self {
            pixels: decoded.to_rgba8(),
        })
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            self.pixels.as_raw(),
            self.width(),
            self.height(),
            ColorType::Rgba8,
        )?;
        Ok(bytes)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> RectangleSize {
        RectangleSize::new(self.width() as i32, self.height() as i32)
    }

    /// The region covering the whole image.
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width() as i32, self.height() as i32)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Crops to `region`, clipped to the image bounds.
    pub fn crop(&self, region: Region) -> Result<Image> {
        let clipped = region.intersect(&self.bounds());
        if clipped.is_empty() {
            return Err(CaptureError::Other(format!(
                "Crop region {} is outside of image {}",
                region,
                self.size()
            )));
        }

        let cropped = imageops::crop_imm(
            &self.pixels,
            clipped.left() as u32,
            clipped.top() as u32,
            clipped.width() as u32,
            clipped.height() as u32,
        )
        .to_image();

        Ok(Self { pixels: cropped })
    }

    /// Resizes by an explicit ratio; dimensions round up.
    pub fn scale(&self, ratio: f64) -> Result<Image> {
        if ratio <= 0.0 || !ratio.is_finite() {
            return Err(CaptureError::Other(format!("Invalid scale ratio {}", ratio)));
        }
        if ratio == 1.0 {
            return Ok(self.clone());
        }

        let size = self.size().scale(ratio);
        let width = size.width.max(1) as u32;
        let height = size.height.max(1) as u32;
        let resized = imageops::resize(&self.pixels, width, height, FilterType::Triangle);

        Ok(Self { pixels: resized })
    }

    /// Copies `other` onto this canvas with its top-left corner at `(x, y)`.
    /// Pixels falling outside the canvas are dropped.
    pub fn paste_at(&mut self, x: i32, y: i32, other: &Image) {
        imageops::replace(&mut self.pixels, &other.pixels, x as i64, y as i64);
    }

    /// Rotates clockwise by a multiple of 90 degrees (negative values rotate counter-clockwise).
    pub fn rotate(&self, degrees: i32) -> Result<Image> {
        if degrees % 90 != 0 {
            return Err(CaptureError::Other(format!(
                "Rotation must be a multiple of 90 degrees, got {}",
                degrees
            )));
        }

        let pixels = match degrees.rem_euclid(360) {
            90 => imageops::rotate90(&self.pixels),
            180 => imageops::rotate180(&self.pixels),
            270 => imageops::rotate270(&self.pixels),
            _ => self.pixels.clone(),
        };

        Ok(Self { pixels })
    }

    /// SHA-256 over the raw RGBA buffer and its dimensions.
    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width().to_be_bytes());
        hasher.update(self.height().to_be_bytes());
        hasher.update(self.pixels.as_raw());
        format!("{:x}", hasher.finalize())
    }
}
