//! Deciding how much a screenshot must be shrunk to land in CSS pixels.

use crate::driver::RemoteDriver;
use crate::error::CaptureError;
use crate::geometry::RectangleSize;
use crate::positioning::{entire_size_or_viewport, PositionProvider};
use crate::scripts;
use crate::viewport::viewport_size;
use std::sync::Arc;

/// Screenshots narrower than the entire page by at most this many pixels are taken to be
/// already unscaled. Covers a vertical scrollbar eating into the page width.
const ENTIRE_WIDTH_TOLERANCE: i32 = 10;
const VIEWPORT_WIDTH_TOLERANCE: i32 = 1;

pub trait ScaleProvider: Send + Sync {
    /// Ratio to multiply screenshot pixels by to get CSS pixels.
    fn scale_ratio(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedScaleProvider {
    ratio: f64,
}

impl FixedScaleProvider {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }
}

impl ScaleProvider for FixedScaleProvider {
    fn scale_ratio(&self) -> f64 {
        self.ratio
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullScaleProvider;

impl ScaleProvider for NullScaleProvider {
    fn scale_ratio(&self) -> f64 {
        1.0
    }
}

/// Guesses whether the browser returned device pixels or CSS pixels by comparing the
/// screenshot width with what the page reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextBasedScaleProvider {
    scale_ratio: f64,
}

impl ContextBasedScaleProvider {
    pub fn new(
        top_level_entire_size: RectangleSize,
        viewport_size: RectangleSize,
        device_pixel_ratio: f64,
        image_width: u32,
    ) -> Self {
        let image_width = image_width as i32;
        let unscaled = device_pixel_ratio == 1.0
            || (image_width - viewport_size.width).abs() <= VIEWPORT_WIDTH_TOLERANCE
            || (image_width - top_level_entire_size.width).abs() <= ENTIRE_WIDTH_TOLERANCE;

        let scale_ratio = if unscaled || device_pixel_ratio <= 0.0 {
            1.0
        } else {
            1.0 / device_pixel_ratio
        };

        Self { scale_ratio }
    }
}

impl ScaleProvider for ContextBasedScaleProvider {
    fn scale_ratio(&self) -> f64 {
        self.scale_ratio
    }
}

/// Builds a [`ScaleProvider`] once the width of the first screenshot is known.
pub trait ScaleProviderFactory: Send + Sync {
    fn scale_provider(&self, image_width: u32) -> Box<dyn ScaleProvider>;
}

#[derive(Debug, Clone, Copy)]
pub struct ContextBasedScaleProviderFactory {
    top_level_entire_size: RectangleSize,
    viewport_size: RectangleSize,
    device_pixel_ratio: f64,
}

impl ContextBasedScaleProviderFactory {
    pub fn new(
        top_level_entire_size: RectangleSize,
        viewport_size: RectangleSize,
        device_pixel_ratio: f64,
    ) -> Self {
        Self {
            top_level_entire_size,
            viewport_size,
            device_pixel_ratio,
        }
    }
}

impl ScaleProviderFactory for ContextBasedScaleProviderFactory {
    fn scale_provider(&self, image_width: u32) -> Box<dyn ScaleProvider> {
        let provider = ContextBasedScaleProvider::new(
            self.top_level_entire_size,
            self.viewport_size,
            self.device_pixel_ratio,
            image_width,
        );
        log::debug!(
            "Scale ratio {} for image width {} (dpr {}, viewport {}, entire {})",
            provider.scale_ratio(),
            image_width,
            self.device_pixel_ratio,
            self.viewport_size,
            self.top_level_entire_size
        );
        Box::new(provider)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedScaleProviderFactory {
    ratio: f64,
}

impl FixedScaleProviderFactory {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }
}

impl ScaleProviderFactory for FixedScaleProviderFactory {
    fn scale_provider(&self, _image_width: u32) -> Box<dyn ScaleProvider> {
        Box::new(FixedScaleProvider::new(self.ratio))
    }
}

/// Never scales.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScaleProviderFactory;

impl ScaleProviderFactory for NullScaleProviderFactory {
    fn scale_provider(&self, _image_width: u32) -> Box<dyn ScaleProvider> {
        Box::new(NullScaleProvider)
    }
}

/// `window.devicePixelRatio`, or 1.0 when it cannot be read.
pub async fn device_pixel_ratio(driver: &dyn RemoteDriver) -> f64 {
    let ratio = driver
        .execute_script(scripts::GET_DEVICE_PIXEL_RATIO, vec![])
        .await
        .map_err(|e| CaptureError::driver("read device pixel ratio", e))
        .and_then(|value| {
            value
                .as_f64()
                .filter(|ratio| *ratio > 0.0)
                .ok_or_else(|| CaptureError::Other(format!("Invalid device pixel ratio {}", value)))
        });

    match ratio {
        Ok(ratio) => ratio,
        Err(e) => {
            log::warn!("Failed to extract device pixel ratio, using 1: {}", e);
            1.0
        }
    }
}

/// Picks the scale provider factory for the driver's current top-level context.
///
/// `position_provider` supplies the entire page size. When the viewport itself cannot be
/// measured the factory falls back to a fixed `1 / devicePixelRatio`.
pub async fn scale_provider_factory_for(
    driver: &dyn RemoteDriver,
    position_provider: &dyn PositionProvider,
) -> Arc<dyn ScaleProviderFactory> {
    let device_pixel_ratio = device_pixel_ratio(driver).await;

    let viewport = match viewport_size(driver).await {
        Ok(size) => size,
        Err(e) => {
            log::warn!(
                "Failed to measure viewport, using fixed scale 1/{}: {}",
                device_pixel_ratio,
                e
            );
            return Arc::new(FixedScaleProviderFactory::new(1.0 / device_pixel_ratio));
        }
    };

    let entire_size = match entire_size_or_viewport(position_provider, driver).await {
        Ok(size) => size,
        Err(e) => {
            log::warn!("Failed to measure entire size, using viewport: {}", e);
            viewport
        }
    };

    Arc::new(ContextBasedScaleProviderFactory::new(
        entire_size,
        viewport,
        device_pixel_ratio,
    ))
}
