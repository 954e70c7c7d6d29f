//! Full-page capture: scroll, screenshot, and paste parts until the whole context is covered.

use crate::compensation::RegionPositionCompensation;
use crate::coordinates::{CoordinatesType, ScreenshotContext, ScreenshotType};
use crate::cut::CutProvider;
use crate::debug::{save_quietly, DebugScreenshots};
use crate::driver::{RemoteDriver, TrackedDriver};
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, Region, RectangleSize};
use crate::imaging::Image;
use crate::positioning::{PositionMemento, PositionProvider};
use crate::scaling::ScaleProviderFactory;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Parts never get shorter than this, however large the overlap.
pub const MIN_PART_HEIGHT: i32 = 10;

/// Attempts at moving the origin provider back to (0, 0).
const ORIGIN_RESET_ATTEMPTS: usize = 3;

/// Far enough to hit the bottom-right edge of any real page.
const FAR_POSITION: Location = Location::new(1_000_000, 1_000_000);

/// Source of raw screenshots.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn image(&self) -> Result<Image>;
}

/// Takes viewport screenshots through the driver and undoes device rotation.
pub struct ScreenshotImageProvider {
    driver: Arc<dyn RemoteDriver>,
    rotation: i32,
}

impl ScreenshotImageProvider {
    pub fn new(driver: Arc<dyn RemoteDriver>, rotation: i32) -> Self {
        Self { driver, rotation }
    }
}

#[async_trait]
impl ImageProvider for ScreenshotImageProvider {
    async fn image(&self) -> Result<Image> {
        let png = self
            .driver
            .take_screenshot()
            .await
            .map_err(|e| CaptureError::driver("take screenshot", e))?;
        let image = Image::from_png(&png)?;

        if self.rotation == 0 {
            Ok(image)
        } else {
            image.rotate(self.rotation)
        }
    }
}

/// Everything one stitched capture needs besides the position providers.
pub struct FullPageCaptureAlgorithm<'a> {
    pub driver: &'a TrackedDriver,
    pub image_provider: &'a dyn ImageProvider,
    pub debug_screenshots: &'a dyn DebugScreenshots,
    pub scale_provider_factory: &'a dyn ScaleProviderFactory,
    pub cut_provider: &'a dyn CutProvider,
    pub compensation: &'a dyn RegionPositionCompensation,
    pub stitching_overlap: i32,
    pub wait_before_screenshots: Duration,
}

/// Per-capture values fixed by the seed screenshot and reused for every part.
struct PartGeometry {
    cut_provider: Box<dyn CutProvider>,
    region_in_screenshot: Region,
    scale_ratio: f64,
}

impl FullPageCaptureAlgorithm<'_> {
    /// Captures `region` (context-relative; empty means the whole screenshot) of the current
    /// context, scrolling with `position_provider` until `full_area`, or the provider's entire
    /// size when `full_area` is empty, is covered. The result is exactly `full_area` when one
    /// is given, minus whatever the provider could not reach.
    ///
    /// Both providers are always restored to their saved state, stitching first.
    pub async fn stitched_region(
        &self,
        region: Region,
        full_area: Region,
        origin_provider: &mut dyn PositionProvider,
        position_provider: &mut dyn PositionProvider,
    ) -> Result<Image> {
        log::info!("Capturing stitched region {} (full area {})", region, full_area);

        let origin_state = origin_provider
            .state()
            .await
            .map_err(|e| CaptureError::driver("save origin position", e))?;
        let stitching_state = match position_provider.state().await {
            Ok(state) => state,
            Err(e) => {
                restore_quietly(origin_provider, &origin_state, "origin").await;
                return Err(CaptureError::driver("save stitching position", e));
            }
        };

        let result = self
            .capture(region, full_area, origin_provider, position_provider)
            .await;

        restore_quietly(position_provider, &stitching_state, "stitching").await;
        restore_quietly(origin_provider, &origin_state, "origin").await;

        result
    }

    async fn capture(
        &self,
        region: Region,
        full_area: Region,
        origin_provider: &mut dyn PositionProvider,
        position_provider: &mut dyn PositionProvider,
    ) -> Result<Image> {
        self.reset_origin(origin_provider).await?;

        let original = self.image_provider.image().await?;
        save_quietly(self.debug_screenshots, &original, "original").await;

        let scale_ratio = self
            .scale_provider_factory
            .scale_provider(original.width())
            .scale_ratio();
        let pixel_ratio = 1.0 / scale_ratio;
        let cut_provider = self.cut_provider.scale(pixel_ratio);

        let image = cut_provider.cut(&original)?;
        save_quietly(self.debug_screenshots, &image, "cut").await;

        let region_in_screenshot = self
            .region_in_screenshot(&image, region, scale_ratio, pixel_ratio)
            .await?;
        let geometry = PartGeometry {
            cut_provider,
            region_in_screenshot,
            scale_ratio,
        };

        let seed = self.crop_and_scale(image, &geometry, "").await?;

        let seed_bounds = Region::from_parts(Location::ZERO, seed.size());
        if !full_area.is_empty() {
            if seed_bounds.intersect(&full_area) == full_area {
                log::info!("Seed screenshot covers {}, no stitching needed", full_area);
                return seed.crop(full_area);
            }
            return self
                .stitch(seed, full_area, &geometry, position_provider)
                .await;
        }

        let entire_size = self.entire_size(position_provider, seed.size()).await;
        log::debug!("Entire size {}, seed image {}", entire_size, seed.size());

        if seed.size().covers(entire_size) {
            log::info!("Seed screenshot covers the entire size, no stitching needed");
            return Ok(seed);
        }

        let area = Region::from_parts(Location::ZERO, entire_size);
        self.stitch(seed, area, &geometry, position_provider)
            .await
    }

    async fn reset_origin(&self, origin_provider: &mut dyn PositionProvider) -> Result<()> {
        let mut position = Location::ZERO;

        for attempt in 1..=ORIGIN_RESET_ATTEMPTS {
            origin_provider
                .set_position(Location::ZERO)
                .await
                .map_err(|e| CaptureError::driver("reset origin position", e))?;
            tokio::time::sleep(self.wait_before_screenshots).await;

            position = origin_provider
                .current_position()
                .await
                .map_err(|e| CaptureError::driver("read origin position", e))?;
            if position == Location::ZERO {
                return Ok(());
            }
            log::debug!(
                "Origin reset attempt {} landed at {}",
                attempt,
                position
            );
        }

        Err(CaptureError::StitchConsistency(format!(
            "Couldn't set position to (0, 0) after {} attempts, position is {}",
            ORIGIN_RESET_ATTEMPTS, position
        )))
    }

    /// Where `region` sits in the (cut, unscaled) screenshot `image`.
    async fn region_in_screenshot(
        &self,
        image: &Image,
        region: Region,
        scale_ratio: f64,
        pixel_ratio: f64,
    ) -> Result<Region> {
        if region.is_empty() {
            return Ok(image.bounds());
        }

        let css_size = image.size().scale(scale_ratio);
        let context =
            ScreenshotContext::capture(self.driver, ScreenshotType::Viewport, css_size).await?;

        let visible = context.intersected_region(
            region,
            CoordinatesType::ContextRelative,
            CoordinatesType::ScreenshotAsIs,
        )?;
        let scaled = visible.scale(pixel_ratio);
        let compensated = self.compensation.compensate(scaled, pixel_ratio);
        let in_screenshot = compensated.intersect(&image.bounds());

        if in_screenshot.is_empty() {
            return Err(CaptureError::StitchConsistency(format!(
                "Region {} is not visible in the screenshot",
                region
            )));
        }
        log::debug!("Region {} is {} in the screenshot", region, in_screenshot);
        Ok(in_screenshot)
    }

    async fn crop_and_scale(
        &self,
        image: Image,
        geometry: &PartGeometry,
        label_suffix: &str,
    ) -> Result<Image> {
        let mut image = image;
        if geometry.region_in_screenshot != image.bounds() {
            image = image.crop(geometry.region_in_screenshot)?;
            save_quietly(
                self.debug_screenshots,
                &image,
                &format!("region{}", label_suffix),
            )
            .await;
        }
        if geometry.scale_ratio != 1.0 {
            image = image.scale(geometry.scale_ratio)?;
            save_quietly(
                self.debug_screenshots,
                &image,
                &format!("scaled{}", label_suffix),
            )
            .await;
        }
        Ok(image)
    }

    /// The provider's entire size, refined by scrolling when it claims more than the seed shows.
    async fn entire_size(
        &self,
        position_provider: &mut dyn PositionProvider,
        seed_size: RectangleSize,
    ) -> RectangleSize {
        let declared = match position_provider.entire_size().await {
            Ok(size) => Some(size),
            Err(e) => {
                log::warn!("Failed to extract entire size: {}", e);
                None
            }
        };

        let needs_scroll = declared.map_or(true, |size| !seed_size.covers(size));
        let reached = if needs_scroll && position_provider.clamps_to_content() {
            self.scrolled_entire_size(position_provider, seed_size).await
        } else {
            None
        };

        match (declared, reached) {
            (Some(declared), Some(reached)) => RectangleSize::new(
                declared.width.max(reached.width),
                declared.height.max(reached.height),
            ),
            (Some(size), None) | (None, Some(size)) => size,
            (None, None) => seed_size,
        }
    }

    async fn scrolled_entire_size(
        &self,
        position_provider: &mut dyn PositionProvider,
        seed_size: RectangleSize,
    ) -> Option<RectangleSize> {
        let reachable = async {
            position_provider.set_position(FAR_POSITION).await?;
            position_provider.current_position().await
        }
        .await;

        match reachable {
            Ok(end) => Some(RectangleSize::new(
                end.x + seed_size.width,
                end.y + seed_size.height,
            )),
            Err(e) => {
                log::warn!("Failed to measure the reachable content size: {}", e);
                None
            }
        }
    }

    /// Covers `area` (in position provider coordinates) with the seed and as many parts as
    /// it takes. Each part is pasted where the provider actually moved to.
    async fn stitch(
        &self,
        seed: Image,
        area: Region,
        geometry: &PartGeometry,
        position_provider: &mut dyn PositionProvider,
    ) -> Result<Image> {
        let part_size = RectangleSize::new(
            seed.size().width,
            (seed.size().height - self.stitching_overlap).max(MIN_PART_HEIGHT),
        );
        let seed_bounds = Region::from_parts(Location::ZERO, seed.size());
        let parts = Region::from_parts(Location::ZERO, area.size).sub_regions(part_size);
        log::info!(
            "Stitching {} parts of {} into {}",
            parts.len(),
            part_size,
            area
        );

        let mut canvas = Image::new(area.width() as u32, area.height() as u32);
        canvas.paste_at(-area.left(), -area.top(), &seed);
        let mut extent = Location::new(
            (seed_bounds.right() - area.left()).max(0),
            (seed_bounds.bottom() - area.top()).max(0),
        );

        for (index, part) in parts.iter().enumerate() {
            let target = part.offset(area.left(), area.top());
            if seed_bounds.intersect(&target) == target {
                continue;
            }

            position_provider
                .set_position(target.location)
                .await
                .map_err(|e| CaptureError::driver(format!("move to part {}", target), e))?;
            tokio::time::sleep(self.wait_before_screenshots).await;

            let actual = position_provider
                .current_position()
                .await
                .map_err(|e| CaptureError::driver("read part position", e))?;
            log::debug!(
                "Part {} requested at {}, captured at {}",
                index,
                target.location,
                actual
            );

            let raw = self.image_provider.image().await?;
            save_quietly(self.debug_screenshots, &raw, &format!("part-{}", index)).await;

            let cut = geometry.cut_provider.cut(&raw)?;
            let piece = self
                .crop_and_scale(cut, geometry, &format!("-part-{}", index))
                .await?;

            let x = actual.x - area.left();
            let y = actual.y - area.top();
            canvas.paste_at(x, y, &piece);
            extent = Location::new(
                extent.x.max(x + piece.size().width),
                extent.y.max(y + piece.size().height),
            );
        }

        let trimmed = Region::from_parts(Location::ZERO, area.size)
            .intersect(&Region::new(0, 0, extent.x, extent.y));
        if !trimmed.is_empty() && trimmed.size != area.size {
            log::debug!("Trimming stitched image to {}", trimmed.size);
            canvas = canvas.crop(trimmed)?;
        }

        save_quietly(self.debug_screenshots, &canvas, "stitched").await;
        Ok(canvas)
    }
}

async fn restore_quietly(provider: &mut dyn PositionProvider, state: &PositionMemento, name: &str) {
    if let Err(e) = provider.restore_state(state).await {
        log::warn!("Failed to restore {} position: {}", name, e);
    }
}
