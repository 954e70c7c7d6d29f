//! Capture entry points: viewport, full page, frame, element and arbitrary regions.

use crate::compensation::{compensation_for, detect_user_agent};
use crate::cut::{cut_provider_for, CutMargins, CutProvider};
use crate::debug::{save_quietly, DebugScreenshots, FileDebugScreenshots, NullDebugScreenshots};
use crate::driver::{ElementInspector, RemoteElement, TrackedDriver};
use crate::error::{CaptureError, Result};
use crate::frames::FrameChain;
use crate::geometry::{Location, Region};
use crate::imaging::Image;
use crate::positioning::{
    stitching_provider, ElementPositionProvider, PositionProvider, ScrollPositionProvider,
    StitchMode,
};
use crate::scaling::{scale_provider_factory_for, FixedScaleProviderFactory, ScaleProviderFactory};
use crate::stitching::{FullPageCaptureAlgorithm, ImageProvider, ScreenshotImageProvider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// User-facing capture configuration, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub stitch_mode: StitchMode,
    /// Rows shared by consecutive parts.
    pub stitching_overlap: i32,
    /// Settle delay after every position change.
    pub wait_before_screenshots_ms: u64,
    pub hide_scrollbars: bool,
    /// Clockwise rotation applied to every raw screenshot.
    pub rotation: i32,
    /// Browser chrome to cut off each screenshot.
    pub cut: Option<CutMargins>,
    /// Whether `cut` is in CSS pixels (scaled with the pixel ratio) or screenshot pixels.
    pub scale_cut: bool,
    /// Forces a scale ratio instead of detecting it from the page.
    pub scale_ratio: Option<f64>,
    /// Where to dump intermediate images, if anywhere.
    pub debug_screenshots_dir: Option<PathBuf>,
    pub debug_screenshots_prefix: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            stitch_mode: StitchMode::Scroll,
            stitching_overlap: 50,
            wait_before_screenshots_ms: 100,
            hide_scrollbars: true,
            rotation: 0,
            cut: None,
            scale_cut: true,
            scale_ratio: None,
            debug_screenshots_dir: None,
            debug_screenshots_prefix: "screenshot_".to_string(),
        }
    }
}

impl CaptureSettings {
    /// Load settings from a JSON file; missing fields take their defaults
    pub async fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read capture settings {}", path.display()))?;
        let settings: CaptureSettings = serde_json::from_str(&content)
            .with_context(|| format!("Invalid capture settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the stitching loop cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stitching_overlap < 0 {
            anyhow::bail!("stitching_overlap cannot be negative");
        }
        if self.rotation % 90 != 0 {
            anyhow::bail!("rotation must be a multiple of 90 degrees");
        }
        if let Some(ratio) = self.scale_ratio {
            if !(ratio.is_finite() && ratio > 0.0) {
                anyhow::bail!("scale_ratio must be positive");
            }
        }
        Ok(())
    }

    pub fn wait_before_screenshots(&self) -> Duration {
        Duration::from_millis(self.wait_before_screenshots_ms)
    }
}

/// Resolved collaborators for one call to [`capture`].
#[derive(Clone)]
pub struct CaptureContext {
    /// The frame to capture; empty for the top-level page.
    pub frame_chain: FrameChain,
    pub stitch_mode: StitchMode,
    /// `None` detects the ratio from the page.
    pub scale_provider_factory: Option<Arc<dyn ScaleProviderFactory>>,
    pub cut_provider: Arc<dyn CutProvider>,
    pub stitching_overlap: i32,
    pub wait_before_screenshots: Duration,
    pub hide_scrollbars: bool,
    pub rotation: i32,
    pub debug_screenshots: Arc<dyn DebugScreenshots>,
}

impl CaptureContext {
    pub fn from_settings(settings: &CaptureSettings, frame_chain: FrameChain) -> Self {
        let debug_screenshots: Arc<dyn DebugScreenshots> = match &settings.debug_screenshots_dir
        {
            Some(directory) => Arc::new(FileDebugScreenshots::new(
                directory,
                settings.debug_screenshots_prefix.clone(),
            )),
            None => Arc::new(NullDebugScreenshots),
        };

        Self {
            frame_chain,
            stitch_mode: settings.stitch_mode,
            scale_provider_factory: settings
                .scale_ratio
                .map(|ratio| {
                    Arc::new(FixedScaleProviderFactory::new(ratio)) as Arc<dyn ScaleProviderFactory>
                }),
            cut_provider: Arc::from(cut_provider_for(settings.cut, settings.scale_cut)),
            stitching_overlap: settings.stitching_overlap,
            wait_before_screenshots: settings.wait_before_screenshots(),
            hide_scrollbars: settings.hide_scrollbars,
            rotation: settings.rotation,
            debug_screenshots,
        }
    }
}

impl Default for CaptureContext {
    fn default() -> Self {
        Self::from_settings(&CaptureSettings::default(), FrameChain::new())
    }
}

/// Captures `region` of the context selected by `context.frame_chain`.
///
/// An empty region captures the whole scrollable content of that context. Any other region is
/// stitched on its own, scrolling only as far as it reaches. The driver is switched back to
/// its original frame chain afterwards.
pub async fn capture(
    driver: &mut TrackedDriver,
    region: Region,
    context: &CaptureContext,
) -> Result<Image> {
    let original_chain = driver.frame_chain().clone();
    let scale_provider_factory = resolve_scale_provider_factory(driver, context).await?;

    let result = async {
        driver.switch_to_frame_chain(&context.frame_chain).await?;
        capture_current_context(driver, region, context, scale_provider_factory.as_ref()).await
    }
    .await;

    if let Err(e) = driver.switch_to_frame_chain(&original_chain).await {
        log::warn!("Failed to switch back to the original frame chain: {}", e);
    }

    result
}

/// The whole scrollable top-level page.
pub async fn capture_full_page(
    driver: &mut TrackedDriver,
    settings: &CaptureSettings,
) -> Result<Image> {
    capture(
        driver,
        Region::EMPTY,
        &CaptureContext::from_settings(settings, FrameChain::new()),
    )
    .await
}

/// The whole scrollable content of the frame `frame_chain` points at.
pub async fn capture_frame(
    driver: &mut TrackedDriver,
    frame_chain: &FrameChain,
    settings: &CaptureSettings,
) -> Result<Image> {
    if frame_chain.is_empty() {
        return Err(CaptureError::NoFrames);
    }
    capture(
        driver,
        Region::EMPTY,
        &CaptureContext::from_settings(settings, frame_chain.clone()),
    )
    .await
}

/// One screenshot of what is visible now, cut and scaled to CSS pixels.
pub async fn capture_viewport(
    driver: &mut TrackedDriver,
    settings: &CaptureSettings,
) -> Result<Image> {
    let context = CaptureContext::from_settings(settings, driver.frame_chain().clone());
    let scale_provider_factory = resolve_scale_provider_factory(driver, &context).await?;
    let image_provider = ScreenshotImageProvider::new(driver.remote(), context.rotation);
    let debug = context.debug_screenshots.as_ref();

    let original = image_provider.image().await?;
    save_quietly(debug, &original, "original").await;

    let scale_ratio = scale_provider_factory
        .scale_provider(original.width())
        .scale_ratio();
    let image = context.cut_provider.scale(1.0 / scale_ratio).cut(&original)?;
    save_quietly(debug, &image, "cut").await;

    if scale_ratio == 1.0 {
        return Ok(image);
    }
    let scaled = image.scale(scale_ratio)?;
    save_quietly(debug, &scaled, "scaled").await;
    Ok(scaled)
}

/// The full scrollable content of `element`, which lives in the driver's current context.
///
/// The page is scrolled so the element is in view, then the element itself is scrolled to
/// capture its overflowing content.
pub async fn capture_element(
    driver: &mut TrackedDriver,
    element: Arc<dyn RemoteElement>,
    settings: &CaptureSettings,
) -> Result<Image> {
    let context = CaptureContext::from_settings(settings, driver.frame_chain().clone());
    let scale_provider_factory = resolve_scale_provider_factory(driver, &context).await?;
    let inspector = ElementInspector::new(element.clone());
    let bounds = inspector.bounds().await?;
    log::info!(
        "Capturing element {} at {}",
        element.id(),
        bounds.region()
    );

    let mut page_provider = ScrollPositionProvider::new(driver.remote());
    let page_state = page_provider.state().await?;
    page_provider
        .set_position(Location::new(bounds.left, bounds.top))
        .await?;

    let previous_overflow = if context.hide_scrollbars {
        match inspector.set_overflow("hidden").await {
            Ok(previous) => Some(previous),
            Err(e) => {
                log::warn!("Failed to hide element scrollbars: {}", e);
                None
            }
        }
    } else {
        None
    };

    let result = async {
        // The hidden overflow may have changed the client area.
        let bounds = inspector.bounds().await?;
        let mut origin_provider = ElementPositionProvider::new(element.clone());
        let mut stitching_provider = ElementPositionProvider::new(element.clone());
        stitch_current_context(
            driver,
            bounds.client_region(),
            Region::EMPTY,
            &context,
            scale_provider_factory.as_ref(),
            &mut origin_provider,
            &mut stitching_provider,
        )
        .await
    }
    .await;

    if let Some(previous) = previous_overflow {
        if let Err(e) = inspector.set_overflow(&previous).await {
            log::warn!("Failed to restore element overflow: {}", e);
        }
    }
    if let Err(e) = page_provider.restore_state(&page_state).await {
        log::warn!("Failed to restore page scroll position: {}", e);
    }

    result
}

async fn resolve_scale_provider_factory(
    driver: &mut TrackedDriver,
    context: &CaptureContext,
) -> Result<Arc<dyn ScaleProviderFactory>> {
    if let Some(factory) = &context.scale_provider_factory {
        return Ok(factory.clone());
    }

    // The scale is a property of the top-level page.
    if !driver.frame_chain().is_empty() {
        let chain = driver.frame_chain().clone();
        driver.switch_to_default_content().await?;
        let factory = detect_scale_provider_factory(driver).await;
        driver.switch_to_frame_chain(&chain).await?;
        return Ok(factory);
    }

    Ok(detect_scale_provider_factory(driver).await)
}

async fn detect_scale_provider_factory(driver: &TrackedDriver) -> Arc<dyn ScaleProviderFactory> {
    let remote = driver.remote();
    let page_provider = ScrollPositionProvider::new(remote.clone());
    scale_provider_factory_for(remote.as_ref(), &page_provider).await
}

async fn capture_current_context(
    driver: &mut TrackedDriver,
    region: Region,
    context: &CaptureContext,
    scale_provider_factory: &dyn ScaleProviderFactory,
) -> Result<Image> {
    // A frame is captured through its viewport inside the parent's screenshot.
    let frame_region = match driver.frame_chain().current_frame() {
        Some(frame) => Region::from_parts(Location::ZERO, frame.inner_size()),
        None => Region::EMPTY,
    };

    if context.hide_scrollbars {
        if let Err(e) = driver.hide_scrollbars().await {
            log::warn!("Failed to hide scrollbars: {}", e);
        }
    }

    let remote = driver.remote();
    let mut origin_provider = ScrollPositionProvider::new(remote.clone());
    let mut stitching_provider = stitching_provider(context.stitch_mode, remote);

    let stitched = stitch_current_context(
        driver,
        frame_region,
        region,
        context,
        scale_provider_factory,
        &mut origin_provider,
        stitching_provider.as_mut(),
    )
    .await;

    if context.hide_scrollbars {
        if let Err(e) = driver.restore_scrollbars().await {
            log::warn!("Failed to restore scrollbars: {}", e);
        }
    }

    stitched
}

async fn stitch_current_context(
    driver: &TrackedDriver,
    region: Region,
    full_area: Region,
    context: &CaptureContext,
    scale_provider_factory: &dyn ScaleProviderFactory,
    origin_provider: &mut dyn PositionProvider,
    stitching_provider: &mut dyn PositionProvider,
) -> Result<Image> {
    let remote = driver.remote();
    let user_agent = detect_user_agent(remote.as_ref()).await;
    let compensation = compensation_for(&user_agent, driver.frame_chain());
    let image_provider = ScreenshotImageProvider::new(remote, context.rotation);

    let algorithm = FullPageCaptureAlgorithm {
        driver,
        image_provider: &image_provider,
        debug_screenshots: context.debug_screenshots.as_ref(),
        scale_provider_factory,
        cut_provider: context.cut_provider.as_ref(),
        compensation: compensation.as_ref(),
        stitching_overlap: context.stitching_overlap,
        wait_before_screenshots: context.wait_before_screenshots,
    };

    algorithm
        .stitched_region(region, full_area, origin_provider, stitching_provider)
        .await
}
