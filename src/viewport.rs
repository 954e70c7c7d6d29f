//! Measuring the viewport and negotiating the browser window to a required viewport size.

use crate::driver::{parse_size, RemoteDriver};
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, RectangleSize};
use crate::scripts;
use std::collections::HashSet;
use std::time::Duration;

/// Pause after each window resize so the page can reflow before the viewport is measured.
const RESIZE_SETTLE: Duration = Duration::from_millis(50);

/// How many broad `window + diff` passes run before falling back to per-pixel nudging.
const BROAD_PASSES: usize = 2;

/// Larger residual differences are not a rounding problem, so per-pixel nudging won't help.
const MAX_PER_PIXEL_DIFF: i32 = 3;

/// Current inner size of the browser window in CSS pixels.
pub async fn viewport_size(driver: &dyn RemoteDriver) -> Result<RectangleSize> {
    let value = driver
        .execute_script(scripts::GET_VIEWPORT_SIZE, vec![])
        .await
        .map_err(|e| CaptureError::driver("read viewport size", e))?;
    parse_size(&value)
}

/// Resizes the browser window until its viewport is exactly `required`.
pub async fn set_viewport_size(driver: &dyn RemoteDriver, required: RectangleSize) -> Result<()> {
    if required.is_empty() {
        return Err(CaptureError::ViewportSizing(format!(
            "Invalid viewport size {}",
            required
        )));
    }

    let actual = viewport_size(driver).await?;
    if actual == required {
        log::debug!("Viewport already {}", required);
        return Ok(());
    }
    log::info!("Setting viewport size to {} (currently {})", required, actual);

    // Some window managers refuse to grow a window that would leave the screen.
    if let Err(e) = driver.set_window_position(Location::ZERO).await {
        log::warn!("Failed to move browser window to (0, 0): {}", e);
    }

    for pass in 1..=BROAD_PASSES {
        let window = window_size(driver).await?;
        let actual = viewport_size(driver).await?;
        if actual == required {
            return Ok(());
        }
        let target = RectangleSize::new(
            window.width + required.width - actual.width,
            window.height + required.height - actual.height,
        );
        log::debug!("Resize pass {}: window {} -> {}", pass, window, target);
        resize_window(driver, target).await?;
    }

    let actual = viewport_size(driver).await?;
    if actual == required {
        return Ok(());
    }

    let width_diff = required.width - actual.width;
    let height_diff = required.height - actual.height;
    if width_diff.abs() > MAX_PER_PIXEL_DIFF || height_diff.abs() > MAX_PER_PIXEL_DIFF {
        return Err(CaptureError::ViewportSizing(format!(
            "Viewport is {} after resizing, required {}",
            actual, required
        )));
    }

    log::info!(
        "Viewport off by ({}, {}), probably due to zoom; adjusting one pixel at a time",
        width_diff,
        height_diff
    );
    per_pixel_resize(driver, required, retry_budget(width_diff, height_diff)).await
}

async fn per_pixel_resize(
    driver: &dyn RemoteDriver,
    required: RectangleSize,
    budget: usize,
) -> Result<()> {
    let mut requested = HashSet::new();

    for _ in 0..budget {
        let window = window_size(driver).await?;
        let actual = viewport_size(driver).await?;
        if actual == required {
            return Ok(());
        }

        let next = RectangleSize::new(
            window.width + (required.width - actual.width).signum(),
            window.height + (required.height - actual.height).signum(),
        );
        if !requested.insert(next) {
            log::warn!(
                "Window size {} was already tried, accepting viewport {} for {}",
                next,
                actual,
                required
            );
            return Ok(());
        }
        resize_window(driver, next).await?;
    }

    if viewport_size(driver).await? == required {
        return Ok(());
    }

    Err(CaptureError::ViewportSizing(
        "zoom workaround failed".to_string(),
    ))
}

/// `|widthDiff × heightDiff| × 2`, with an axis that is already right counting as 1.
fn retry_budget(width_diff: i32, height_diff: i32) -> usize {
    let width = width_diff.unsigned_abs().max(1) as usize;
    let height = height_diff.unsigned_abs().max(1) as usize;
    width * height * 2
}

async fn window_size(driver: &dyn RemoteDriver) -> Result<RectangleSize> {
    driver
        .window_size()
        .await
        .map_err(|e| CaptureError::driver("read window size", e))
}

async fn resize_window(driver: &dyn RemoteDriver, size: RectangleSize) -> Result<()> {
    driver
        .set_window_size(size)
        .await
        .map_err(|e| CaptureError::driver(format!("set window size {}", size), e))?;
    tokio::time::sleep(RESIZE_SETTLE).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_budget() {
        assert_eq!(retry_budget(2, 3), 12);
        assert_eq!(retry_budget(-2, 3), 12);
        assert_eq!(retry_budget(0, 3), 6);
        assert_eq!(retry_budget(0, 0), 2);
    }
}
