//! Capture tests against a real headless Chrome
//!
//! Run with `cargo test -- --ignored` on a machine with Chrome installed.

mod test_server;

use robert_capture::{
    capture_element, capture_full_page, set_viewport_size, viewport_size, CaptureSettings,
    ChromeDriver, ConnectionMode, RectangleSize, RemoteDriver, TrackedDriver,
};
use std::sync::Arc;
use test_server::{TestServer, TALL_PAGE_HEIGHT};

/// Helper to create a headless driver for testing
async fn create_headless_driver() -> anyhow::Result<Arc<ChromeDriver>> {
    let driver = ChromeDriver::new(ConnectionMode::Sandboxed {
        chrome_path: None,
        no_sandbox: true,
        headless: true,
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to launch Chrome: {}", e))?;
    Ok(Arc::new(driver))
}

#[tokio::test]
#[ignore = "requires a local Chrome installation"]
async fn test_set_viewport_size_in_chrome() -> anyhow::Result<()> {
    let driver = create_headless_driver().await?;

    set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await?;

    assert_eq!(
        viewport_size(driver.as_ref()).await?,
        RectangleSize::new(800, 600)
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires a local Chrome installation"]
async fn test_full_page_capture_of_tall_page() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let driver = create_headless_driver().await?;

    set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await?;
    driver.navigate(&server.url("/tall")).await?;

    let mut tracked = TrackedDriver::new(driver.clone() as Arc<dyn RemoteDriver>);
    let image = capture_full_page(&mut tracked, &CaptureSettings::default()).await?;

    assert_eq!(image.width(), 800);
    assert_eq!(image.height(), TALL_PAGE_HEIGHT);

    // Stripes alternate every 200px.
    let red = image.pixel(400, 100);
    let blue = image.pixel(400, 300);
    assert_ne!(red, blue);
    assert_eq!(image.pixel(400, 1700), red);
    assert_eq!(image.pixel(400, 1900), blue);
    Ok(())
}

#[tokio::test]
#[ignore = "requires a local Chrome installation"]
async fn test_scrollable_element_capture_in_chrome() -> anyhow::Result<()> {
    let server = TestServer::start().await;
    server.wait_ready().await?;
    let driver = create_headless_driver().await?;

    set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await?;
    driver.navigate(&server.url("/scrollable")).await?;

    let mut tracked = TrackedDriver::new(driver.clone() as Arc<dyn RemoteDriver>);
    let element = tracked.find_element("#list").await?;
    let image = capture_element(&mut tracked, element, &CaptureSettings::default()).await?;

    assert_eq!(image.width(), 300);
    assert_eq!(image.height(), 600);
    Ok(())
}
