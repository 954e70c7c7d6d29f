//! Captures sharing one browser session


use mock_browser::{page_pixel, MockBrowser};
use robert_capture::{
    capture_full_page, CaptureSession, CaptureSettings, Image, RectangleSize, Result,
};
use std::time::Duration;

fn settling_settings() -> CaptureSettings {
    CaptureSettings {
        wait_before_screenshots_ms: 5,
        ..CaptureSettings::default()
    }
}

async fn capture_on(session: &CaptureSession, settings: &CaptureSettings) -> Result<Image> {
    let mut driver = session.acquire().await;
    capture_full_page(&mut driver, settings).await
}

#[tokio::test]
async fn test_concurrent_captures_on_one_session_do_not_interleave() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 3000));
    let session = CaptureSession::new(browser.driver());
    let settings = settling_settings();

    let (first, second) = tokio::join!(
        capture_on(&session, &settings),
        capture_on(&session, &settings)
    );

    for image in [first?, second?] {
        assert_eq!(image.size(), RectangleSize::new(800, 3000));
        for y in (0..image.height()).step_by(13) {
            for x in (0..image.width()).step_by(13) {
                assert_eq!(
                    image.pixel(x, y),
                    page_pixel(x as i32, y as i32),
                    "pixel mismatch at ({}, {})",
                    x,
                    y
                );
            }
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_acquire_waits_for_the_running_capture() {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 600));
    let session = CaptureSession::new(browser.driver());

    let held = session.acquire().await;
    let blocked = tokio::time::timeout(Duration::from_millis(20), session.acquire()).await;
    assert!(blocked.is_err());

    drop(held);
    let acquired = tokio::time::timeout(Duration::from_millis(20), session.acquire()).await;
    assert!(acquired.is_ok());
}
