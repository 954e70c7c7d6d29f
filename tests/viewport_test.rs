//! Viewport negotiation tests
//!
//! The in-memory browser reports `viewport = floor((window - chrome) * zoom)`, which lets these
//! tests reproduce browsers whose window and viewport don't change one to one.


use mock_browser::MockBrowser;
use robert_capture::{set_viewport_size, viewport_size, CaptureError, RectangleSize};

fn zoomed_browser(window: RectangleSize, zoom: f64) -> MockBrowser {
    let browser = MockBrowser::new(RectangleSize::new(100, 100), RectangleSize::new(100, 100));
    {
        let mut state = browser.state();
        state.window = window;
        state.zoom = zoom;
    }
    browser
}

#[tokio::test]
async fn test_viewport_already_matching_is_left_alone() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 600));
    let driver = browser.driver();

    set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await?;

    assert!(browser.state().window_requests.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_window_is_grown_by_the_viewport_difference() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(780, 580), RectangleSize::new(800, 600));
    let driver = browser.driver();

    set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await?;

    assert_eq!(viewport_size(driver.as_ref()).await?, RectangleSize::new(800, 600));
    assert_eq!(
        browser.state().window_requests,
        vec![RectangleSize::new(816, 688)]
    );
    Ok(())
}

#[tokio::test]
async fn test_zoomed_browser_converges_pixel_by_pixel() -> anyhow::Result<()> {
    let browser = zoomed_browser(RectangleSize::new(1024, 768), 1.1);
    let driver = browser.driver();

    set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await?;

    assert_eq!(viewport_size(driver.as_ref()).await?, RectangleSize::new(800, 600));
    // Two broad passes, then single pixel nudges.
    assert_eq!(
        browser.state().window_requests,
        vec![
            RectangleSize::new(716, 620),
            RectangleSize::new(746, 635),
            RectangleSize::new(745, 634),
            RectangleSize::new(744, 634),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_zoom_workaround_gives_up_after_its_budget() {
    let browser = zoomed_browser(RectangleSize::new(1024, 768), 1.1);
    let driver = browser.driver();

    let result = set_viewport_size(driver.as_ref(), RectangleSize::new(1000, 700)).await;

    match result {
        Err(CaptureError::ViewportSizing(message)) => {
            assert_eq!(message, "zoom workaround failed")
        }
        other => panic!("expected a viewport sizing error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_large_residual_difference_is_an_error() {
    let browser = zoomed_browser(RectangleSize::new(1024, 768), 1.25);
    let driver = browser.driver();

    let result = set_viewport_size(driver.as_ref(), RectangleSize::new(800, 600)).await;

    match result {
        Err(CaptureError::ViewportSizing(message)) => {
            assert!(message.contains("828x616"), "unexpected message: {}", message)
        }
        other => panic!("expected a viewport sizing error, got {:?}", other),
    }
    // No per-pixel nudging once the difference is too large.
    assert_eq!(browser.state().window_requests.len(), 2);
}

#[tokio::test]
async fn test_oscillating_window_size_is_accepted() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 600));
    browser.state().window_width_step = 4;
    let driver = browser.driver();

    // The window can only be 816 or 820 wide, so a viewport of 801 is unreachable.
    set_viewport_size(driver.as_ref(), RectangleSize::new(801, 600)).await?;

    assert_eq!(viewport_size(driver.as_ref()).await?, RectangleSize::new(800, 600));
    assert_eq!(browser.state().window_requests.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_empty_required_size_is_rejected() {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 600));
    let driver = browser.driver();

    let result = set_viewport_size(driver.as_ref(), RectangleSize::new(0, 600)).await;

    assert!(matches!(result, Err(CaptureError::ViewportSizing(_))));
    assert!(browser.state().window_requests.is_empty());
}
