//! Position provider and frame tracking tests against the in-memory browser


use mock_browser::MockBrowser;
use robert_capture::positioning::{
    entire_size_or_viewport, CssTranslatePositionProvider, ElementPositionProvider,
    ScrollPositionProvider,
};
use robert_capture::{
    CaptureError, Location, PositionMemento, PositionProvider, Region, RectangleSize,
    TrackedDriver,
};

#[tokio::test]
async fn test_scroll_provider_clamps_to_content() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(1000, 2000));
    let mut provider = ScrollPositionProvider::new(browser.driver());

    provider.set_position(Location::new(50, 700)).await?;
    assert_eq!(provider.current_position().await?, Location::new(50, 700));

    provider.set_position(Location::new(1_000_000, 1_000_000)).await?;
    assert_eq!(provider.current_position().await?, Location::new(200, 1400));

    assert_eq!(provider.entire_size().await?, RectangleSize::new(1000, 2000));
    assert!(provider.clamps_to_content());
    Ok(())
}

#[tokio::test]
async fn test_scroll_provider_restores_saved_state() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 2000));
    browser.state().top.scroll = Location::new(0, 321);
    let mut provider = ScrollPositionProvider::new(browser.driver());

    let state = provider.state().await?;
    assert_eq!(state, PositionMemento::Location(Location::new(0, 321)));

    provider.set_position(Location::new(0, 1000)).await?;
    provider.restore_state(&state).await?;

    assert_eq!(browser.state().top.scroll, Location::new(0, 321));
    Ok(())
}

#[tokio::test]
async fn test_entire_size_falls_back_to_viewport() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(640, 480), RectangleSize::new(640, 3000));
    browser.state().fail_entire_size = true;
    let driver = browser.driver();
    let provider = ScrollPositionProvider::new(driver.clone());

    assert!(provider.entire_size().await.is_err());
    let size = entire_size_or_viewport(&provider, driver.as_ref()).await?;

    assert_eq!(size, RectangleSize::new(640, 480));
    Ok(())
}

#[tokio::test]
async fn test_css_provider_translates_and_restores() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 2000));
    let mut provider = CssTranslatePositionProvider::new(browser.driver());

    let state = provider.state().await?;
    provider.set_position(Location::new(0, 5000)).await?;

    // Translation is not bounded by the content.
    assert_eq!(provider.current_position().await?, Location::new(0, 5000));
    assert_eq!(browser.state().top.translation(), Location::new(0, 5000));
    assert!(!provider.clamps_to_content());

    provider.restore_state(&state).await?;
    assert_eq!(browser.state().top.translation(), Location::ZERO);
    assert_eq!(provider.current_position().await?, Location::ZERO);
    Ok(())
}

#[tokio::test]
async fn test_css_provider_rejects_inconsistent_transforms() {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 2000));
    {
        let mut state = browser.state();
        state
            .top
            .transforms
            .insert("transform".to_string(), "translate(0px, -10px)".to_string());
        state
            .top
            .transforms
            .insert("webkitTransform".to_string(), "translate(0px, -20px)".to_string());
    }
    let provider = CssTranslatePositionProvider::new(browser.driver());

    let result = provider.state().await;

    assert!(matches!(result, Err(CaptureError::StitchConsistency(_))));
}

#[tokio::test]
async fn test_element_provider_scrolls_the_element() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 600))
        .with_scrollable_element("#list", Region::new(0, 0, 300, 200), RectangleSize::new(300, 900));
    let driver = TrackedDriver::new(browser.driver());
    let element = driver.find_element("#list").await?;
    let mut provider = ElementPositionProvider::new(element);

    let state = provider.state().await?;
    provider.set_position(Location::new(0, 2000)).await?;

    assert_eq!(provider.current_position().await?, Location::new(0, 700));
    assert_eq!(provider.entire_size().await?, RectangleSize::new(300, 900));

    provider.restore_state(&state).await?;
    assert_eq!(provider.current_position().await?, Location::ZERO);
    Ok(())
}

#[tokio::test]
async fn test_leaving_a_frame_restores_parent_scroll_and_overflow() -> anyhow::Result<()> {
    let browser = MockBrowser::new(RectangleSize::new(800, 600), RectangleSize::new(800, 2000))
        .with_frame("#frame", Region::new(0, 400, 300, 200), RectangleSize::new(300, 800));
    browser.state().top.scroll = Location::new(0, 150);
    let mut driver = TrackedDriver::new(browser.driver());

    let frame = driver.find_element("#frame").await?;
    driver.switch_to_frame(frame).await?;

    let current = driver.frame_chain().current_frame().expect("entered a frame");
    assert_eq!(current.location(), Location::new(0, 400));
    assert_eq!(current.original_scroll_location(), Location::new(0, 150));

    driver.hide_scrollbars().await?;
    assert_eq!(
        browser.state().frame.as_ref().map(|f| f.document.overflow.clone()),
        Some("hidden".to_string())
    );

    // Something scrolled the parent while we were inside the frame.
    browser.state().top.scroll = Location::ZERO;
    driver.switch_to_parent_frame().await?;

    let state = browser.state();
    assert!(!state.in_frame);
    assert!(driver.frame_chain().is_empty());
    assert_eq!(state.top.scroll, Location::new(0, 150));
    assert_eq!(
        state.frame.as_ref().map(|f| f.document.overflow.clone()),
        Some(String::new())
    );
    Ok(())
}
