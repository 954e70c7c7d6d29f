//! Conversions between DOM, scrolled-DOM and screenshot pixel coordinates.

use crate::driver::{parse_location, TrackedDriver};
use crate::error::{CaptureError, Result};
use crate::frames::FrameChain;
use crate::geometry::{Location, Region, RectangleSize};
use crate::scripts;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatesType {
    /// Raw DOM rect of the current context, ignoring its scroll.
    ContextAsIs,
    /// DOM rect adjusted by the current frame's scroll offset.
    ContextRelative,
    /// Pixels inside a captured (already scaled) image.
    ScreenshotAsIs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotType {
    /// What the browser showed in its viewport.
    Viewport,
    /// The whole scrollable content of the top-level context.
    EntirePage,
}

/// Frame and scroll state frozen at the moment a screenshot was taken.
///
/// Coordinates are only convertible through the context of the screenshot they belong to.
#[derive(Debug, Clone)]
pub struct ScreenshotContext {
    frame_chain: FrameChain,
    screenshot_type: ScreenshotType,
    image_size: RectangleSize,
    current_frame_scroll: Location,
    frame_location_in_screenshot: Location,
    frame_window: Region,
}

impl ScreenshotContext {
    /// `image_size` is in CSS pixels, i.e. after device pixel ratio scaling.
    pub fn new(
        frame_chain: FrameChain,
        screenshot_type: ScreenshotType,
        image_size: RectangleSize,
        current_frame_scroll: Location,
    ) -> Result<Self> {
        let frame_location_in_screenshot =
            Self::frame_location_in_screenshot(&frame_chain, screenshot_type);
        let image_bounds = Region::from_parts(Location::ZERO, image_size);

        let frame_window = if frame_chain.is_empty() {
            image_bounds
        } else {
            Region::from_parts(
                frame_location_in_screenshot,
                frame_chain.current_frame_inner_size()?,
            )
            .intersect(&image_bounds)
        };

        if frame_window.is_empty() {
            return Err(CaptureError::CoordinatesConversion(
                "Got empty frame window for screenshot!".to_string(),
            ));
        }

        Ok(Self {
            frame_chain,
            screenshot_type,
            image_size,
            current_frame_scroll,
            frame_location_in_screenshot,
            frame_window,
        })
    }

    /// Snapshots the driver's current frame chain and scroll position.
    pub async fn capture(
        driver: &TrackedDriver,
        screenshot_type: ScreenshotType,
        image_size: RectangleSize,
    ) -> Result<Self> {
        let scroll = match driver
            .execute_script(scripts::GET_SCROLL_POSITION, vec![])
            .await
            .and_then(|value| parse_location(&value))
        {
            Ok(scroll) => scroll,
            Err(e) => {
                log::warn!("Could not read frame scroll position, assuming (0, 0): {}", e);
                Location::ZERO
            }
        };

        Self::new(
            driver.frame_chain().clone(),
            screenshot_type,
            image_size,
            scroll,
        )
    }

    /// Where the innermost frame's content origin sits in a screenshot.
    ///
    /// The top-level scroll only shifts frames in viewport screenshots; an entire-page
    /// screenshot already starts at the document origin.
    pub fn frame_location_in_screenshot(
        frame_chain: &FrameChain,
        screenshot_type: ScreenshotType,
    ) -> Location {
        frame_chain
            .frames()
            .iter()
            .enumerate()
            .fold(Location::ZERO, |acc, (index, frame)| {
                let location = acc.offset_by(frame.location());
                if index > 0 || screenshot_type == ScreenshotType::Viewport {
                    location.offset_by(frame.original_scroll_location().negated())
                } else {
                    location
                }
            })
    }

    pub fn frame_chain(&self) -> &FrameChain {
        &self.frame_chain
    }

    pub fn screenshot_type(&self) -> ScreenshotType {
        self.screenshot_type
    }

    pub fn image_size(&self) -> RectangleSize {
        self.image_size
    }

    pub fn frame_window(&self) -> Region {
        self.frame_window
    }

    pub fn current_frame_scroll(&self) -> Location {
        self.current_frame_scroll
    }

    pub fn location_in_screenshot(&self) -> Location {
        self.frame_location_in_screenshot
    }

    /// Fails when the live frame chain no longer matches the one this screenshot saw.
    pub fn ensure_current(&self, live_chain: &FrameChain) -> Result<()> {
        if self.frame_chain.same_frames(live_chain) {
            Ok(())
        } else {
            Err(CaptureError::CoordinatesConversion(format!(
                "Screenshot taken in a frame chain of depth {} cannot convert coordinates for a chain of depth {}",
                self.frame_chain.len(),
                live_chain.len()
            )))
        }
    }

    pub fn convert_location(
        &self,
        location: Location,
        from: CoordinatesType,
        to: CoordinatesType,
    ) -> Result<Location> {
        use CoordinatesType::*;

        let scroll = self.current_frame_scroll;
        let frame = self.frame_location_in_screenshot;

        let converted = match (from, to) {
            (a, b) if a == b => location,
            (ContextAsIs, ContextRelative) => location.offset_by(scroll),
            (ContextAsIs, ScreenshotAsIs) => location.offset_by(frame),
            (ContextRelative, ContextAsIs) => location.offset_by(scroll.negated()),
            (ContextRelative, ScreenshotAsIs) => {
                location.offset_by(scroll.negated()).offset_by(frame)
            }
            (ScreenshotAsIs, ContextAsIs) => location.offset_by(frame.negated()),
            (ScreenshotAsIs, ContextRelative) => {
                location.offset_by(frame.negated()).offset_by(scroll)
            }
            (from, to) => {
                return Err(CoordinatesConversion(from, to).into());
            }
        };

        Ok(converted)
    }

    pub fn convert_region_location(
        &self,
        region: Region,
        from: CoordinatesType,
        to: CoordinatesType,
    ) -> Result<Region> {
        let location = self.convert_location(region.location, from, to)?;
        Ok(region.with_location(location))
    }

    /// The part of `region` visible in this screenshot, expressed in `to` coordinates.
    ///
    /// Empty input and empty intersections are returned without conversion.
    pub fn intersected_region(
        &self,
        region: Region,
        from: CoordinatesType,
        to: CoordinatesType,
    ) -> Result<Region> {
        if region.is_empty() {
            return Ok(region);
        }

        let in_screenshot =
            self.convert_region_location(region, from, CoordinatesType::ScreenshotAsIs)?;

        let visible = match from {
            CoordinatesType::ContextAsIs | CoordinatesType::ContextRelative => {
                in_screenshot.intersect(&self.frame_window)
            }
            CoordinatesType::ScreenshotAsIs => in_screenshot
                .intersect(&Region::from_parts(Location::ZERO, self.image_size)),
        };

        if visible.is_empty() {
            return Ok(visible);
        }

        self.convert_region_location(visible, CoordinatesType::ScreenshotAsIs, to)
    }
}

/// An unsupported pair of coordinate spaces.
struct CoordinatesConversion(CoordinatesType, CoordinatesType);

impl From<CoordinatesConversion> for CaptureError {
    fn from(pair: CoordinatesConversion) -> Self {
        CaptureError::CoordinatesConversion(format!(
            "Cannot convert from {:?} to {:?}",
            pair.0, pair.1
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RemoteElement;
    use crate::frames::Frame;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct StubElement(&'static str);

    #[async_trait]
    impl RemoteElement for StubElement {
        fn id(&self) -> &str {
            self.0
        }

        async fn call(&self, _script: &str, _args: Vec<Value>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn chain_with(frames: &[(&'static str, Location, Location)]) -> FrameChain {
        let mut chain = FrameChain::new();
        for (id, location, scroll) in frames {
            chain.push(Frame::new(
                Arc::new(StubElement(id)),
                *location,
                RectangleSize::new(400, 300),
                RectangleSize::new(380, 280),
                *scroll,
                String::new(),
            ));
        }
        chain
    }

    const TYPES: [CoordinatesType; 3] = [
        CoordinatesType::ContextAsIs,
        CoordinatesType::ContextRelative,
        CoordinatesType::ScreenshotAsIs,
    ];

    #[test]
    fn test_frame_location_in_viewport_screenshot() {
        let chain = chain_with(&[
            ("outer", Location::new(100, 400), Location::new(0, 300)),
            ("inner", Location::new(20, 30), Location::new(0, 10)),
        ]);
        assert_eq!(
            ScreenshotContext::frame_location_in_screenshot(&chain, ScreenshotType::Viewport),
            Location::new(120, 120)
        );
        assert_eq!(
            ScreenshotContext::frame_location_in_screenshot(&chain, ScreenshotType::EntirePage),
            Location::new(120, 420)
        );
    }

    #[test]
    fn test_conversions_in_default_content() {
        let context = ScreenshotContext::new(
            FrameChain::new(),
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::new(0, 250),
        )
        .unwrap();

        let location = Location::new(10, 300);
        assert_eq!(
            context
                .convert_location(
                    location,
                    CoordinatesType::ContextRelative,
                    CoordinatesType::ScreenshotAsIs
                )
                .unwrap(),
            Location::new(10, 50)
        );
        assert_eq!(
            context
                .convert_location(
                    location,
                    CoordinatesType::ContextAsIs,
                    CoordinatesType::ContextRelative
                )
                .unwrap(),
            Location::new(10, 550)
        );
    }

    #[test]
    fn test_round_trip_for_every_pair() {
        let chain = chain_with(&[("outer", Location::new(30, 60), Location::new(5, 15))]);
        let context = ScreenshotContext::new(
            chain,
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::new(7, 42),
        )
        .unwrap();

        let samples = [
            Location::ZERO,
            Location::new(13, -9),
            Location::new(-400, 1200),
        ];
        for from in TYPES {
            for to in TYPES {
                for location in samples {
                    let there = context.convert_location(location, from, to).unwrap();
                    let back = context.convert_location(there, to, from).unwrap();
                    assert_eq!(back, location, "{:?} -> {:?}", from, to);
                }
            }
        }
    }

    #[test]
    fn test_intersected_region_clips_to_frame_window() {
        let chain = chain_with(&[("outer", Location::new(100, 100), Location::ZERO)]);
        let context = ScreenshotContext::new(
            chain,
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::ZERO,
        )
        .unwrap();
        assert_eq!(context.frame_window(), Region::new(100, 100, 380, 280));

        let region = Region::new(300, 200, 200, 200);
        let in_screenshot = context
            .intersected_region(
                region,
                CoordinatesType::ContextRelative,
                CoordinatesType::ScreenshotAsIs,
            )
            .unwrap();
        assert_eq!(in_screenshot, Region::new(400, 300, 80, 80));

        let back = context
            .intersected_region(
                region,
                CoordinatesType::ContextRelative,
                CoordinatesType::ContextRelative,
            )
            .unwrap();
        assert_eq!(back, Region::new(300, 200, 80, 80));
    }

    #[test]
    fn test_intersected_region_of_empty_region_is_untouched() {
        let context = ScreenshotContext::new(
            FrameChain::new(),
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::new(0, 100),
        )
        .unwrap();

        let empty = Region::new(50, 50, 0, 10);
        let result = context
            .intersected_region(
                empty,
                CoordinatesType::ContextRelative,
                CoordinatesType::ScreenshotAsIs,
            )
            .unwrap();
        assert_eq!(result, empty);
    }

    #[test]
    fn test_intersected_region_outside_screenshot_is_empty() {
        let context = ScreenshotContext::new(
            FrameChain::new(),
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::ZERO,
        )
        .unwrap();

        let result = context
            .intersected_region(
                Region::new(0, 900, 100, 100),
                CoordinatesType::ContextRelative,
                CoordinatesType::ContextAsIs,
            )
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_frame_outside_image_fails() {
        let chain = chain_with(&[("outer", Location::new(0, 900), Location::ZERO)]);
        let result = ScreenshotContext::new(
            chain,
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::ZERO,
        );
        assert!(matches!(
            result,
            Err(CaptureError::CoordinatesConversion(_))
        ));
    }

    #[test]
    fn test_stale_chain_is_rejected() {
        let chain = chain_with(&[("outer", Location::new(10, 10), Location::ZERO)]);
        let context = ScreenshotContext::new(
            chain.clone(),
            ScreenshotType::Viewport,
            RectangleSize::new(800, 600),
            Location::ZERO,
        )
        .unwrap();

        assert!(context.ensure_current(&chain).is_ok());
        let newer = chain_with(&[
            ("outer", Location::new(10, 10), Location::ZERO),
            ("inner", Location::new(1, 1), Location::ZERO),
        ]);
        assert!(matches!(
            context.ensure_current(&newer),
            Err(CaptureError::CoordinatesConversion(_))
        ));
    }
}
