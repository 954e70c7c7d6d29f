//! The automation capability the capture engine consumes, and the frame-tracking wrapper
//! placed around it.

use crate::error::{CaptureError, Result};
use crate::frames::{Frame, FrameChain};
use crate::geometry::{Location, Region, RectangleSize};
use crate::scripts;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// One remote browser session.
///
/// Implemented once per automation backend (see [`crate::browser::chrome::ChromeDriver`]).
/// Scripts are function bodies; `args` are passed as `arguments`.
#[async_trait]
pub trait RemoteDriver: Send + Sync {
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// PNG encoded screenshot of the visible viewport.
    async fn take_screenshot(&self) -> Result<Vec<u8>>;

    async fn window_size(&self) -> Result<RectangleSize>;

    async fn set_window_size(&self, size: RectangleSize) -> Result<()>;

    async fn set_window_position(&self, location: Location) -> Result<()>;

    async fn switch_to_frame(&self, frame: &dyn RemoteElement) -> Result<()>;

    async fn switch_to_parent_frame(&self) -> Result<()>;

    async fn switch_to_default_content(&self) -> Result<()>;

    /// Finds an element by CSS selector in the current frame.
    async fn find_element(&self, selector: &str) -> Result<Arc<dyn RemoteElement>>;
}

/// A handle to an element living in the remote browser.
#[async_trait]
pub trait RemoteElement: Send + Sync {
    /// Stable identity, used to compare frame chains.
    fn id(&self) -> &str;

    /// Runs `script` with `this` bound to the element.
    async fn call(&self, script: &str, args: Vec<Value>) -> Result<Value>;
}

/// Geometry of an element in its own document's coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub client_left: i32,
    pub client_top: i32,
    pub client_width: i32,
    pub client_height: i32,
}

impl ElementBounds {
    pub fn region(&self) -> Region {
        Region::new(self.left, self.top, self.width, self.height)
    }

    /// The area inside the borders, excluding scrollbars.
    pub fn client_region(&self) -> Region {
        Region::new(
            self.left + self.client_left,
            self.top + self.client_top,
            self.client_width,
            self.client_height,
        )
    }
}

/// Capture-specific queries layered on top of a [`RemoteElement`].
#[derive(Clone)]
pub struct ElementInspector {
    element: Arc<dyn RemoteElement>,
}

impl ElementInspector {
    pub fn new(element: Arc<dyn RemoteElement>) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &Arc<dyn RemoteElement> {
        &self.element
    }

    pub async fn bounds(&self) -> Result<ElementBounds> {
        let value = self
            .element
            .call(scripts::ELEMENT_BOUNDS, vec![])
            .await
            .map_err(|e| CaptureError::driver("read element bounds", e))?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn computed_style(&self, property: &str) -> Result<String> {
        let value = self
            .element
            .call(scripts::ELEMENT_COMPUTED_STYLE, vec![Value::from(property)])
            .await
            .map_err(|e| CaptureError::driver(format!("read computed style {}", property), e))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn scroll_position(&self) -> Result<Location> {
        let value = self
            .element
            .call(scripts::ELEMENT_SCROLL_POSITION, vec![])
            .await
            .map_err(|e| CaptureError::driver("read element scroll position", e))?;
        parse_location(&value)
    }

    pub async fn scroll_to(&self, location: Location) -> Result<()> {
        self.element
            .call(
                scripts::ELEMENT_SCROLL_TO,
                vec![Value::from(location.x), Value::from(location.y)],
            )
            .await
            .map_err(|e| CaptureError::driver(format!("scroll element to {}", location), e))?;
        Ok(())
    }

    pub async fn scroll_size(&self) -> Result<RectangleSize> {
        let value = self
            .element
            .call(scripts::ELEMENT_SCROLL_SIZE, vec![])
            .await
            .map_err(|e| CaptureError::driver("read element scroll size", e))?;
        parse_size(&value)
    }

    /// Sets the element's inline overflow, returning the previous value.
    pub async fn set_overflow(&self, overflow: &str) -> Result<String> {
        let value = self
            .element
            .call(scripts::ELEMENT_SET_OVERFLOW, vec![Value::from(overflow)])
            .await
            .map_err(|e| CaptureError::driver(format!("set element overflow {}", overflow), e))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

/// Parses a `[x, y]` script result, rounding fractional pixels.
pub fn parse_location(value: &Value) -> Result<Location> {
    let (x, y) = parse_pair(value)?;
    Ok(Location::new(x, y))
}

/// Parses a `[width, height]` script result.
pub fn parse_size(value: &Value) -> Result<RectangleSize> {
    let (width, height) = parse_pair(value)?;
    Ok(RectangleSize::new(width, height))
}

fn parse_pair(value: &Value) -> Result<(i32, i32)> {
    let pair = value
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| CaptureError::Other(format!("Expected a pair of numbers, got {}", value)))?;

    let number = |item: &Value| {
        item.as_f64()
            .map(|n| n.round() as i32)
            .ok_or_else(|| CaptureError::Other(format!("Expected a number, got {}", item)))
    };

    Ok((number(&pair[0])?, number(&pair[1])?))
}

/// A [`RemoteDriver`] plus the chain of frames it is currently switched into.
///
/// All frame switching during a capture goes through this type so the chain always matches
/// the browser's real context.
pub struct TrackedDriver {
    driver: Arc<dyn RemoteDriver>,
    frame_chain: FrameChain,
    default_overflow: Option<String>,
}

impl TrackedDriver {
    pub fn new(driver: Arc<dyn RemoteDriver>) -> Self {
        Self {
            driver,
            frame_chain: FrameChain::new(),
            default_overflow: None,
        }
    }

    pub fn remote(&self) -> Arc<dyn RemoteDriver> {
        self.driver.clone()
    }

    pub fn frame_chain(&self) -> &FrameChain {
        &self.frame_chain
    }

    pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.driver.execute_script(script, args).await
    }

    pub async fn find_element(&self, selector: &str) -> Result<Arc<dyn RemoteElement>> {
        self.driver.find_element(selector).await
    }

    /// Enters the iframe `element` of the current context, recording its geometry.
    pub async fn switch_to_frame(&mut self, element: Arc<dyn RemoteElement>) -> Result<()> {
        let inspector = ElementInspector::new(element.clone());
        let bounds = inspector.bounds().await?;
        let parent_scroll = parse_location(
            &self
                .driver
                .execute_script(scripts::GET_SCROLL_POSITION, vec![])
                .await
                .map_err(|e| CaptureError::driver("read parent scroll position", e))?,
        )?;

        self.driver
            .switch_to_frame(element.as_ref())
            .await
            .map_err(|e| CaptureError::driver(format!("switch to frame {}", element.id()), e))?;

        let original_overflow = match self.driver.execute_script(scripts::GET_OVERFLOW, vec![]).await {
            Ok(value) => value.as_str().unwrap_or_default().to_string(),
            Err(e) => {
                log::warn!("Could not read frame overflow: {}", e);
                String::new()
            }
        };

        let frame = Frame::new(
            element,
            Location::new(bounds.left + bounds.client_left, bounds.top + bounds.client_top),
            RectangleSize::new(bounds.width, bounds.height),
            RectangleSize::new(bounds.client_width, bounds.client_height),
            parent_scroll,
            original_overflow,
        );
        log::debug!(
            "Entered frame {} at {} (inner size {})",
            frame.id(),
            frame.location(),
            frame.inner_size()
        );
        self.frame_chain.push(frame);
        Ok(())
    }

    /// Leaves the current frame, restoring its overflow and the parent's scroll position.
    pub async fn switch_to_parent_frame(&mut self) -> Result<()> {
        let Some(frame) = self.frame_chain.current_frame().cloned() else {
            return self.switch_to_default_content().await;
        };

        if frame.scrollbars_hidden() {
            self.set_overflow(frame.original_overflow()).await?;
        }

        self.driver
            .switch_to_parent_frame()
            .await
            .map_err(|e| CaptureError::driver("switch to parent frame", e))?;
        self.frame_chain.pop();

        let scroll = frame.original_scroll_location();
        self.driver
            .execute_script(
                scripts::SCROLL_TO,
                vec![Value::from(scroll.x), Value::from(scroll.y)],
            )
            .await
            .map_err(|e| CaptureError::driver(format!("restore parent scroll to {}", scroll), e))?;
        Ok(())
    }

    pub async fn switch_to_default_content(&mut self) -> Result<()> {
        self.driver
            .switch_to_default_content()
            .await
            .map_err(|e| CaptureError::driver("switch to default content", e))?;
        self.frame_chain.clear();
        Ok(())
    }

    /// Re-enters every frame of `chain`, outermost first.
    pub async fn switch_to_frame_chain(&mut self, chain: &FrameChain) -> Result<()> {
        if self.frame_chain.same_frames(chain) {
            return Ok(());
        }

        self.switch_to_default_content().await?;
        for frame in chain.frames() {
            self.switch_to_frame(frame.reference().clone()).await?;
        }
        Ok(())
    }

    /// Hides the scrollbars of the current context. No-op if already hidden.
    pub async fn hide_scrollbars(&mut self) -> Result<()> {
        match self.frame_chain.current_frame_mut() {
            Some(frame) if frame.scrollbars_hidden() => return Ok(()),
            None if self.default_overflow.is_some() => return Ok(()),
            _ => {}
        }

        let previous = self.set_overflow("hidden").await?;
        match self.frame_chain.current_frame_mut() {
            Some(frame) => frame.set_scrollbars_hidden(true),
            None => self.default_overflow = Some(previous),
        }
        Ok(())
    }

    /// Undoes [`TrackedDriver::hide_scrollbars`] for the current context.
    pub async fn restore_scrollbars(&mut self) -> Result<()> {
        let original = match self.frame_chain.current_frame_mut() {
            Some(frame) if frame.scrollbars_hidden() => {
                frame.set_scrollbars_hidden(false);
                frame.original_overflow().to_string()
            }
            Some(_) => return Ok(()),
            None => match self.default_overflow.take() {
                Some(original) => original,
                None => return Ok(()),
            },
        };

        self.set_overflow(&original).await?;
        Ok(())
    }

    async fn set_overflow(&self, overflow: &str) -> Result<String> {
        let value = self
            .driver
            .execute_script(scripts::SET_OVERFLOW, vec![Value::from(overflow)])
            .await
            .map_err(|e| CaptureError::driver(format!("set overflow {}", overflow), e))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}
