use super::{PositionMemento, PositionProvider};
use crate::driver::{parse_location, parse_size, RemoteDriver};
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, RectangleSize};
use crate::scripts;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Moves the current context with native document scrolling.
pub struct ScrollPositionProvider {
    driver: Arc<dyn RemoteDriver>,
}

impl ScrollPositionProvider {
    pub fn new(driver: Arc<dyn RemoteDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl PositionProvider for ScrollPositionProvider {
    async fn current_position(&self) -> Result<Location> {
        let value = self
            .driver
            .execute_script(scripts::GET_SCROLL_POSITION, vec![])
            .await
            .map_err(|e| CaptureError::driver("read scroll position", e))?;
        parse_location(&value)
    }

    async fn set_position(&mut self, location: Location) -> Result<()> {
        log::debug!("Scrolling to {}", location);
        self.driver
            .execute_script(
                scripts::SCROLL_TO,
                vec![Value::from(location.x), Value::from(location.y)],
            )
            .await
            .map_err(|e| CaptureError::driver(format!("scroll to {}", location), e))?;
        Ok(())
    }

    /// `max(documentElement, body)` on both axes: browsers disagree about which one
    /// reports the scrollable size.
    async fn entire_size(&self) -> Result<RectangleSize> {
        let value = self
            .driver
            .execute_script(scripts::GET_ENTIRE_SIZE, vec![])
            .await
            .map_err(|e| CaptureError::driver("read entire page size", e))?;
        parse_size(&value)
    }

    async fn state(&self) -> Result<PositionMemento> {
        Ok(PositionMemento::Location(self.current_position().await?))
    }

    async fn restore_state(&mut self, state: &PositionMemento) -> Result<()> {
        match state {
            PositionMemento::Location(location) => self.set_position(*location).await,
            PositionMemento::Transforms { .. } => Err(CaptureError::StitchConsistency(
                "Scroll position provider cannot restore a CSS transform state".to_string(),
            )),
        }
    }
}
