use super::{PositionMemento, PositionProvider};
use crate::driver::{ElementInspector, RemoteElement};
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, RectangleSize};
use async_trait::async_trait;
use std::sync::Arc;

/// Scrolls inside a single scrollable element instead of the document.
pub struct ElementPositionProvider {
    inspector: ElementInspector,
}

impl ElementPositionProvider {
    pub fn new(element: Arc<dyn RemoteElement>) -> Self {
        Self {
            inspector: ElementInspector::new(element),
        }
    }
}

#[async_trait]
impl PositionProvider for ElementPositionProvider {
    async fn current_position(&self) -> Result<Location> {
        self.inspector.scroll_position().await
    }

    async fn set_position(&mut self, location: Location) -> Result<()> {
        log::debug!(
            "Scrolling element {} to {}",
            self.inspector.element().id(),
            location
        );
        self.inspector.scroll_to(location).await
    }

    async fn entire_size(&self) -> Result<RectangleSize> {
        self.inspector.scroll_size().await
    }

    async fn state(&self) -> Result<PositionMemento> {
        Ok(PositionMemento::Location(self.current_position().await?))
    }

    async fn restore_state(&mut self, state: &PositionMemento) -> Result<()> {
        match state {
            PositionMemento::Location(location) => self.set_position(*location).await,
            PositionMemento::Transforms { .. } => Err(CaptureError::StitchConsistency(
                "Element position provider cannot restore a CSS transform state".to_string(),
            )),
        }
    }
}
