//! Strategies for moving and reading the "current position" of a scrollable context.

pub mod css_translate;
pub mod element;
pub mod scroll;

pub use css_translate::CssTranslatePositionProvider;
pub use element::ElementPositionProvider;
pub use scroll::ScrollPositionProvider;

use crate::driver::RemoteDriver;
use crate::error::Result;
use crate::geometry::{Location, RectangleSize};
use crate::viewport::viewport_size;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Saved provider state, restorable with [`PositionProvider::restore_state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionMemento {
    Location(Location),
    Transforms {
        transforms: BTreeMap<String, String>,
        position: Location,
    },
}

#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self) -> Result<Location>;

    async fn set_position(&mut self, location: Location) -> Result<()>;

    /// Size of the whole scrollable content.
    async fn entire_size(&self) -> Result<RectangleSize>;

    async fn state(&self) -> Result<PositionMemento>;

    async fn restore_state(&mut self, state: &PositionMemento) -> Result<()>;

    /// Whether `set_position` stops at the content edge, so that setting a far position and
    /// reading it back measures how far the content really reaches.
    fn clamps_to_content(&self) -> bool {
        true
    }
}

/// How the page is moved between stitched parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchMode {
    /// Native scrolling.
    #[default]
    Scroll,
    /// CSS `transform: translate(..)` on the root element.
    Css,
}

/// Builds the stitching provider for the driver's current context.
pub fn stitching_provider(
    mode: StitchMode,
    driver: Arc<dyn RemoteDriver>,
) -> Box<dyn PositionProvider> {
    match mode {
        StitchMode::Scroll => Box::new(ScrollPositionProvider::new(driver)),
        StitchMode::Css => Box::new(CssTranslatePositionProvider::new(driver)),
    }
}

/// The provider's entire size, degrading to the viewport size when it cannot be read.
pub async fn entire_size_or_viewport(
    provider: &dyn PositionProvider,
    driver: &dyn RemoteDriver,
) -> Result<RectangleSize> {
    match provider.entire_size().await {
        Ok(size) => Ok(size),
        Err(e) => {
            log::warn!("Failed to extract entire size, using viewport size: {}", e);
            viewport_size(driver).await
        }
    }
}
