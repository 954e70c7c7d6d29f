use super::{PositionMemento, PositionProvider};
use crate::driver::{parse_size, RemoteDriver};
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, RectangleSize};
use crate::scripts;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Moves the page with a CSS translation of the root element; nothing actually scrolls.
///
/// The current position is whatever this provider last set. It is never read back from the
/// DOM, so a page must not be moved by this provider and by scrolling at the same time.
pub struct CssTranslatePositionProvider {
    driver: Arc<dyn RemoteDriver>,
    last_set_position: Location,
}

impl CssTranslatePositionProvider {
    pub fn new(driver: Arc<dyn RemoteDriver>) -> Self {
        Self {
            driver,
            last_set_position: Location::ZERO,
        }
    }

    pub fn translate_value(location: Location) -> String {
        format!("translate({}px, {}px)", -location.x, -location.y)
    }
}

#[async_trait]
impl PositionProvider for CssTranslatePositionProvider {
    async fn current_position(&self) -> Result<Location> {
        Ok(self.last_set_position)
    }

    async fn set_position(&mut self, location: Location) -> Result<()> {
        let transform = Self::translate_value(location);
        log::debug!("Translating root element: {}", transform);
        self.driver
            .execute_script(scripts::SET_TRANSFORM, vec![Value::from(transform)])
            .await
            .map_err(|e| CaptureError::driver(format!("translate to {}", location), e))?;
        self.last_set_position = location;
        Ok(())
    }

    async fn entire_size(&self) -> Result<RectangleSize> {
        let value = self
            .driver
            .execute_script(scripts::GET_ENTIRE_SIZE, vec![])
            .await
            .map_err(|e| CaptureError::driver("read entire page size", e))?;
        parse_size(&value)
    }

    async fn state(&self) -> Result<PositionMemento> {
        let value = self
            .driver
            .execute_script(scripts::GET_TRANSFORMS, vec![])
            .await
            .map_err(|e| CaptureError::driver("read css transforms", e))?;
        let transforms: BTreeMap<String, String> = serde_json::from_value(value)?;

        let mut values = transforms.values();
        if let Some(first) = values.next() {
            if values.any(|other| other != first) {
                return Err(CaptureError::StitchConsistency(
                    "Got different css positions!".to_string(),
                ));
            }
        }

        Ok(PositionMemento::Transforms {
            transforms,
            position: self.last_set_position,
        })
    }

    async fn restore_state(&mut self, state: &PositionMemento) -> Result<()> {
        let PositionMemento::Transforms {
            transforms,
            position,
        } = state
        else {
            return Err(CaptureError::StitchConsistency(
                "CSS translate position provider needs a transform state".to_string(),
            ));
        };

        let transforms = serde_json::to_value(transforms)?;
        self.driver
            .execute_script(scripts::SET_TRANSFORMS, vec![transforms])
            .await
            .map_err(|e| CaptureError::driver("restore css transforms", e))?;
        self.last_set_position = *position;
        Ok(())
    }

    fn clamps_to_content(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_value_negates_position() {
        assert_eq!(
            CssTranslatePositionProvider::translate_value(Location::new(0, 550)),
            "translate(0px, -550px)"
        );
        assert_eq!(
            CssTranslatePositionProvider::translate_value(Location::ZERO),
            "translate(0px, 0px)"
        );
    }
}
