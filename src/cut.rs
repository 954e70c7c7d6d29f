//! Removing browser chrome (toolbars, status bars) from raw screenshots.

use crate::error::{CaptureError, Result};
use crate::geometry::Region;
use crate::imaging::Image;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub trait CutProvider: Send + Sync + Debug {
    fn cut(&self, image: &Image) -> Result<Image>;

    /// The same cut expressed for an image scaled by `ratio`.
    fn scale(&self, ratio: f64) -> Box<dyn CutProvider>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullCutProvider;

impl CutProvider for NullCutProvider {
    fn cut(&self, image: &Image) -> Result<Image> {
        Ok(image.clone())
    }

    fn scale(&self, _ratio: f64) -> Box<dyn CutProvider> {
        Box::new(NullCutProvider)
    }
}

/// Pixel margins to remove from each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CutMargins {
    pub header: i32,
    pub footer: i32,
    pub left: i32,
    pub right: i32,
}

impl CutMargins {
    pub fn new(header: i32, footer: i32, left: i32, right: i32) -> Self {
        Self {
            header,
            footer,
            left,
            right,
        }
    }

    fn scale(self, ratio: f64) -> Self {
        let scale = |value: i32| (value as f64 * ratio).ceil() as i32;
        Self::new(
            scale(self.header),
            scale(self.footer),
            scale(self.left),
            scale(self.right),
        )
    }

    fn apply(&self, image: &Image) -> Result<Image> {
        let region = Region::new(
            self.left,
            self.header,
            image.width() as i32 - self.left - self.right,
            image.height() as i32 - self.header - self.footer,
        );
        if region.is_empty() {
            return Err(CaptureError::Other(format!(
                "Cut margins {:?} leave nothing of a {} image",
                self,
                image.size()
            )));
        }
        image.crop(region)
    }
}

/// Margins given in CSS pixels; they grow with the pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCutProvider {
    margins: CutMargins,
}

impl FixedCutProvider {
    pub fn new(header: i32, footer: i32, left: i32, right: i32) -> Self {
        Self {
            margins: CutMargins::new(header, footer, left, right),
        }
    }
}

impl CutProvider for FixedCutProvider {
    fn cut(&self, image: &Image) -> Result<Image> {
        self.margins.apply(image)
    }

    fn scale(&self, ratio: f64) -> Box<dyn CutProvider> {
        Box::new(Self {
            margins: self.margins.scale(ratio),
        })
    }
}

/// Margins given in screenshot pixels; scaling leaves them as they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnscaledFixedCutProvider {
    margins: CutMargins,
}

impl UnscaledFixedCutProvider {
    pub fn new(header: i32, footer: i32, left: i32, right: i32) -> Self {
        Self {
            margins: CutMargins::new(header, footer, left, right),
        }
    }
}

impl CutProvider for UnscaledFixedCutProvider {
    fn cut(&self, image: &Image) -> Result<Image> {
        self.margins.apply(image)
    }

    fn scale(&self, _ratio: f64) -> Box<dyn CutProvider> {
        Box::new(*self)
    }
}

/// Builds the cut provider described by configuration.
pub fn cut_provider_for(margins: Option<CutMargins>, scaled: bool) -> Box<dyn CutProvider> {
    match (margins, scaled) {
        (None, _) => Box::new(NullCutProvider),
        (Some(m), true) => Box::new(FixedCutProvider::new(m.header, m.footer, m.left, m.right)),
        (Some(m), false) => Box::new(UnscaledFixedCutProvider::new(
            m.header, m.footer, m.left, m.right,
        )),
    }
}
