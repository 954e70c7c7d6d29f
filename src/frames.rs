//! Frames the driver is switched into, outermost first.

use crate::driver::RemoteElement;
use crate::error::{CaptureError, Result};
use crate::geometry::{Location, RectangleSize};
use std::fmt;
use std::sync::Arc;

/// One entered iframe.
///
/// `location` and `size` describe the frame element as seen from its parent document
/// (location points at the content box, inside the border). `original_scroll_location` is
/// the parent's scroll position when the frame was entered.
#[derive(Clone)]
pub struct Frame {
    reference: Arc<dyn RemoteElement>,
    location: Location,
    size: RectangleSize,
    inner_size: RectangleSize,
    original_scroll_location: Location,
    original_overflow: String,
    scrollbars_hidden: bool,
}

impl Frame {
    pub fn new(
        reference: Arc<dyn RemoteElement>,
        location: Location,
        size: RectangleSize,
        inner_size: RectangleSize,
        original_scroll_location: Location,
        original_overflow: String,
    ) -> Self {
        Self {
            reference,
            location,
            size,
            inner_size,
            original_scroll_location,
            original_overflow,
            scrollbars_hidden: false,
        }
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn reference(&self) -> &Arc<dyn RemoteElement> {
        &self.reference
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn size(&self) -> RectangleSize {
        self.size
    }

    pub fn inner_size(&self) -> RectangleSize {
        self.inner_size
    }

    pub fn original_scroll_location(&self) -> Location {
        self.original_scroll_location
    }

    pub fn original_overflow(&self) -> &str {
        &self.original_overflow
    }

    pub fn scrollbars_hidden(&self) -> bool {
        self.scrollbars_hidden
    }

    pub(crate) fn set_scrollbars_hidden(&mut self, hidden: bool) {
        self.scrollbars_hidden = hidden;
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id())
            .field("location", &self.location)
            .field("size", &self.size)
            .field("inner_size", &self.inner_size)
            .field("original_scroll_location", &self.original_scroll_location)
            .field("original_overflow", &self.original_overflow)
            .finish()
    }
}

/// The stack of entered frames. Empty means the top-level document.
///
/// `Clone` copies every frame record, so a clone stays valid after the live chain changes.
#[derive(Debug, Clone, Default)]
pub struct FrameChain {
    frames: Vec<Frame>,
}

impl FrameChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(crate) fn current_frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Sum of every frame's location, ignoring scroll.
    pub fn current_frame_offset(&self) -> Location {
        self.frames
            .iter()
            .fold(Location::ZERO, |acc, frame| acc.offset_by(frame.location()))
    }

    /// Scroll position of the top-level document when the first frame was entered.
    pub fn default_content_scroll_position(&self) -> Result<Location> {
        self.frames
            .first()
            .map(Frame::original_scroll_location)
            .ok_or(CaptureError::NoFrames)
    }

    pub fn current_frame_inner_size(&self) -> Result<RectangleSize> {
        self.current_frame()
            .map(Frame::inner_size)
            .ok_or(CaptureError::NoFrames)
    }

    /// Compares frame identities pairwise; geometry is ignored.
    pub fn same_frames(&self, other: &FrameChain) -> bool {
        self.len() == other.len()
            && self
                .frames
                .iter()
                .zip(other.frames.iter())
                .all(|(a, b)| a.id() == b.id())
    }
}
