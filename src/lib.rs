pub mod browser;
pub mod capture;
pub mod compensation;
pub mod coordinates;
pub mod cut;
pub mod debug;
pub mod driver;
pub mod error;
pub mod frames;
pub mod geometry;
pub mod imaging;
pub mod positioning;
pub mod scaling;
pub mod scripts;
pub mod server;
pub mod session;
pub mod stitching;
pub mod user_agent;
pub mod viewport;

// Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ConnectionMode};
pub use capture::{
    capture, capture_element, capture_frame, capture_full_page, capture_viewport,
    CaptureContext, CaptureSettings,
};
pub use coordinates::{CoordinatesType, ScreenshotContext, ScreenshotType};
pub use driver::{ElementInspector, RemoteDriver, RemoteElement, TrackedDriver};
pub use error::{CaptureError, Result};
pub use frames::{Frame, FrameChain};
pub use geometry::{Location, Region, RectangleSize};
pub use imaging::Image;
pub use positioning::{PositionMemento, PositionProvider, StitchMode};
pub use session::{CaptureSession, SessionGuard};
pub use viewport::{set_viewport_size, viewport_size};
