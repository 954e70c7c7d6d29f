use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// A read or write on the automation channel failed.
    #[error("Driver operation failed ({operation}): {source}")]
    DriverOperation {
        operation: String,
        #[source]
        source: Box<CaptureError>,
    },

    #[error("No frames in frame chain")]
    NoFrames,

    #[error("Coordinates conversion failed: {0}")]
    CoordinatesConversion(String),

    #[error("Failed to set viewport size: {0}")]
    ViewportSizing(String),

    #[error("Stitching consistency error: {0}")]
    StitchConsistency(String),

    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected script result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl CaptureError {
    /// Wraps an automation channel failure with the operation that caused it.
    pub fn driver(operation: impl Into<String>, source: CaptureError) -> Self {
        CaptureError::DriverOperation {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
