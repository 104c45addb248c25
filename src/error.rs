//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the render-and-export pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// A numeric field was set out of range. Names the field and the
    /// violated bound so the editing surface can report it inline.
    #[error("Invalid value for `{field}`: {message}")]
    Validation { field: String, message: String },

    /// The capture root was absent when a snapshot was requested
    #[error("Render target missing: {0}")]
    RenderTargetMissing(String),

    /// The snapshot backend failed to produce pixels
    #[error("Capture failed: {0}")]
    Capture(String),

    /// A font face could not be loaded or is not registered
    #[error("Font unavailable: {0}")]
    FontLoad(String),

    /// PNG encoding failed
    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    /// Save was requested before any render completed
    #[error("No rendered bitmap available yet")]
    BitmapUnavailable,

    /// The export controller has been shut down
    #[error("Export controller is closed")]
    ControllerClosed,

    /// Filesystem error while saving the exported image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand used by the model's range checks
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
