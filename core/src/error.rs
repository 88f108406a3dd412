use log::{error, warn};
use thiserror::Error;

// How loudly a failure is reported. None of them are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Error)]
pub enum MaskError {
    // Location or coordinate outside the grid, or a protected boundary entry
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Removal of a point or ridge that is not stored
    #[error("not found: {0}")]
    NotFound(String),

    // Bracket search failed even though the boundary entries should exist
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error(
        "size mismatch: mask is {field_width}x{field_height}, buffer is {buffer_width}x{buffer_height}"
    )]
    SizeMismatch {
        field_width: usize,
        field_height: usize,
        buffer_width: usize,
        buffer_height: usize,
    },

    #[error("failed to parse mask JSON: {0}")]
    Parse(#[from] serde_json::Error),

    // Text parsed but does not describe a valid mask
    #[error("malformed mask input: {0}")]
    MalformedInput(String),
}

pub type Result<T> = std::result::Result<T, MaskError>;

impl MaskError {
    pub fn severity(&self) -> Severity {
        match self {
            MaskError::NotFound(_) | MaskError::Parse(_) | MaskError::MalformedInput(_) => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    // Log at the level matching the severity, then hand the error back
    // so it can still be returned.
    pub(crate) fn reported(self, context: &str) -> Self {
        match self.severity() {
            Severity::Warning => warn!("{context}: {self}"),
            Severity::Error => error!("{context}: {self}"),
        }
        self
    }
}
