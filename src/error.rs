//! Upload error taxonomy.
//!
//! Every stage of the pipeline resolves to a [`ValidationOutcome`]. The
//! `Display` text of [`UploadError`] is the message shown to the user in the
//! upload area's error state, so wording changes here are user-visible.
//!
//! | Variant | Raised by |
//! |---|---|
//! | `InvalidType` | [`validate::validate_type`](crate::validate::validate_type) |
//! | `InvalidSize` | [`validate::validate_size`](crate::validate::validate_size) |
//! | `InvalidDimensions` | geometry probe |
//! | `UnreadableImage` | geometry probe (decode failure) |
//! | `ReadFailure` | probe / preview (contents could not be read) |
//! | `CompressionDecodeFailure` | compressor (hard failure) |
//! | `StageTimeout` | pipeline (stage exceeded `timeout_ms`) |

use thiserror::Error;

/// Which dimension bound an image violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionViolation {
    TooSmall { min_width: u32, min_height: u32 },
    TooLarge { max_width: u32, max_height: u32 },
}

impl std::fmt::Display for DimensionViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall {
                min_width,
                min_height,
            } => write!(
                f,
                "Image is too small. Minimum size is {}x{} pixels",
                min_width, min_height
            ),
            Self::TooLarge {
                max_width,
                max_height,
            } => write!(
                f,
                "Image is too large. Maximum size is {}x{} pixels",
                max_width, max_height
            ),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Invalid file type. Allowed types: {allowed}")]
    InvalidType { allowed: String },
    #[error("File size ({actual}) exceeds the maximum allowed size of {limit}")]
    InvalidSize { actual: String, limit: String },
    #[error("{0}")]
    InvalidDimensions(DimensionViolation),
    #[error("Unable to read image. The file may be corrupt or in an unsupported format")]
    UnreadableImage,
    #[error("Error reading file")]
    ReadFailure,
    #[error("Failed to process image for compression")]
    CompressionDecodeFailure,
    #[error("Processing the image took too long ({stage})")]
    StageTimeout { stage: &'static str },
}

impl UploadError {
    /// Short machine-readable code, used in CLI reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidType { .. } => "invalid_type",
            Self::InvalidSize { .. } => "invalid_size",
            Self::InvalidDimensions(DimensionViolation::TooSmall { .. }) => "too_small",
            Self::InvalidDimensions(DimensionViolation::TooLarge { .. }) => "too_large",
            Self::UnreadableImage => "unreadable_image",
            Self::ReadFailure => "read_failure",
            Self::CompressionDecodeFailure => "compression_decode_failure",
            Self::StageTimeout { .. } => "stage_timeout",
        }
    }
}

/// `Ok` carries the stage's payload, `Err` the user-facing reason.
pub type ValidationOutcome<T> = std::result::Result<T, UploadError>;
