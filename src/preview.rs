//! Preview payload encoding.
//!
//! The preview is a `data:` URL: self-contained, displayable as-is, and
//! safe to hand to the caller's callback without any handle to release.

use crate::error::ValidationOutcome;
use crate::imaging::operations::read_contents;
use crate::types::CandidateFile;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Build a `data:<mime>;base64,<payload>` URL from raw bytes.
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Encode the final candidate as a preview payload.
///
/// A read failure surfaces as the generic
/// [`ReadFailure`](crate::error::UploadError::ReadFailure).
#[tracing::instrument(skip_all, fields(file = file.name()))]
pub async fn to_preview(file: &CandidateFile) -> ValidationOutcome<String> {
    let bytes = read_contents(file).await?;
    Ok(data_url(file.mime_type(), &bytes))
}
