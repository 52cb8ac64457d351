//! Synchronous file checks: declared type and byte size.
//!
//! Both checks are pure functions of the candidate's metadata. They never read
//! the file's contents, so an oversized or mistyped file is rejected before any
//! decode work happens.

use crate::error::{UploadError, ValidationOutcome};
use crate::types::{CandidateFile, UploadConstraints};
use std::collections::BTreeSet;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Accept the file when its declared MIME type is allowed, or when its name
/// carries an allowed extension.
///
/// The extension fallback covers platforms that report an empty or generic
/// MIME type for perfectly good images.
pub fn validate_type(file: &CandidateFile, constraints: &UploadConstraints) -> ValidationOutcome<()> {
    if constraints.allowed_mime_types.contains(file.mime_type()) {
        return Ok(());
    }

    if has_allowed_extension(file.name(), &constraints.allowed_extensions) {
        return Ok(());
    }

    Err(UploadError::InvalidType {
        allowed: describe_allowed(constraints),
    })
}

/// Case-insensitive suffix match against normalized (`.jpg`) extensions.
pub fn has_allowed_extension(name: &str, allowed: &BTreeSet<String>) -> bool {
    let name = name.to_lowercase();
    allowed.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Reject files strictly larger than `max_bytes`.
pub fn validate_size(file: &CandidateFile, constraints: &UploadConstraints) -> ValidationOutcome<()> {
    if file.byte_length() > constraints.max_bytes {
        return Err(UploadError::InvalidSize {
            actual: format_file_size(file.byte_length()),
            limit: format_file_size(constraints.max_bytes),
        });
    }
    Ok(())
}

/// Human-readable size with binary prefixes.
///
/// ```
/// # use photo_upload::validate::format_file_size;
/// assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(0), "0 Bytes");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let unit = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let mut unit = unit.min(SIZE_UNITS.len() - 1);
    // ln() can land a hair under an exact power of 1024
    if unit + 1 < SIZE_UNITS.len() && bytes >= 1024u64.pow(unit as u32 + 1) {
        unit += 1;
    }
    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// `GIF, JPEG, PNG, WEBP`, derived from the allowed MIME types.
fn describe_allowed(constraints: &UploadConstraints) -> String {
    let mut labels: Vec<String> = Vec::new();
    for mime in &constraints.allowed_mime_types {
        let label = mime
            .rsplit('/')
            .next()
            .unwrap_or(mime)
            .to_uppercase()
            .replace("JPG", "JPEG");
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    if labels.is_empty() {
        labels = constraints
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_uppercase())
            .collect();
    }
    labels.join(", ")
}
