//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides whether and how to re-encode) and the
//! [`backend`](super::backend) (which does the pixel work). Swapping in a mock
//! backend leaves operation logic untouched.

use crate::config::CompressionConfig;
use std::sync::Arc;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The same quality as a `0.0..=1.0` factor.
    pub fn factor(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// When to re-encode, and the bounds of the re-encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Files of at least this many bytes are re-encoded.
    pub threshold_bytes: u64,
    /// Longer side of a re-encoded image; also the dimension threshold.
    pub max_dimension: u32,
    pub quality: Quality,
}

impl CompressionPolicy {
    pub fn from_config(config: &CompressionConfig) -> Self {
        Self {
            threshold_bytes: config.threshold_bytes,
            max_dimension: config.max_dimension,
            quality: Quality::new(config.quality),
        }
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::from_config(&CompressionConfig::default())
    }
}

/// Parameters for a resize-and-reencode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: Arc<[u8]>,
    /// Encoding of both the source and the output.
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_85() {
        assert_eq!(Quality::default().value(), 85);
        assert!((Quality::default().factor() - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn policy_defaults() {
        let policy = CompressionPolicy::default();
        assert_eq!(policy.threshold_bytes, 2 * 1024 * 1024);
        assert_eq!(policy.max_dimension, 2000);
        assert_eq!(policy.quality, Quality::new(85));
    }
}
