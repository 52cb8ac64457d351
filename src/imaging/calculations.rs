//! Pure calculation functions for compression decisions and target dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::ImageDimensions;
use super::params::CompressionPolicy;

/// Whether an image should go through the resize-and-reencode transform.
///
/// Small files are left alone: the cheap path applies only when the file is
/// under the byte threshold *and* both sides are under the dimension
/// threshold.
pub fn needs_compression(
    byte_length: u64,
    dims: ImageDimensions,
    policy: &CompressionPolicy,
) -> bool {
    !(byte_length < policy.threshold_bytes
        && dims.width < policy.max_dimension
        && dims.height < policy.max_dimension)
}

/// Output dimensions with the longer side clamped to `max_dimension`.
///
/// The shorter side scales proportionally and is never checked against the
/// limit itself. A longer side already within the limit is kept as-is, so
/// byte-triggered re-encodes never upscale.
///
/// # Examples
/// ```
/// # use photo_upload::imaging::{ImageDimensions, calculate_target_dimensions};
/// let dims = ImageDimensions { width: 3000, height: 1000 };
/// assert_eq!(
///     calculate_target_dimensions(dims, 2000),
///     ImageDimensions { width: 2000, height: 667 }
/// );
/// ```
pub fn calculate_target_dimensions(dims: ImageDimensions, max_dimension: u32) -> ImageDimensions {
    let ImageDimensions { width, height } = dims;

    if width >= height {
        // Landscape or square
        let new_width = width.min(max_dimension);
        let new_height = scale(height, new_width, width);
        ImageDimensions {
            width: new_width,
            height: new_height,
        }
    } else {
        // Portrait
        let new_height = height.min(max_dimension);
        let new_width = scale(width, new_height, height);
        ImageDimensions {
            width: new_width,
            height: new_height,
        }
    }
}

/// `side * numerator / denominator`, rounded, never below one pixel.
fn scale(side: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (side as f64 * numerator as f64 / denominator as f64).round() as u32;
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;

    fn dims(width: u32, height: u32) -> ImageDimensions {
        ImageDimensions { width, height }
    }

    fn policy() -> CompressionPolicy {
        CompressionPolicy {
            threshold_bytes: 2 * 1024 * 1024,
            max_dimension: 2000,
            quality: Quality::new(85),
        }
    }

    // =========================================================================
    // needs_compression tests
    // =========================================================================

    #[test]
    fn small_file_small_image_skips() {
        assert!(!needs_compression(800 * 1024, dims(1200, 800), &policy()));
    }

    #[test]
    fn byte_threshold_is_inclusive() {
        let p = policy();
        assert!(!needs_compression(p.threshold_bytes - 1, dims(10, 10), &p));
        assert!(needs_compression(p.threshold_bytes, dims(10, 10), &p));
    }

    #[test]
    fn dimension_threshold_is_inclusive() {
        assert!(!needs_compression(1, dims(1999, 1999), &policy()));
        assert!(needs_compression(1, dims(2000, 10), &policy()));
        assert!(needs_compression(1, dims(10, 2000), &policy()));
    }

    // =========================================================================
    // calculate_target_dimensions tests
    // =========================================================================

    #[test]
    fn landscape_clamps_width() {
        assert_eq!(calculate_target_dimensions(dims(3000, 1000), 2000), dims(2000, 667));
    }

    #[test]
    fn portrait_clamps_height() {
        assert_eq!(calculate_target_dimensions(dims(1500, 4000), 2000), dims(750, 2000));
    }

    #[test]
    fn square_clamps_both() {
        assert_eq!(calculate_target_dimensions(dims(4000, 4000), 2000), dims(2000, 2000));
    }

    #[test]
    fn exactly_at_limit_is_unchanged() {
        assert_eq!(calculate_target_dimensions(dims(2000, 1500), 2000), dims(2000, 1500));
    }

    #[test]
    fn under_limit_never_upscales() {
        assert_eq!(calculate_target_dimensions(dims(1200, 800), 2000), dims(1200, 800));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(calculate_target_dimensions(dims(100_000, 10), 2000), dims(2000, 1));
    }

    #[test]
    fn aspect_ratio_preserved_within_a_pixel() {
        for &(w, h) in &[(3000, 1000), (4031, 3023), (2001, 1999), (1234, 5678), (7999, 2)] {
            let out = calculate_target_dimensions(dims(w, h), 2000);
            assert!(out.width.max(out.height) <= 2000);
            let expected = if w >= h {
                h as f64 * out.width as f64 / w as f64
            } else {
                w as f64 * out.height as f64 / h as f64
            };
            let actual = f64::from(if w >= h { out.height } else { out.width });
            assert!(
                (actual - expected).abs() <= 1.0,
                "{w}x{h} -> {}x{}",
                out.width,
                out.height
            );
        }
    }
}
