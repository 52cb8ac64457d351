//! Image processing: geometry probe and conditional re-encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize → source format** | Lanczos3 + `image` encoders (JPEG at quality 85) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for threshold and dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Async functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageDimensions};
pub use calculations::{calculate_target_dimensions, needs_compression};
pub use operations::{check_dimensions, compress_if_needed, load_contents, probe_dimensions};
pub use params::{CompressionPolicy, Quality, ResizeParams};
pub use rust_backend::RustBackend;
