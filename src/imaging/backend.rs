//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the upload pipeline
//! needs: identify (header-only geometry probe) and resize (decode, scale,
//! re-encode in the source format).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on top of the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The source bytes could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(String),
    /// Decoding worked but the encoder failed to produce output.
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel size of an image. Produced once per candidate, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Implementations are called from blocking worker threads, hence
/// `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Read width and height from the image header without decoding pixels.
    fn identify(&self, bytes: &[u8]) -> Result<ImageDimensions, BackendError>;

    /// Decode, resize to exactly `width`×`height`, and re-encode in
    /// `mime_type`. An empty buffer counts as "no output".
    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}

impl<B: ImageBackend + ?Sized> ImageBackend for std::sync::Arc<B> {
    fn identify(&self, bytes: &[u8]) -> Result<ImageDimensions, BackendError> {
        (**self).identify(bytes)
    }

    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        (**self).resize(params)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::Mutex;
    use std::time::Duration;

    /// What the mock's `resize` should do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum ResizeBehavior {
        /// Return `"{width}x{height}"` as the encoded bytes.
        #[default]
        Produce,
        /// Return an empty buffer.
        Empty,
        EncodeError,
        DecodeError,
    }

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and can cross `spawn_blocking`.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<ImageDimensions>>,
        pub resize_behavior: Mutex<ResizeBehavior>,
        pub identify_delay: Option<Duration>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify {
            len: usize,
        },
        Resize {
            mime_type: String,
            width: u32,
            height: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<ImageDimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn with_resize(self, behavior: ResizeBehavior) -> Self {
            *self.resize_behavior.lock().unwrap() = behavior;
            self
        }

        pub fn with_identify_delay(mut self, delay: Duration) -> Self {
            self.identify_delay = Some(delay);
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, bytes: &[u8]) -> Result<ImageDimensions, BackendError> {
            if let Some(delay) = self.identify_delay {
                std::thread::sleep(delay);
            }
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify { len: bytes.len() });

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))
        }

        fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                mime_type: params.mime_type.clone(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
            });
            match *self.resize_behavior.lock().unwrap() {
                ResizeBehavior::Produce => {
                    Ok(format!("{}x{}", params.width, params.height).into_bytes())
                }
                ResizeBehavior::Empty => Ok(Vec::new()),
                ResizeBehavior::EncodeError => Err(BackendError::Encode("mock".to_string())),
                ResizeBehavior::DecodeError => Err(BackendError::Decode("mock".to_string())),
            }
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![ImageDimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(&[0u8; 16]).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify { len: 16 }]);
    }

    #[test]
    fn mock_identify_without_results_fails() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.identify(&[]),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn mock_records_resize() {
        let backend = MockBackend::new();

        let out = backend
            .resize(&ResizeParams {
                source: std::sync::Arc::from(vec![0u8; 4]),
                mime_type: "image/png".into(),
                width: 800,
                height: 600,
                quality: Quality::new(85),
            })
            .unwrap();
        assert_eq!(out, b"800x600");

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Resize {
                width: 800,
                height: 600,
                quality: 85,
                ..
            }
        ));
    }

    #[test]
    fn dimensions_display() {
        let dims = ImageDimensions {
            width: 1200,
            height: 800,
        };
        assert_eq!(dims.to_string(), "1200x800");
    }
}
