//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Backend calls
//! are CPU-bound and run on tokio's blocking pool; the async functions here
//! only sequence them and translate backend failures into
//! [`UploadError`]s.

use super::backend::{BackendError, ImageBackend, ImageDimensions};
use super::calculations::{calculate_target_dimensions, needs_compression};
use super::params::{CompressionPolicy, ResizeParams};
use crate::error::{DimensionViolation, UploadError, ValidationOutcome};
use crate::resource::ResourceRegistry;
use crate::types::{CandidateFile, UploadConstraints};
use std::sync::Arc;

/// Load a candidate's bytes off the async thread.
pub(crate) async fn read_contents(file: &CandidateFile) -> ValidationOutcome<Arc<[u8]>> {
    let source = file.clone();
    match tokio::task::spawn_blocking(move || source.read()).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => {
            tracing::warn!(file = file.name(), error = %e, "failed to read file");
            Err(UploadError::ReadFailure)
        }
        Err(e) => {
            tracing::warn!(file = file.name(), error = %e, "read task failed");
            Err(UploadError::ReadFailure)
        }
    }
}

/// Freeze a candidate's contents in memory, off the async thread.
///
/// Every later stage then sees the exact bytes whose length passed the size
/// check. A mismatch between the described and actual length is a
/// [`ReadFailure`](UploadError::ReadFailure).
pub async fn load_contents(file: CandidateFile) -> ValidationOutcome<CandidateFile> {
    let name = file.name().to_string();
    match tokio::task::spawn_blocking(move || file.load()).await {
        Ok(Ok(loaded)) => Ok(loaded),
        Ok(Err(e)) => {
            tracing::warn!(file = %name, error = %e, "failed to load file");
            Err(UploadError::ReadFailure)
        }
        Err(e) => {
            tracing::warn!(file = %name, error = %e, "load task failed");
            Err(UploadError::ReadFailure)
        }
    }
}

/// Check probed dimensions against the configured bounds (inclusive).
pub fn check_dimensions(
    dims: ImageDimensions,
    constraints: &UploadConstraints,
) -> ValidationOutcome<ImageDimensions> {
    if dims.width < constraints.min_width || dims.height < constraints.min_height {
        return Err(UploadError::InvalidDimensions(DimensionViolation::TooSmall {
            min_width: constraints.min_width,
            min_height: constraints.min_height,
        }));
    }
    if dims.width > constraints.max_width || dims.height > constraints.max_height {
        return Err(UploadError::InvalidDimensions(DimensionViolation::TooLarge {
            max_width: constraints.max_width,
            max_height: constraints.max_height,
        }));
    }
    Ok(dims)
}

/// Read an image's width and height and check them against `constraints`.
///
/// The bytes are bound to a temporary [`ObjectUrl`](crate::resource::ObjectUrl)
/// for the duration of the probe. The handle is a scope guard, so it is
/// released whether the probe succeeds, fails to decode, or the future is
/// dropped mid-flight.
#[tracing::instrument(skip_all, fields(file = file.name()))]
pub async fn probe_dimensions<B: ImageBackend + 'static>(
    backend: &Arc<B>,
    registry: &ResourceRegistry,
    file: &CandidateFile,
    constraints: &UploadConstraints,
) -> ValidationOutcome<ImageDimensions> {
    let bytes = read_contents(file).await?;
    let _handle = registry.acquire(Arc::clone(&bytes));

    let backend = Arc::clone(backend);
    let identified = tokio::task::spawn_blocking(move || backend.identify(&bytes)).await;
    let dims = match identified {
        Ok(Ok(dims)) => dims,
        Ok(Err(e)) => {
            tracing::info!(error = %e, "image could not be identified");
            return Err(UploadError::UnreadableImage);
        }
        Err(e) => {
            tracing::warn!(error = %e, "identify task failed");
            return Err(UploadError::UnreadableImage);
        }
    };

    tracing::debug!(%dims, "probed dimensions");
    check_dimensions(dims, constraints)
}

/// Re-encode `file` when it is over the byte or dimension threshold.
///
/// Returns the original candidate untouched on the cheap path, and also when
/// the encoder fails or produces nothing: compression is an optimisation, so
/// only a source that cannot be decoded fails the upload.
#[tracing::instrument(skip_all, fields(file = file.name(), %dims))]
pub async fn compress_if_needed<B: ImageBackend + 'static>(
    backend: &Arc<B>,
    file: CandidateFile,
    dims: ImageDimensions,
    policy: &CompressionPolicy,
) -> ValidationOutcome<CandidateFile> {
    if !needs_compression(file.byte_length(), dims, policy) {
        tracing::debug!("below compression thresholds, keeping original");
        return Ok(file);
    }

    let target = calculate_target_dimensions(dims, policy.max_dimension);
    let params = ResizeParams {
        source: read_contents(&file).await?,
        mime_type: file.mime_type().to_string(),
        width: target.width,
        height: target.height,
        quality: policy.quality,
    };

    let backend = Arc::clone(backend);
    match tokio::task::spawn_blocking(move || backend.resize(&params)).await {
        Ok(Ok(bytes)) if !bytes.is_empty() => {
            tracing::info!(
                %target,
                before = file.byte_length(),
                after = bytes.len(),
                "compressed image"
            );
            Ok(file.with_contents(bytes))
        }
        Ok(Ok(_)) => {
            tracing::warn!("encoder produced no output, keeping original");
            Ok(file)
        }
        Ok(Err(BackendError::Encode(e))) => {
            tracing::warn!(error = %e, "encoder failed, keeping original");
            Ok(file)
        }
        Ok(Err(BackendError::Decode(e))) => {
            tracing::warn!(error = %e, "source could not be decoded for compression");
            Err(UploadError::CompressionDecodeFailure)
        }
        Err(e) => {
            tracing::warn!(error = %e, "compression task failed");
            Err(UploadError::CompressionDecodeFailure)
        }
    }
}
