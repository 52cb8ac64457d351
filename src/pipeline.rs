//! The upload pipeline: type → size → geometry → compression → preview.
//!
//! Stages run strictly in order and the first failure ends the attempt. The
//! two synchronous checks run before anything reads the file, so a mistyped
//! or oversized upload never reaches a decoder. Once they pass, the contents
//! are read exactly once and held in memory; a file whose length no longer
//! matches is rejected. Each asynchronous stage is bounded by the configured
//! `timeout_ms`.

use crate::config::UploadConfig;
use crate::error::{UploadError, ValidationOutcome};
use crate::imaging::{
    CompressionPolicy, ImageBackend, ImageDimensions, RustBackend, compress_if_needed,
    load_contents, probe_dimensions,
};
use crate::preview::to_preview;
use crate::resource::ResourceRegistry;
use crate::types::{CandidateFile, UploadConstraints};
use crate::validate::{validate_size, validate_type};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A candidate that passed every stage.
#[derive(Debug, Clone)]
pub struct Accepted {
    /// The file handed to the caller: the original, or its re-encoded copy.
    pub file: CandidateFile,
    /// `data:` URL of `file`.
    pub preview: String,
    /// Dimensions of the original upload.
    pub original: ImageDimensions,
    pub compressed: bool,
}

pub struct UploadPipeline<B> {
    backend: Arc<B>,
    registry: ResourceRegistry,
    constraints: UploadConstraints,
    policy: CompressionPolicy,
    stage_timeout: Duration,
}

impl UploadPipeline<RustBackend> {
    /// Pipeline backed by the `image` crate.
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(RustBackend::new(), config)
    }
}

impl<B: ImageBackend + 'static> UploadPipeline<B> {
    pub fn new(backend: B, config: &UploadConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            registry: ResourceRegistry::new(),
            constraints: UploadConstraints::from_config(config),
            policy: CompressionPolicy::from_config(&config.compression),
            stage_timeout: config.stage_timeout(),
        }
    }

    /// Share handle bookkeeping with another component, e.g. a controller.
    pub fn with_registry(mut self, registry: ResourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn constraints(&self) -> &UploadConstraints {
        &self.constraints
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Run every stage on `file`.
    #[tracing::instrument(skip_all, fields(file = file.name(), bytes = file.byte_length()))]
    pub async fn run(&self, file: CandidateFile) -> ValidationOutcome<Accepted> {
        let outcome = self.run_stages(file).await;
        match &outcome {
            Ok(accepted) => tracing::info!(
                compressed = accepted.compressed,
                final_bytes = accepted.file.byte_length(),
                "upload accepted"
            ),
            Err(e) => tracing::info!(reason = e.code(), "upload rejected"),
        }
        outcome
    }

    async fn run_stages(&self, file: CandidateFile) -> ValidationOutcome<Accepted> {
        validate_type(&file, &self.constraints)?;
        validate_size(&file, &self.constraints)?;
        let file = self.bounded("load", load_contents(file)).await?;

        let original = self
            .bounded(
                "probe",
                probe_dimensions(&self.backend, &self.registry, &file, &self.constraints),
            )
            .await?;

        let original_file = file.clone();
        let file = self
            .bounded(
                "compress",
                compress_if_needed(&self.backend, file, original, &self.policy),
            )
            .await?;
        let compressed = !file.shares_contents_with(&original_file);
        drop(original_file);

        let preview = self.bounded("preview", to_preview(&file)).await?;

        Ok(Accepted {
            file,
            preview,
            original,
            compressed,
        })
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        future: impl Future<Output = ValidationOutcome<T>>,
    ) -> ValidationOutcome<T> {
        match tokio::time::timeout(self.stage_timeout, future).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(stage, timeout = ?self.stage_timeout, "stage timed out");
                Err(UploadError::StageTimeout { stage })
            }
        }
    }
}
