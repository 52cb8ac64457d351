//! # Photo Upload
//!
//! Client-side style validation and compression for single-photo uploads,
//! plus the interaction state machine of the drop zone that feeds it.
//!
//! # Architecture: Five-Stage Pipeline
//!
//! Each attempt carries one candidate file through a fixed sequence of stages.
//! The first failing stage ends the attempt with a user-facing
//! [`UploadError`](error::UploadError):
//!
//! ```text
//! 1. Type       MIME type or extension allowed?     (metadata only)
//! 2. Size       byte length ≤ max_size?             (metadata only)
//! 3. Geometry   decode header, bounds check         (bytes → width × height)
//! 4. Compress   re-encode when large                (≤ 2000 px, quality 85)
//! 5. Preview    data: URL of the final file         (bytes → String)
//! ```
//!
//! The two metadata checks run before anything reads the file, so an
//! oversized or mistyped upload never costs a decode. Stages 3-5 are async,
//! run their CPU work on tokio's blocking pool, and are each bounded by
//! `timeout_ms`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | Stages 1-2: type and size checks, human-readable sizes |
//! | [`imaging`] | Stages 3-4: geometry probe and conditional re-encode behind an [`ImageBackend`](imaging::ImageBackend) |
//! | [`preview`] | Stage 5: `data:` URL encoding |
//! | [`pipeline`] | Sequences the stages with per-stage timeouts |
//! | [`controller`] | Drop zone state machine: drag, drop, picker, keyboard, remove |
//! | [`resource`] | Revocable object URL handles with acquire/release accounting |
//! | [`config`] | `upload.toml` loading, merging onto stock defaults, validation |
//! | [`types`] | [`CandidateFile`](types::CandidateFile) and [`UploadConstraints`](types::UploadConstraints) |
//! | [`error`] | The rejection taxonomy and its messages |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Handles Are Scope Guards
//!
//! Decoding an image needs a temporary handle to its bytes, and the displayed
//! preview holds another. Both are [`ObjectUrl`](resource::ObjectUrl) values
//! that release themselves on drop, so every path out of a stage (success,
//! decode error, timeout, a replaced preview, teardown) releases exactly once.
//! The [`ResourceRegistry`](resource::ResourceRegistry) counts acquisitions and
//! releases so tests can assert the balance.
//!
//! ## Compression Never Fails an Upload
//!
//! Re-encoding only shrinks a file that is already acceptable. If the encoder
//! errors or produces nothing, the original is kept. Only a source the decoder
//! cannot read is a hard failure.
//!
//! ## One Attempt at a Time
//!
//! While an attempt is loading, new drops and picker requests are answered
//! with [`Effect::Busy`](controller::Effect::Busy). Results from attempts that
//! were invalidated by a reset or teardown are discarded by id.

pub mod config;
pub mod controller;
pub mod error;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod resource;
pub mod types;
pub mod validate;
