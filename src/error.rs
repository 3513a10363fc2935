//! Error types for the resume-lens library.
//!
//! The taxonomy mirrors the degradation policy of the pipeline:
//!
//! * [`PipelineError`] — **Fatal**: the document never entered the pipeline
//!   (bad path, unsupported format, empty/corrupt PDF). Returned as
//!   `Err(PipelineError)` from [`crate::process::Pipeline::run`]. These are
//!   genuine input-validation failures and the only way a run can fail.
//!
//! * [`ModelLoadError`] — infrastructure error from the vision-model loader.
//!   Never cached: the host slot stays empty and the next call retries.
//!
//! * [`TranscribeError`] — a transcription attempt failed. Carried inside
//!   [`crate::report::Transcript::Failed`] rather than propagated, so a dead
//!   accelerator degrades the output instead of aborting the run.
//!
//! * [`ProviderError`] — returned by the [`crate::provider`] capability
//!   traits. Converted into the degraded shapes at the analyzer boundary and
//!   never allowed past it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume-lens library.
///
/// Transcription and analysis failures do not appear here; those stages
/// degrade in place (see [`crate::report::Transcript`] and
/// [`crate::report::AnalysisOutcome`]).
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The extension is neither a known image type nor `.pdf`.
    #[error("unsupported document format '.{extension}' for '{path}'\nSupported: png, jpg, jpeg, bmp, gif, webp, tiff, pdf")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// A PDF contained zero pages, or every page failed to render.
    #[error("document '{path}' produced no pages to analyse")]
    EmptyDocument { path: PathBuf },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The image file exists but could not be decoded.
    #[error("image '{path}' could not be decoded: {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

/// The vision-model loader failed.
///
/// Not cached as a permanent state: [`crate::host::ModelHost`] leaves its
/// slot empty on failure so a later call retries the load from scratch.
#[derive(Debug, Clone, Error)]
#[error("vision model failed to load: {cause}\nThe next transcription call will retry the load.")]
pub struct ModelLoadError {
    pub cause: String,
}

impl ModelLoadError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

/// A transcription attempt failed.
///
/// Every variant carries a typed cause; the transcriber never signals
/// failure through the transcript text itself.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The model could not be loaded; see [`ModelLoadError`] retry semantics.
    #[error(transparent)]
    Load(#[from] ModelLoadError),

    /// Accelerator device or memory failure during generation.
    ///
    /// The transcriber has already asked the model to release its device
    /// memory pools by the time this is returned.
    #[error("accelerator failure during transcription: {detail}")]
    Device { detail: String },

    /// Generation or chat-template rendering failed for a non-device reason.
    #[error("transcription inference failed: {detail}")]
    Inference { detail: String },

    /// The generated token sequence could not be decoded to text.
    #[error("transcript decoding failed: {detail}")]
    Decode { detail: String },
}

/// Errors surfaced by [`crate::provider`] implementations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no credentials / endpoint configured.
    #[error("provider '{provider}' is not configured.\n{hint}")]
    NotConfigured { provider: String, hint: String },

    /// The remote API returned a non-success status.
    #[error("provider API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (connection, timeout, TLS).
    #[error("provider transport error: {detail}")]
    Transport { detail: String },

    /// Accelerator device or memory failure on the model host.
    #[error("device failure: {detail}")]
    Device { detail: String },

    /// The provider answered but returned no usable content.
    #[error("provider returned empty content")]
    EmptyContent,

    /// Token decode failure.
    #[error("decode failure: {detail}")]
    Decode { detail: String },
}

impl ProviderError {
    /// Device/memory-class failures trigger proactive memory release in the
    /// transcriber before the error is surfaced.
    pub fn is_device_failure(&self) -> bool {
        matches!(self, ProviderError::Device { .. })
    }
}

impl From<ProviderError> for TranscribeError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Device { detail } => TranscribeError::Device { detail },
            ProviderError::Decode { detail } => TranscribeError::Decode { detail },
            other => TranscribeError::Inference {
                detail: other.to_string(),
            },
        }
    }
}
