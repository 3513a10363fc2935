//! Pipeline orchestration: one document in, one unified result out.
//!
//! The orchestrator adds no analysis logic of its own — every stage owns
//! exactly one degradation strategy, specified where the stage lives. What
//! this module owns is sequencing, the per-document failure policy, and
//! stage-timing metadata:
//!
//! * Normalisation errors are the only fatal ones — genuine
//!   input-validation failures surfaced as `Err(PipelineError)`.
//! * A transcription failure degrades: the typed cause lands in the
//!   output, analysis is skipped, and gap analysis (when a job description
//!   was supplied) still resolves through the keyword fallback.
//! * Analysis never fails by construction; its three shapes are all inside
//!   [`AnalysisOutcome`].
//!
//! No stage retries automatically, and nothing is cached per document:
//! re-submitting the same file re-runs the full pipeline.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::host::ModelHost;
use crate::pipeline::analyze::Analyzer;
use crate::pipeline::fallback::analyze_gap_fallback;
use crate::pipeline::{normalize, transcribe};
use crate::report::{PipelineOutput, StageTimings, Transcript};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The document intelligence pipeline.
///
/// Owns the model host and analyzer for its lifetime; cheap to share via
/// `Arc` across request handlers.
pub struct Pipeline {
    config: PipelineConfig,
    host: Arc<ModelHost>,
    analyzer: Analyzer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, host: Arc<ModelHost>, analyzer: Analyzer) -> Self {
        Self {
            config,
            host,
            analyzer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one document through normalise → transcribe → analyse.
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<PipelineOutput, PipelineError> {
        self.run_inner(path.as_ref(), None).await
    }

    /// As [`run`](Self::run), additionally scoring the resume against a
    /// job description.
    pub async fn run_with_job_description(
        &self,
        path: impl AsRef<Path>,
        jd_text: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        self.run_inner(path.as_ref(), Some(jd_text)).await
    }

    /// Run on in-memory document bytes.
    ///
    /// Writes the payload to a managed tempfile (deleted on return or
    /// panic) and re-enters the path-based flow. `extension` selects the
    /// format, e.g. `"pdf"` or `"png"`.
    pub async fn run_bytes(
        &self,
        bytes: &[u8],
        extension: &str,
        jd_text: Option<&str>,
    ) -> Result<PipelineOutput, PipelineError> {
        let mut tmp = tempfile::Builder::new()
            .suffix(&format!(".{extension}"))
            .tempfile()
            .map_err(|e| PipelineError::Internal(format!("tempfile: {e}")))?;
        tmp.write_all(bytes)
            .map_err(|e| PipelineError::Internal(format!("tempfile write: {e}")))?;
        // `tmp` is dropped (and the file deleted) when run_inner returns.
        self.run_inner(tmp.path(), jd_text).await
    }

    async fn run_inner(
        &self,
        path: &Path,
        jd_text: Option<&str>,
    ) -> Result<PipelineOutput, PipelineError> {
        let total_start = Instant::now();
        info!("starting pipeline: {}", path.display());

        // ── Stage 1: Normalise (the only fatal stage) ────────────────────
        let stage_start = Instant::now();
        let image = normalize::normalize(path, &self.config).await?;
        let normalize_ms = stage_start.elapsed().as_millis() as u64;
        info!(
            "normalised to {}x{} in {normalize_ms}ms",
            image.width(),
            image.height()
        );

        // ── Stage 2: Transcribe (degrades on failure) ────────────────────
        let stage_start = Instant::now();
        let transcription = transcribe::transcribe(&self.host, &image, &self.config).await;
        drop(image); // canonical image is released after transcription
        let transcribe_ms = stage_start.elapsed().as_millis() as u64;

        // ── Stage 3: Analyse (never fails) ───────────────────────────────
        let stage_start = Instant::now();
        let (transcript, analysis, gap) = match &transcription {
            Ok(text) => {
                info!("transcribed {} chars in {transcribe_ms}ms", text.len());
                let analysis = self.analyzer.analyze_resume(text).await;
                let gap = match jd_text {
                    Some(jd) => Some(self.analyzer.analyze_gap(text, jd).await),
                    None => None,
                };
                (
                    Transcript::Ok { text: text.clone() },
                    Some(analysis),
                    gap,
                )
            }
            Err(e) => {
                warn!("transcription failed, skipping analysis: {e}");
                // The gap floor survives even without a transcript: every
                // JD skill is missing, the formula yields the score.
                let gap = jd_text.map(|jd| analyze_gap_fallback("", jd));
                (Transcript::from(e), None, gap)
            }
        };
        let analyze_ms = stage_start.elapsed().as_millis() as u64;

        let timings = StageTimings {
            normalize_ms,
            transcribe_ms,
            analyze_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        info!("pipeline complete in {}ms", timings.total_ms);

        Ok(PipelineOutput {
            transcript,
            analysis,
            gap,
            timings,
        })
    }
}
