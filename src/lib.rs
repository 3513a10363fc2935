//! # resume-lens
//!
//! Resume document intelligence: ingest an uploaded resume (image or
//! multi-page PDF), transcribe it with a vision-language model, and produce
//! a structured analysis — strengths/weaknesses, job and project
//! recommendations, and skill-gap scoring against a job description — with
//! a deterministic keyword fallback whenever the model path is
//! unconfigured or misbehaves.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume (image / PDF)
//!  │
//!  ├─ 1. Normalise   one canonical RGB raster (PDF pages stitched, 2x)
//!  ├─ 2. Transcribe  vision model, prompt-echo trimmed from the output
//!  ├─ 3. Analyse     strict-JSON report via the text model
//!  │      └─ degrade fence-strip, parse-recover, keyword fallback
//!  └─ 4. Output      one PipelineOutput: transcript + analysis + gap
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resume_lens::{
//!     Analyzer, GeminiText, ModelHost, Pipeline, PipelineConfig, RemoteVisionLoader, TextModel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let host = Arc::new(ModelHost::new(RemoteVisionLoader::new(
//!         "http://127.0.0.1:8765",
//!     )));
//!     let text_model = GeminiText::from_env()
//!         .ok()
//!         .map(|m| Arc::new(m) as Arc<dyn TextModel>);
//!     let analyzer = Analyzer::new(text_model, &config);
//!
//!     let pipeline = Pipeline::new(config, host, analyzer);
//!     let output = pipeline
//!         .run_with_job_description("resume.pdf", "Backend engineer, Python + Docker")
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&output)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Degradation model
//!
//! Only normalisation can fail a run; everything downstream degrades in
//! place. Transcription failures become a typed [`Transcript::Failed`],
//! analysis failures become [`AnalysisOutcome::Degraded`] or
//! [`AnalysisOutcome::ProviderFailure`], and gap analysis always resolves —
//! its worst case is the model-free keyword matcher, which has no failure
//! mode by construction.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod provider;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{ModelLoadError, PipelineError, ProviderError, TranscribeError};
pub use host::ModelHost;
pub use pipeline::analyze::{Analyzer, SkillInput};
pub use pipeline::fallback::{analyze_gap_fallback, extract_skills, SKILL_VOCABULARY};
pub use pipeline::normalize::CanonicalImage;
pub use process::Pipeline;
pub use provider::gemini::GeminiText;
pub use provider::remote::{RemoteVisionLoader, RemoteVisionModel};
pub use provider::{TextModel, VisionModel, VisionModelLoader};
pub use report::{
    AnalysisOutcome, AnalysisReport, Difficulty, GapReport, GapSource, JobRecommendation,
    LearningStep, PipelineOutput, Priority, ProjectRecommendation, ProjectSuggestions,
    ResumeAssessment, StageTimings, SuggestionOutcome, Transcript, TranscriptFailure,
    DEGRADED_COMMENT,
};
