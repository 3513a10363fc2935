//! Output data model: every record the pipeline hands to a result consumer.
//!
//! The analyzer historically produced three structurally different JSON
//! shapes from one logical operation (full report, degraded report, bare
//! error object), leaving consumers to duck-check keys at runtime. Here each
//! family of shapes is a serde-tagged enum — [`AnalysisOutcome`],
//! [`SuggestionOutcome`], [`Transcript`] — so a consumer is forced by the
//! type system to branch on every case, and the JSON carries an explicit
//! discriminant field instead of an implicit shape.

use crate::error::TranscribeError;
use serde::{Deserialize, Deserializer, Serialize};

/// Fixed comment substituted into the degraded report when the model's
/// response cannot be parsed as the requested JSON schema.
pub const DEGRADED_COMMENT: &str = "AI 回應格式異常，無法解析為結構化報告";

// ── Analysis report ──────────────────────────────────────────────────────

/// The scored assessment block of an [`AnalysisReport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeAssessment {
    /// Overall resume score. Clamped into 0..=100 on deserialisation —
    /// models occasionally emit values outside the requested range.
    #[serde(deserialize_with = "clamp_score")]
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub overall_comment: String,
}

/// A job the candidate is close to qualifying for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecommendation {
    pub title: String,
    pub reason: String,
    #[serde(default)]
    pub missing_skills: Vec<String>,
}

/// A portfolio project suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecommendation {
    pub name: String,
    pub difficulty: Difficulty,
    pub tech_stack: String,
    pub description: String,
}

/// One step of the suggested learning path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningStep {
    pub topic: String,
    pub resource: String,
    pub priority: Priority,
    pub url: String,
}

/// Project difficulty, in the reference system's presentation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "易")]
    Easy,
    #[serde(rename = "中")]
    Medium,
    #[serde(rename = "難")]
    Hard,
}

/// Learning-path priority, in the reference system's presentation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "高")]
    High,
    #[serde(rename = "中")]
    Medium,
    #[serde(rename = "低")]
    Low,
}

/// The canonical structured output of [`crate::pipeline::analyze::Analyzer::analyze_resume`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis: ResumeAssessment,
    #[serde(default)]
    pub job_recommendations: Vec<JobRecommendation>,
    #[serde(default)]
    pub project_recommendations: Vec<ProjectRecommendation>,
    #[serde(default)]
    pub learning_path: Vec<LearningStep>,
}

impl AnalysisReport {
    /// The degraded-but-well-shaped report: zeroed score, empty lists, the
    /// fixed sentinel comment. Substituted when the model response fails to
    /// parse; the unparsed response rides alongside in
    /// [`AnalysisOutcome::Degraded`].
    pub fn degraded() -> Self {
        Self {
            analysis: ResumeAssessment {
                score: 0,
                strengths: Vec::new(),
                weaknesses: Vec::new(),
                overall_comment: DEGRADED_COMMENT.to_string(),
            },
            job_recommendations: Vec::new(),
            project_recommendations: Vec::new(),
            learning_path: Vec::new(),
        }
    }
}

fn clamp_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 100) as u8)
}

/// One of the three possible results of a resume analysis.
///
/// Serialised with a `kind` discriminant so downstream consumers branch on
/// an explicit field rather than probing for keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The model returned valid JSON matching the schema.
    Report { report: AnalysisReport },
    /// The model answered but the response did not parse; `report` is the
    /// sentinel shape and `raw_text` is the unparsed response, verbatim.
    Degraded { report: AnalysisReport, raw_text: String },
    /// The provider itself failed (unconfigured, network, auth, quota).
    ProviderFailure { error: String },
}

// ── Project suggestions ──────────────────────────────────────────────────

/// Parsed payload of a successful project-suggestion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSuggestions {
    #[serde(default)]
    pub projects: Vec<ProjectRecommendation>,
}

/// Result of [`crate::pipeline::analyze::Analyzer::suggest_projects`],
/// following the same discipline as [`AnalysisOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionOutcome {
    Suggestions { suggestions: ProjectSuggestions },
    Degraded { raw_text: String },
    ProviderFailure { error: String },
}

// ── Gap report ───────────────────────────────────────────────────────────

/// Which path produced a [`GapReport`]. The only signal callers get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapSource {
    #[serde(rename = "AI Analysis")]
    Ai,
    #[serde(rename = "Local Keyword Match")]
    LocalKeywordMatch,
}

/// Skill-gap comparison of a resume against a job description.
///
/// Always a valid report: every failure mode of the AI path resolves into
/// the keyword fallback, so this type has no error variant by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub missing_skills: Vec<String>,
    pub matching_skills: Vec<String>,
    pub score: u8,
    pub source: GapSource,
}

// ── Transcript ───────────────────────────────────────────────────────────

/// Failure class of a transcription attempt, mirrored from
/// [`TranscribeError`] into a serialisable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptFailure {
    ModelLoad,
    Device,
    Inference,
    Decode,
}

/// Outcome of the transcription stage.
///
/// A tagged result, not a sentinel string: transcript content and error
/// text can never be confused, even for a resume that happens to contain
/// error-like phrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Transcript {
    Ok { text: String },
    Failed { failure: TranscriptFailure, detail: String },
}

impl Transcript {
    pub fn text(&self) -> Option<&str> {
        match self {
            Transcript::Ok { text } => Some(text),
            Transcript::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Transcript::Ok { .. })
    }
}

impl From<&TranscribeError> for Transcript {
    fn from(e: &TranscribeError) -> Self {
        let failure = match e {
            TranscribeError::Load(_) => TranscriptFailure::ModelLoad,
            TranscribeError::Device { .. } => TranscriptFailure::Device,
            TranscribeError::Inference { .. } => TranscriptFailure::Inference,
            TranscribeError::Decode { .. } => TranscriptFailure::Decode,
        };
        Transcript::Failed {
            failure,
            detail: e.to_string(),
        }
    }
}

// ── Pipeline output ──────────────────────────────────────────────────────

/// Wall-clock timing of each pipeline stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub normalize_ms: u64,
    pub transcribe_ms: u64,
    pub analyze_ms: u64,
    pub total_ms: u64,
}

/// The unified result of one document's path through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Transcription outcome; `Failed` carries the typed cause.
    pub transcript: Transcript,
    /// Structured analysis. `None` exactly when transcription failed —
    /// there is no text to analyse.
    pub analysis: Option<AnalysisOutcome>,
    /// Skill-gap report, present when a job description was supplied.
    pub gap: Option<GapReport>,
    pub timings: StageTimings,
}
