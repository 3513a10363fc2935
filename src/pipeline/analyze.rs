//! Structured analysis: turn transcribed text into typed reports.
//!
//! Every operation here follows one discipline:
//!
//! 1. Build a prompt that demands JSON and forbids markdown fences
//!    ([`crate::prompts`]).
//! 2. **Defensively strip** fence markers from the response anyway — models
//!    are observed to violate the no-markdown instruction.
//! 3. Attempt a structured parse.
//! 4. On parse failure, degrade to a well-shaped substitute instead of
//!    erroring; on provider failure, return the typed failure variant.
//!
//! Gap analysis goes one step further: any failure at all — unconfigured
//! model, short job description, provider error, unparseable response —
//! resolves into the keyword fallback, so [`Analyzer::analyze_gap`] is
//! total and always produces a valid [`GapReport`].

use crate::config::PipelineConfig;
use crate::pipeline::fallback::analyze_gap_fallback;
use crate::prompts::{build_gap_prompt, build_projects_prompt, build_resume_analysis_prompt};
use crate::provider::TextModel;
use crate::report::{
    AnalysisOutcome, AnalysisReport, GapReport, GapSource, ProjectSuggestions, SuggestionOutcome,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Skills handed to [`Analyzer::suggest_projects`]: either an explicit list
/// or a comma-delimited string, as upstream callers supply both.
#[derive(Debug, Clone)]
pub enum SkillInput {
    List(Vec<String>),
    Csv(String),
}

impl SkillInput {
    /// Trimmed, non-empty keywords in input order.
    pub fn keywords(&self) -> Vec<String> {
        let raw: Vec<String> = match self {
            SkillInput::List(items) => items.clone(),
            SkillInput::Csv(s) => s.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl From<Vec<String>> for SkillInput {
    fn from(items: Vec<String>) -> Self {
        SkillInput::List(items)
    }
}

impl From<&str> for SkillInput {
    fn from(s: &str) -> Self {
        SkillInput::Csv(s.to_string())
    }
}

/// The gap fields requested from the model; `source` is never the model's
/// to set.
#[derive(Debug, Deserialize)]
struct GapFields {
    #[serde(default)]
    missing_skills: Vec<String>,
    #[serde(default)]
    matching_skills: Vec<String>,
    #[serde(default)]
    score: i64,
}

/// Structured analyzer over an optional text-generation model.
///
/// Constructed with `None` when no provider is configured; in that state
/// resume analysis reports a provider failure and gap analysis answers
/// from the keyword fallback.
pub struct Analyzer {
    model: Option<Arc<dyn TextModel>>,
    min_jd_chars: usize,
}

impl Analyzer {
    pub fn new(model: Option<Arc<dyn TextModel>>, config: &PipelineConfig) -> Self {
        Self {
            model,
            min_jd_chars: config.min_jd_chars,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Full resume analysis against the strict JSON contract.
    pub async fn analyze_resume(&self, resume_text: &str) -> AnalysisOutcome {
        let Some(model) = &self.model else {
            return AnalysisOutcome::ProviderFailure {
                error: "text model not configured".to_string(),
            };
        };

        let prompt = build_resume_analysis_prompt(resume_text);
        match model.generate(&prompt).await {
            Ok(raw) => match parse_lenient::<AnalysisReport>(&raw) {
                Ok(report) => AnalysisOutcome::Report { report },
                Err(e) => {
                    warn!("analysis response failed to parse, degrading: {e}");
                    AnalysisOutcome::Degraded {
                        report: AnalysisReport::degraded(),
                        raw_text: raw,
                    }
                }
            },
            Err(e) => {
                warn!("analysis provider failed: {e}");
                AnalysisOutcome::ProviderFailure {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Skill-gap comparison; never fails.
    ///
    /// Guard clause: with no model configured, or a job description shorter
    /// than the configured minimum, the model is never invoked — a JD that
    /// short is too sparse for a meaningful comparison and the keyword
    /// fallback answers directly.
    pub async fn analyze_gap(&self, resume_text: &str, jd_text: &str) -> GapReport {
        let Some(model) = &self.model else {
            return analyze_gap_fallback(resume_text, jd_text);
        };
        if jd_text.chars().count() < self.min_jd_chars {
            debug!(
                "job description under {} chars, skipping model call",
                self.min_jd_chars
            );
            return analyze_gap_fallback(resume_text, jd_text);
        }

        let prompt = build_gap_prompt(resume_text, jd_text);
        match model.generate(&prompt).await {
            Ok(raw) => match parse_lenient::<GapFields>(&raw) {
                Ok(fields) => GapReport {
                    missing_skills: fields.missing_skills,
                    matching_skills: fields.matching_skills,
                    score: fields.score.clamp(0, 100) as u8,
                    source: GapSource::Ai,
                },
                Err(e) => {
                    warn!("gap response failed to parse, falling back: {e}");
                    analyze_gap_fallback(resume_text, jd_text)
                }
            },
            Err(e) => {
                warn!("gap provider failed, falling back: {e}");
                analyze_gap_fallback(resume_text, jd_text)
            }
        }
    }

    /// Portfolio project suggestions from a skill list and interests line.
    pub async fn suggest_projects(
        &self,
        skills: &SkillInput,
        interests: &str,
    ) -> SuggestionOutcome {
        let Some(model) = &self.model else {
            return SuggestionOutcome::ProviderFailure {
                error: "text model not configured".to_string(),
            };
        };

        let prompt = build_projects_prompt(&skills.keywords(), interests);
        match model.generate(&prompt).await {
            Ok(raw) => match parse_lenient::<ProjectSuggestions>(&raw) {
                Ok(suggestions) => SuggestionOutcome::Suggestions { suggestions },
                Err(e) => {
                    warn!("project response failed to parse, degrading: {e}");
                    SuggestionOutcome::Degraded { raw_text: raw }
                }
            },
            Err(e) => {
                warn!("project provider failed: {e}");
                SuggestionOutcome::ProviderFailure {
                    error: e.to_string(),
                }
            }
        }
    }
}

// ── Tolerant parsing ─────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip an outer markdown fence, if present, without touching inner text.
fn strip_json_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Fence-strip then parse. The only tolerance applied is removing the
/// wrapper the prompt already forbade; the payload itself must parse.
fn parse_lenient<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_json_fences(raw).trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::report::DEGRADED_COMMENT;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted model: pops one canned response per call and counts calls.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn with(responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::EmptyContent))
        }
    }

    fn analyzer(model: Arc<ScriptedModel>) -> Analyzer {
        Analyzer::new(Some(model), &PipelineConfig::default())
    }

    const VALID_REPORT: &str = r#"{
        "analysis": {
            "score": 72,
            "strengths": ["clear project history"],
            "weaknesses": ["no metrics"],
            "overall_comment": "solid junior resume"
        },
        "job_recommendations": [
            {"title": "Backend Engineer", "reason": "Python depth", "missing_skills": ["Docker"]}
        ],
        "project_recommendations": [
            {"name": "Job board", "difficulty": "中", "tech_stack": "Flask, React", "description": "CRUD app"}
        ],
        "learning_path": [
            {"topic": "Docker", "resource": "official docs", "priority": "高", "url": "https://docs.docker.com"}
        ]
    }"#;

    #[tokio::test]
    async fn valid_json_parses_to_full_report() {
        let model = ScriptedModel::with(vec![Ok(VALID_REPORT.to_string())]);
        let outcome = analyzer(Arc::clone(&model)).analyze_resume("resume").await;

        match outcome {
            AnalysisOutcome::Report { report } => {
                assert_eq!(report.analysis.score, 72);
                assert!(report.analysis.score <= 100);
                assert_eq!(report.job_recommendations.len(), 1);
                // The happy-path JSON must carry no raw_text escape field.
                let json = serde_json::to_value(AnalysisOutcome::Report { report }).unwrap();
                assert!(json.get("raw_text").is_none());
            }
            other => panic!("expected Report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fenced_response_parses_identically() {
        let fenced = format!("```json\n{VALID_REPORT}\n```");
        let model = ScriptedModel::with(vec![Ok(VALID_REPORT.to_string()), Ok(fenced)]);
        let analyzer = analyzer(Arc::clone(&model));

        let plain = analyzer.analyze_resume("resume").await;
        let stripped = analyzer.analyze_resume("resume").await;

        let plain = serde_json::to_value(plain).unwrap();
        let stripped = serde_json::to_value(stripped).unwrap();
        assert_eq!(plain, stripped);
    }

    #[tokio::test]
    async fn malformed_response_degrades_with_raw_text_verbatim() {
        let garbage = "I'm sorry, here is your analysis: score 72!";
        let model = ScriptedModel::with(vec![Ok(garbage.to_string())]);
        let outcome = analyzer(model).analyze_resume("resume").await;

        match outcome {
            AnalysisOutcome::Degraded { report, raw_text } => {
                assert_eq!(report.analysis.score, 0);
                assert_eq!(report.analysis.overall_comment, DEGRADED_COMMENT);
                assert_eq!(raw_text, garbage);
            }
            other => panic!("expected Degraded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_error_is_the_third_shape() {
        let model = ScriptedModel::with(vec![Err(ProviderError::Api {
            status: 429,
            message: "quota exhausted".into(),
        })]);
        let outcome = analyzer(model).analyze_resume("resume").await;

        match outcome {
            AnalysisOutcome::ProviderFailure { error } => {
                assert!(error.contains("429"));
            }
            other => panic!("expected ProviderFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_analyzer_reports_provider_failure() {
        let analyzer = Analyzer::new(None, &PipelineConfig::default());
        let outcome = analyzer.analyze_resume("resume").await;
        assert!(matches!(outcome, AnalysisOutcome::ProviderFailure { .. }));
    }

    #[tokio::test]
    async fn short_jd_never_invokes_the_model() {
        let model = ScriptedModel::with(vec![Ok("{}".to_string())]);
        let analyzer = analyzer(Arc::clone(&model));

        let report = analyzer.analyze_gap("Python resume", "short").await;
        assert_eq!(model.call_count(), 0);
        assert_eq!(report.source, GapSource::LocalKeywordMatch);
    }

    #[tokio::test]
    async fn unconfigured_gap_uses_fallback() {
        let analyzer = Analyzer::new(None, &PipelineConfig::default());
        let report = analyzer
            .analyze_gap("Python, React", "Must know Python and Docker")
            .await;
        assert_eq!(report.source, GapSource::LocalKeywordMatch);
        assert_eq!(report.score, 50);
    }

    #[tokio::test]
    async fn ai_gap_path_labels_source_and_clamps_score() {
        let model = ScriptedModel::with(vec![Ok(
            r#"{"missing_skills": ["docker"], "matching_skills": ["python"], "score": 150}"#
                .to_string(),
        )]);
        let report = analyzer(model)
            .analyze_gap("resume text here", "a job description long enough")
            .await;

        assert_eq!(report.source, GapSource::Ai);
        assert_eq!(report.score, 100);
        assert_eq!(report.missing_skills, vec!["docker"]);
    }

    #[tokio::test]
    async fn unparseable_gap_response_falls_back() {
        let model = ScriptedModel::with(vec![Ok("not json at all".to_string())]);
        let report = analyzer(Arc::clone(&model))
            .analyze_gap("Python, React", "Must know Python and Docker")
            .await;

        assert_eq!(model.call_count(), 1);
        assert_eq!(report.source, GapSource::LocalKeywordMatch);
        assert_eq!(report.score, 50);
    }

    #[tokio::test]
    async fn gap_provider_error_falls_back() {
        let model = ScriptedModel::with(vec![Err(ProviderError::Transport {
            detail: "connection refused".into(),
        })]);
        let report = analyzer(model)
            .analyze_gap("Python, React", "Must know Python and Docker")
            .await;
        assert_eq!(report.source, GapSource::LocalKeywordMatch);
    }

    #[tokio::test]
    async fn suggest_projects_follows_the_same_discipline() {
        let fenced = "```json\n{\"projects\": [{\"name\": \"CLI tool\", \"difficulty\": \"易\", \"tech_stack\": \"Rust\", \"description\": \"parser\"}]}\n```";
        let model = ScriptedModel::with(vec![
            Ok(fenced.to_string()),
            Ok("nonsense".to_string()),
        ]);
        let analyzer = analyzer(model);

        let ok = analyzer
            .suggest_projects(&SkillInput::from("Rust, SQL"), "")
            .await;
        match ok {
            SuggestionOutcome::Suggestions { suggestions } => {
                assert_eq!(suggestions.projects.len(), 1);
            }
            other => panic!("expected Suggestions, got {other:?}"),
        }

        let degraded = analyzer
            .suggest_projects(&SkillInput::from("Rust"), "")
            .await;
        assert!(matches!(degraded, SuggestionOutcome::Degraded { raw_text } if raw_text == "nonsense"));
    }

    #[test]
    fn skill_input_cleans_csv_and_lists() {
        assert_eq!(
            SkillInput::from("Python,  , NLP ,").keywords(),
            vec!["Python", "NLP"]
        );
        assert_eq!(
            SkillInput::from(vec!["  rust  ".to_string(), String::new()]).keywords(),
            vec!["rust"]
        );
    }

    #[test]
    fn fences_stripped_with_and_without_language_tag() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn inner_fences_survive_stripping() {
        let inner = "{\"comment\": \"use ``` for code\"}";
        let wrapped = format!("```json\n{inner}\n```");
        assert_eq!(strip_json_fences(&wrapped), inner);
    }
}
