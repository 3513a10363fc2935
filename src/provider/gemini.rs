//! Hosted text-generation provider (Gemini `generateContent` API).
//!
//! The single point of HTTP contact for structured analysis. The analyzer
//! never trusts this provider's formatting promises — fence stripping and
//! parse recovery happen downstream — so this module stays a thin typed
//! wrapper: build request, check status, extract the first candidate's
//! text.
//!
//! No internal retry: each pipeline stage owns exactly one degradation
//! strategy, and for analysis that strategy is the keyword fallback, not a
//! second API call.

use crate::error::ProviderError;
use crate::provider::TextModel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model identifier, matching the reference deployment.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    // Absent when the response was safety-blocked; surfaces as EmptyContent.
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Text-generation client for the Gemini REST API.
pub struct GeminiText {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiText {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Construct from [`API_KEY_ENV`].
    ///
    /// An unset or empty key returns `NotConfigured`; callers typically
    /// respond by running the analyzer unconfigured so gap analysis
    /// degrades to the keyword fallback.
    pub fn from_env() -> Result<Self, ProviderError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(Self::new(key)),
            _ => Err(ProviderError::NotConfigured {
                provider: "gemini".to_string(),
                hint: format!("Set {API_KEY_ENV} to enable AI analysis."),
            }),
        }
    }
}

#[async_trait]
impl TextModel for GeminiText {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::Transport {
                detail: e.to_string(),
            })?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .filter(|t| !t.is_empty())
            .ok_or(ProviderError::EmptyContent)?;

        debug!("gemini completion: {} bytes", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_extraction_shape() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"score\": 80}"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            "{\"score\": 80}"
        );
    }

    #[test]
    fn empty_candidates_deserialise() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn from_env_requires_key() {
        // Not set in the test environment by default.
        std::env::remove_var(API_KEY_ENV);
        assert!(matches!(
            GeminiText::from_env(),
            Err(ProviderError::NotConfigured { .. })
        ));
    }
}
