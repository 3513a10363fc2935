//! Token-level client for a sidecar vision-model host.
//!
//! The reference deployment keeps the vision-language model in a separate
//! OCR service process that owns the accelerator. This client maps the
//! crate's [`VisionModel`] capability onto that service's HTTP surface:
//!
//! ```text
//! POST /load       -> {}                                   load weights
//! POST /encode     -> {"tokens": [u32]}                    chat template
//! POST /generate   -> {"tokens": [u32]}                    full output stream
//! POST /decode     -> {"text": "..."}                      skip special tokens
//! POST /release    -> {}                                   free device pools
//! ```
//!
//! `load` succeeding is what makes [`RemoteVisionLoader::load`] succeed, so
//! the host's load-once lifecycle maps one-to-one onto the sidecar loading
//! its weights; a sidecar that is down or out of memory surfaces as a
//! retryable [`ModelLoadError`].
//!
//! Error bodies carry a `kind` field so device/memory failures on the
//! sidecar arrive as [`ProviderError::Device`] and trigger the
//! transcriber's proactive memory release.

use crate::error::{ModelLoadError, ProviderError};
use crate::pipeline::normalize::CanonicalImage;
use crate::provider::{VisionModel, VisionModelLoader};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct EncodeRequest<'a> {
    image_png_base64: String,
    instruction: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    tokens: &'a [u32],
    max_new_tokens: usize,
}

#[derive(Debug, Serialize)]
struct DecodeRequest<'a> {
    tokens: &'a [u32],
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    tokens: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    kind: String,
}

/// Classify an error response from the sidecar.
fn classify_error(status: u16, body: &str) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if parsed.kind == "device" {
            return ProviderError::Device {
                detail: parsed.error,
            };
        }
        if !parsed.error.is_empty() {
            return ProviderError::Api {
                status,
                message: parsed.error,
            };
        }
    }
    ProviderError::Api {
        status,
        message: body.to_string(),
    }
}

/// A vision model living in a sidecar host process.
#[derive(Debug)]
pub struct RemoteVisionModel {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteVisionModel {
    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text));
        }

        response.json().await.map_err(|e| ProviderError::Transport {
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl VisionModel for RemoteVisionModel {
    async fn encode_prompt(
        &self,
        image: &CanonicalImage,
        instruction: &str,
    ) -> Result<Vec<u32>, ProviderError> {
        let image_png_base64 = image.to_png_base64().map_err(|e| ProviderError::Decode {
            detail: format!("PNG encoding failed: {e}"),
        })?;
        let resp: TokensResponse = self
            .post_json(
                "encode",
                &EncodeRequest {
                    image_png_base64,
                    instruction,
                },
            )
            .await?;
        debug!("encoded prompt: {} tokens", resp.tokens.len());
        Ok(resp.tokens)
    }

    async fn generate(
        &self,
        prompt_tokens: &[u32],
        max_new_tokens: usize,
    ) -> Result<Vec<u32>, ProviderError> {
        let resp: TokensResponse = self
            .post_json(
                "generate",
                &GenerateRequest {
                    tokens: prompt_tokens,
                    max_new_tokens,
                },
            )
            .await?;
        Ok(resp.tokens)
    }

    async fn decode(&self, tokens: &[u32]) -> Result<String, ProviderError> {
        let resp: TextResponse = self.post_json("decode", &DecodeRequest { tokens }).await?;
        Ok(resp.text)
    }

    async fn release_device_memory(&self) {
        let url = format!("{}/release", self.base_url);
        if let Err(e) = self.client.post(&url).send().await {
            warn!("device memory release request failed: {e}");
        }
    }
}

/// Loader that asks the sidecar to load its weights.
pub struct RemoteVisionLoader {
    base_url: String,
    load_timeout: Duration,
}

impl RemoteVisionLoader {
    /// `base_url` without a trailing slash, e.g. `http://127.0.0.1:8765`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            load_timeout: Duration::from_secs(300),
        }
    }

    /// Weight loading on a cold sidecar can take minutes; default 300 s.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }
}

#[async_trait]
impl VisionModelLoader for RemoteVisionLoader {
    async fn load(&self) -> Result<Arc<dyn VisionModel>, ModelLoadError> {
        let client = reqwest::Client::builder()
            .timeout(self.load_timeout)
            .build()
            .map_err(|e| ModelLoadError::new(e.to_string()))?;

        let url = format!("{}/load", self.base_url);
        let response = client
            .post(&url)
            .send()
            .await
            .map_err(|e| ModelLoadError::new(format!("OCR host unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelLoadError::new(format!(
                "OCR host refused to load model (status {status}): {body}"
            )));
        }

        debug!("sidecar vision model loaded at {}", self.base_url);
        Ok(Arc::new(RemoteVisionModel {
            // Inference calls get no overall timeout; generation legitimately
            // runs for tens of seconds and callers impose their own limits.
            client: reqwest::Client::new(),
            base_url: self.base_url.clone(),
        }))
    }
}
