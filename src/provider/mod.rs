//! Capability traits for the two model boundaries the pipeline consumes.
//!
//! The reference system ran its vision model in-process and its text model
//! behind a hosted API, but the core treats both as replaceable
//! capabilities: anything that can render a chat template over an image,
//! generate tokens, and decode them can transcribe; anything that can turn
//! a prompt into text can analyse. Tests inject mocks through the same
//! seams.
//!
//! Two concrete implementations ship with the crate:
//!
//! * [`remote::RemoteVisionLoader`] — token-level client for a sidecar OCR
//!   host process
//! * [`gemini::GeminiText`] — hosted text-generation API client

use crate::error::{ModelLoadError, ProviderError};
use crate::pipeline::normalize::CanonicalImage;
use async_trait::async_trait;
use std::sync::Arc;

pub mod gemini;
pub mod remote;

/// A loaded vision-language model plus its companion pre/post-processor.
///
/// The three-step surface (encode, generate, decode) deliberately exposes
/// token sequences rather than finished text: the underlying model echoes
/// its full input context in its raw output stream, and the transcriber
/// must see both sequences to trim the echo before decoding.
#[async_trait]
pub trait VisionModel: Send + Sync + std::fmt::Debug {
    /// Render the chat template for one instruction turn (fixed instruction
    /// plus the image) into the model's input token sequence.
    async fn encode_prompt(
        &self,
        image: &CanonicalImage,
        instruction: &str,
    ) -> Result<Vec<u32>, ProviderError>;

    /// Run generation from the prompt tokens.
    ///
    /// Returns the model's **full** output stream — input echo included —
    /// capped at `max_new_tokens` newly generated tokens.
    async fn generate(
        &self,
        prompt_tokens: &[u32],
        max_new_tokens: usize,
    ) -> Result<Vec<u32>, ProviderError>;

    /// Decode a token sequence to text, skipping special/control tokens.
    async fn decode(&self, tokens: &[u32]) -> Result<String, ProviderError>;

    /// Release accelerator memory pools after a device-class failure.
    ///
    /// Best-effort; implementations must not fail from here.
    async fn release_device_memory(&self) {}
}

/// Constructs a [`VisionModel`] on demand.
///
/// [`crate::host::ModelHost`] calls `load` at most once per successful
/// load; a failed load is retried on the next transcription request.
#[async_trait]
pub trait VisionModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn VisionModel>, ModelLoadError>;
}

/// A text-generation capability: one prompt in, one text completion out.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}
