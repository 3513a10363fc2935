//! Transcription: drive the vision model over the canonical image.
//!
//! This stage is intentionally thin — the instruction text lives in
//! [`crate::prompts`] and the model mechanics behind the
//! [`VisionModel`] trait — but it owns two behaviours that are easy to get
//! wrong:
//!
//! ## Prompt-echo trimming
//!
//! The underlying model family echoes its full input context at the head of
//! its raw output stream. The transcriber slices away a prefix equal in
//! length to the input token sequence before decoding; skipping this step
//! corrupts every transcript with the rendered prompt itself.
//!
//! ## Device-failure cleanup
//!
//! A device/memory-class failure mid-generation can leave allocator pools
//! full on the accelerator. The transcriber asks the model to release its
//! device memory before surfacing the error, so the next request starts
//! from a clean device.

use crate::config::PipelineConfig;
use crate::error::{ProviderError, TranscribeError};
use crate::host::ModelHost;
use crate::pipeline::normalize::CanonicalImage;
use crate::prompts::TRANSCRIBE_INSTRUCTION;
use crate::provider::VisionModel;
use tracing::{debug, warn};

/// Transcribe the canonical image into plain text.
///
/// Loads the model on first use (retrying a previously failed load), holds
/// the host's single inference permit for the duration of the model calls,
/// and returns a typed error on any failure — the transcript string never
/// doubles as an error channel.
pub async fn transcribe(
    host: &ModelHost,
    image: &CanonicalImage,
    config: &PipelineConfig,
) -> Result<String, TranscribeError> {
    let model = host.ensure_loaded().await?;
    let _permit = host.inference_permit().await?;

    let prompt_tokens = match model.encode_prompt(image, TRANSCRIBE_INSTRUCTION).await {
        Ok(tokens) => tokens,
        Err(e) => return Err(fail(model.as_ref(), e).await),
    };
    debug!("chat template rendered: {} prompt tokens", prompt_tokens.len());

    let output_tokens = match model.generate(&prompt_tokens, config.max_new_tokens).await {
        Ok(tokens) => tokens,
        Err(e) => return Err(fail(model.as_ref(), e).await),
    };

    // The output stream echoes the prompt; only the tail is new content.
    let echo_len = prompt_tokens.len().min(output_tokens.len());
    let generated = &output_tokens[echo_len..];
    debug!(
        "generation finished: {} output tokens, {} newly generated",
        output_tokens.len(),
        generated.len()
    );

    let text = match model.decode(generated).await {
        Ok(text) => text,
        Err(e) => return Err(fail(model.as_ref(), e).await),
    };

    Ok(text.trim().to_string())
}

/// Convert a provider failure into a [`TranscribeError`], releasing device
/// memory pools first when the failure is device-class.
async fn fail(model: &dyn VisionModel, e: ProviderError) -> TranscribeError {
    if e.is_device_failure() {
        warn!("device failure during transcription, releasing device memory: {e}");
        model.release_device_memory().await;
    }
    e.into()
}
