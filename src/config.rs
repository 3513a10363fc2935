//! Configuration for the document intelligence pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across invocations, serialise them for logging,
//! and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on well-documented
//! defaults for the rest; `build()` validates the combination once.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Configuration for one document's path through the pipeline.
///
/// # Example
/// ```rust
/// use resume_lens::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .max_pdf_pages(2)
///     .max_new_tokens(1000)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of PDF pages included in the canonical image. Default: 3.
    ///
    /// Resumes are short documents; pages past the third rarely carry skill
    /// content worth the render and inference cost. Excess pages are dropped
    /// with a warning, never an error.
    pub max_pdf_pages: usize,

    /// Upscale factor applied when rasterising each PDF page. Default: 2.0.
    ///
    /// Rendering at 2x native size keeps small resume fonts legible to the
    /// vision model. Higher factors grow memory quadratically for little
    /// accuracy gain on typical one-column resumes.
    pub page_upscale: f32,

    /// Maximum new tokens the vision model may generate per transcription.
    /// Default: 1500.
    ///
    /// A dense resume page transcribes to well under 1500 tokens; the cap
    /// bounds a runaway generation without truncating real content.
    pub max_new_tokens: usize,

    /// Minimum job-description length (in characters) for the AI gap path.
    /// Default: 10.
    ///
    /// A JD shorter than this is too sparse for a meaningful model
    /// comparison; [`crate::pipeline::analyze::Analyzer::analyze_gap`] skips
    /// the model call entirely and answers from the keyword fallback.
    pub min_jd_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pdf_pages: 3,
            page_upscale: 2.0,
            max_new_tokens: 1500,
            min_jd_chars: 10,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn max_pdf_pages(mut self, n: usize) -> Self {
        self.config.max_pdf_pages = n.max(1);
        self
    }

    pub fn page_upscale(mut self, factor: f32) -> Self {
        self.config.page_upscale = factor.clamp(1.0, 4.0);
        self
    }

    pub fn max_new_tokens(mut self, n: usize) -> Self {
        self.config.max_new_tokens = n;
        self
    }

    pub fn min_jd_chars(mut self, n: usize) -> Self {
        self.config.min_jd_chars = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.max_pdf_pages == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_pdf_pages must be ≥ 1".into(),
            ));
        }
        if !(1.0..=4.0).contains(&c.page_upscale) {
            return Err(PipelineError::InvalidConfig(format!(
                "page_upscale must be 1.0–4.0, got {}",
                c.page_upscale
            )));
        }
        if c.max_new_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_new_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
