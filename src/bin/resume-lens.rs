//! CLI binary for resume-lens.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, wires providers from the environment, and prints the
//! pipeline output as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use resume_lens::{
    Analyzer, GeminiText, ModelHost, Pipeline, PipelineConfig, RemoteVisionLoader, TextModel,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a resume image (needs GEMINI_API_KEY and an OCR host)
  resume-lens resume.png

  # Multi-page PDF, scored against a job description
  resume-lens resume.pdf --job-description jd.txt

  # Point at the sidecar OCR host explicitly
  resume-lens resume.pdf --ocr-url http://127.0.0.1:8765

  # Write the JSON report to a file
  resume-lens resume.png -o report.json

ENVIRONMENT:
  GEMINI_API_KEY        enables AI analysis (otherwise keyword fallback only)
  RESUME_LENS_OCR_URL   default for --ocr-url
"#;

/// Analyse a resume document (image or PDF).
#[derive(Debug, Parser)]
#[command(name = "resume-lens", version, about, after_help = AFTER_HELP)]
struct Cli {
    /// Resume document: png, jpg, jpeg, bmp, gif, webp, tiff, or pdf
    input: PathBuf,

    /// Text file containing a job description to score the resume against
    #[arg(short = 'j', long)]
    job_description: Option<PathBuf>,

    /// Base URL of the sidecar OCR host
    #[arg(long, env = "RESUME_LENS_OCR_URL")]
    ocr_url: Option<String>,

    /// Maximum PDF pages folded into the canonical image
    #[arg(long, default_value_t = 3)]
    max_pdf_pages: usize,

    /// Maximum new tokens for transcription
    #[arg(long, default_value_t = 1500)]
    max_new_tokens: usize,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = PipelineConfig::builder()
        .max_pdf_pages(cli.max_pdf_pages)
        .max_new_tokens(cli.max_new_tokens)
        .build()?;

    let host = Arc::new(match &cli.ocr_url {
        Some(url) => ModelHost::new(RemoteVisionLoader::new(url.clone())),
        None => {
            tracing::warn!("no OCR host configured; transcription will be reported as failed");
            ModelHost::unconfigured()
        }
    });

    let text_model = match GeminiText::from_env() {
        Ok(model) => Some(Arc::new(model) as Arc<dyn TextModel>),
        Err(e) => {
            tracing::warn!("{e}; gap analysis will use the local keyword fallback");
            None
        }
    };
    let analyzer = Analyzer::new(text_model, &config);

    let pipeline = Pipeline::new(config, host, analyzer);

    let jd_text = match &cli.job_description {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading job description '{}'", path.display()))?,
        ),
        None => None,
    };

    let output = match &jd_text {
        Some(jd) => pipeline.run_with_job_description(&cli.input, jd).await?,
        None => pipeline.run(&cli.input).await?,
    };

    let json = serde_json::to_string_pretty(&output).context("serialising output")?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing output '{}'", path.display()))?;
            eprintln!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "resume_lens=info",
        1 => "resume_lens=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
