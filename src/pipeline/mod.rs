//! Pipeline stages for document intelligence.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different rendering backend or model host)
//! without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ transcribe ──▶ analyze
//! (raster)      (VLM, tokens)  (LLM, strict JSON)
//!                                   │ any failure
//!                                   ▼
//!                               fallback
//!                               (keyword overlap)
//! ```
//!
//! 1. [`normalize`]   — image/PDF → one canonical RGB raster; pdfium work
//!    runs in `spawn_blocking` because it is not async-safe
//! 2. [`transcribe`]  — drive the vision model, trim the prompt echo from
//!    the output token stream, decode
//! 3. [`analyze`]     — strict-JSON analysis with fence-strip and
//!    parse-recovery; the only stage with hosted-API I/O
//! 4. [`fallback`]    — deterministic keyword gap matcher; the floor every
//!    other path may degrade into

pub mod analyze;
pub mod fallback;
pub mod normalize;
pub mod transcribe;
