//! Document normalisation: arbitrary upload → one canonical raster image.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a dedicated
//! thread pool so Tokio workers do not stall during CPU-heavy rendering;
//! image decoding rides the same path for the same reason.
//!
//! ## Why one tall image instead of per-page images?
//!
//! The transcription stage makes exactly one model call per document. A
//! multi-page resume is therefore flattened into a single vertical strip —
//! pages rendered at a fixed upscale, stacked top-to-bottom, each centred
//! on the widest page's width over a white background — so the model sees
//! the whole document in one instruction turn.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops, Rgb, RgbImage};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Image extensions the normaliser opens directly.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff"];

/// The single normalised raster representation of an input document.
///
/// Always RGB; alpha and palettes from source images are discarded. Owned
/// exclusively by the pipeline invocation that created it and dropped
/// right after transcription.
#[derive(Debug)]
pub struct CanonicalImage {
    image: RgbImage,
}

impl CanonicalImage {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }

    /// Encode as base64 PNG for providers that take the image over a wire.
    ///
    /// PNG over JPEG: lossless compression preserves text crispness, and
    /// compression artefacts on rendered text measurably degrade OCR
    /// accuracy.
    pub fn to_png_base64(&self) -> Result<String, image::ImageError> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(STANDARD.encode(&buf))
    }
}

/// Normalise an uploaded document into one [`CanonicalImage`].
///
/// Dispatches on the file extension: known image types open directly and
/// coerce to RGB; `.pdf` renders up to `config.max_pdf_pages` pages and
/// stitches them. Anything else is `UnsupportedFormat`.
pub async fn normalize(
    path: &Path,
    config: &PipelineConfig,
) -> Result<CanonicalImage, PipelineError> {
    check_readable(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let owned_path = path.to_path_buf();
    let result = if extension == "pdf" {
        let max_pages = config.max_pdf_pages;
        let upscale = config.page_upscale;
        tokio::task::spawn_blocking(move || render_pdf_blocking(&owned_path, max_pages, upscale))
            .await
    } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        tokio::task::spawn_blocking(move || open_image_blocking(&owned_path)).await
    } else {
        return Err(PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    };

    result.map_err(|e| PipelineError::Internal(format!("normalise task panicked: {e}")))?
}

fn check_readable(path: &Path) -> Result<(), PipelineError> {
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(PipelineError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(PipelineError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

fn open_image_blocking(path: &Path) -> Result<CanonicalImage, PipelineError> {
    let img = image::open(path).map_err(|e| PipelineError::ImageDecode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let rgb = img.to_rgb8();
    debug!("opened image {} → {}x{}", path.display(), rgb.width(), rgb.height());
    Ok(CanonicalImage::new(rgb))
}

/// Render the first `max_pages` PDF pages and stitch them vertically.
fn render_pdf_blocking(
    path: &Path,
    max_pages: usize,
    upscale: f32,
) -> Result<CanonicalImage, PipelineError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PipelineError::CorruptPdf {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    debug!("PDF loaded: {} pages", total_pages);

    if total_pages == 0 {
        return Err(PipelineError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    let take = total_pages.min(max_pages);
    if take < total_pages {
        warn!(
            "PDF has {} pages; only the first {} are analysed",
            total_pages, take
        );
    }

    let mut rendered: Vec<RgbImage> = Vec::with_capacity(take);
    for idx in 0..take {
        let page = match pages.get(idx as u16) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping page {}: {:?}", idx + 1, e);
                continue;
            }
        };

        // Page dimensions are in PDF points; a 2x target width renders the
        // page at twice its native raster size, aspect preserved.
        let target_width = (page.width().value * upscale).round().max(1.0) as i32;
        let render_config = PdfRenderConfig::new().set_target_width(target_width);

        match page.render_with_config(&render_config) {
            Ok(bitmap) => {
                let img = bitmap.as_image().to_rgb8();
                debug!("rendered page {} → {}x{}", idx + 1, img.width(), img.height());
                rendered.push(img);
            }
            Err(e) => {
                warn!("page {} failed to render, skipping: {:?}", idx + 1, e);
            }
        };
    }

    if rendered.is_empty() {
        return Err(PipelineError::EmptyDocument {
            path: path.to_path_buf(),
        });
    }

    if rendered.len() == 1 {
        let only = rendered.pop().map(CanonicalImage::new);
        return only.ok_or_else(|| PipelineError::Internal("page vanished".into()));
    }

    Ok(CanonicalImage::new(stitch_pages(&rendered)))
}

/// Stack pages top-to-bottom on a white canvas sized
/// `(max_page_width, sum_of_page_heights)`, each page horizontally centred.
pub(crate) fn stitch_pages(pages: &[RgbImage]) -> RgbImage {
    let width = pages.iter().map(|p| p.width()).max().unwrap_or(1).max(1);
    let height = pages.iter().map(|p| p.height()).sum::<u32>().max(1);

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut y: i64 = 0;
    for page in pages {
        let x = i64::from((width - page.width()) / 2);
        imageops::overlay(&mut canvas, page, x, y);
        y += i64::from(page.height());
    }
    canvas
}
