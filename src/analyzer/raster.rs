//! First-page rasterisation of PDF uploads.
//!
//! pdfium wraps a C++ library with thread-local state that must not be
//! touched from async context, so rendering runs on the blocking pool and
//! the binding is created per call. Only page 1 is rendered: scanned post
//! is one document per file, and the first page carries the letterhead,
//! amounts and dates that classification needs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::debug;

/// Target width of the rendered page in pixels. Wide enough for small
/// print on an A4 letter to stay legible to the vision model.
const TARGET_WIDTH: i32 = 1600;

/// Cap on the rendered height, guarding against degenerate page sizes.
const MAX_HEIGHT: i32 = 4000;

#[derive(Debug, Error)]
pub enum RasterError {
    /// The file could not be opened as a PDF, or it has no pages.
    #[error("could not open PDF: {0}")]
    Open(String),

    /// pdfium failed while rendering page 1.
    #[error("could not render page 1: {0}")]
    Render(String),

    /// The blocking render task panicked or was cancelled.
    #[error("render task failed: {0}")]
    Task(String),
}

/// Renders page 1 of a PDF to an image.
///
/// A trait so the analyzer can be exercised with a failing or fixed-image
/// implementation instead of a real pdfium binding.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize_first_page(&self, pdf_path: &Path) -> Result<DynamicImage, RasterError>;
}

/// The pdfium-backed production rasterizer.
pub struct PdfiumRasterizer;

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn rasterize_first_page(&self, pdf_path: &Path) -> Result<DynamicImage, RasterError> {
        let path = pdf_path.to_path_buf();
        tokio::task::spawn_blocking(move || rasterize_blocking(&path))
            .await
            .map_err(|e| RasterError::Task(e.to_string()))?
    }
}

fn rasterize_blocking(path: &PathBuf) -> Result<DynamicImage, RasterError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| RasterError::Open(format!("{e:?}")))?;

    let page = document
        .pages()
        .get(0)
        .map_err(|e| RasterError::Open(format!("document has no readable first page: {e:?}")))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(TARGET_WIDTH)
        .set_maximum_height(MAX_HEIGHT);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| RasterError::Render(format!("{e:?}")))?;

    let image = bitmap.as_image();
    debug!(width = image.width(), height = image.height(), "rendered first page");
    Ok(image)
}
