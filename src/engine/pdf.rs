//! PDF input: bind pdfium and rasterise pages at the requested density.
//!
//! pdfium composites annotations and form fields into the page bitmap when
//! asked to, which is exactly the "flatten layers" step a PDF needs; the
//! resulting bitmap is handed to [`RasterPage`] like any decoded frame.
//!
//! ## Why target pixel sizes instead of a scale factor?
//!
//! PDF user space is 72 points per inch. Computing the target width and
//! height from `points × density / 72` keeps the rendered size predictable
//! and lets us refuse absurd requests (a poster at 5000 DPI) before pdfium
//! tries to allocate the bitmap.

use super::RasterPage;
use crate::error::EngineError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Largest edge, in pixels, we will ask pdfium to allocate.
const MAX_EDGE_PX: f64 = 65_535.0;

/// Largest page area, in pixels (1 GiB of RGBA).
const MAX_AREA_PX: u64 = 1 << 28;

/// Bind the pdfium shared library.
///
/// `library` may point at the library file itself or at the directory that
/// contains it; `None` uses the platform's library search path.
pub(crate) fn bind(library: Option<&Path>) -> Result<Pdfium, EngineError> {
    let bindings = match library {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| EngineError::Unavailable {
        backend: "pdfium",
        detail: format!("{:?}", e),
    })?;

    info!(
        "pdfium bound from {}",
        library.map_or_else(|| "system library path".to_string(), |p| p.display().to_string())
    );
    Ok(Pdfium::new(bindings))
}

/// Load a PDF held in memory.
pub(crate) fn load<'a>(pdfium: &'a Pdfium, bytes: &[u8]) -> Result<PdfDocument<'a>, EngineError> {
    pdfium
        .load_pdf_from_byte_vec(bytes.to_vec(), None)
        .map_err(|e| EngineError::Decode(format!("{:?}", e)))
}

pub(crate) fn page_count(document: &PdfDocument<'_>) -> usize {
    document.pages().len() as usize
}

/// Rasterise page `index` (0-based) at `density` DPI.
pub(crate) fn render_page(
    document: &PdfDocument<'_>,
    index: usize,
    density: f64,
) -> Result<RasterPage, EngineError> {
    let count = page_count(document);
    if index >= count {
        return Err(EngineError::PageOutOfRange { index, count });
    }

    let page = document
        .pages()
        .get(index as u16)
        .map_err(|e| EngineError::Render(format!("page {index}: {:?}", e)))?;

    let (width, height) = target_size(page.width().value, page.height().value, density)?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height)
        .render_form_data(true)
        .render_annotations(true);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| EngineError::Render(format!("page {index}: {:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        index,
        image.width(),
        image.height()
    );

    Ok(RasterPage::new(image))
}

fn target_size(width_pt: f32, height_pt: f32, density: f64) -> Result<(i32, i32), EngineError> {
    let width = target_pixels(width_pt, density)?;
    let height = target_pixels(height_pt, density)?;
    let area = u64::from(width.unsigned_abs()) * u64::from(height.unsigned_abs());
    if area > MAX_AREA_PX {
        return Err(EngineError::InvalidArgument(format!(
            "{width_pt}x{height_pt}pt at {density} DPI gives {width}x{height}px, \
             over the {MAX_AREA_PX}px limit"
        )));
    }
    Ok((width, height))
}

fn target_pixels(points: f32, density: f64) -> Result<i32, EngineError> {
    let pixels = (f64::from(points) * density / POINTS_PER_INCH).round();
    if !(1.0..=MAX_EDGE_PX).contains(&pixels) {
        return Err(EngineError::InvalidArgument(format!(
            "{points}pt at {density} DPI gives a {pixels}px edge"
        )));
    }
    Ok(pixels as i32)
}
