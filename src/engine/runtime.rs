//! The process-wide engine runtime and its document handles.
//!
//! [`EngineRuntime`] is created once by the process entry point (binding
//! pdfium is the expensive, global part) and dropped once at shutdown. Every
//! request opens its own [`RuntimeDocument`], which sniffs the input and
//! routes it to the PDF or raster backend.

use super::{bitmap, pdf, DocumentHandle, PageHandle, RasterEngine, RasterPage};
use crate::error::EngineError;
use image::DynamicImage;
use pdfium_render::prelude::{PdfDocument, Pdfium};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

const PDF_MAGIC: &[u8] = b"%PDF";

/// How far into the input a PDF header may start, as pdfium allows.
const PDF_HEADER_WINDOW: usize = 1024;

/// `%PDF` at the start, or anywhere in the first KiB of input that no
/// raster decoder recognises (a BOM or mail headers before the PDF).
fn looks_like_pdf(bytes: &[u8]) -> bool {
    if bytes.starts_with(PDF_MAGIC) {
        return true;
    }
    if image::guess_format(bytes).is_ok() {
        return false;
    }
    bytes[..bytes.len().min(PDF_HEADER_WINDOW)]
        .windows(PDF_MAGIC.len())
        .any(|window| window == PDF_MAGIC)
}

/// Production rasterization engine.
pub struct EngineRuntime {
    pdfium: Option<Pdfium>,
}

impl EngineRuntime {
    /// Bind pdfium and make the runtime ready for concurrent use.
    pub fn initialize(pdfium_library: Option<&Path>) -> Result<Self, EngineError> {
        let pdfium = pdf::bind(pdfium_library)?;
        info!("Rasterization engine initialised (pdf + raster backends)");
        Ok(Self {
            pdfium: Some(pdfium),
        })
    }

    /// A runtime that only decodes raster images; PDF input is refused.
    pub fn raster_only() -> Self {
        info!("Rasterization engine initialised (raster backend only)");
        Self { pdfium: None }
    }

    pub fn supports_pdf(&self) -> bool {
        self.pdfium.is_some()
    }
}

impl fmt::Debug for EngineRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("pdfium", &self.pdfium.as_ref().map(|_| "<bound>"))
            .finish()
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        info!("Rasterization engine terminated");
    }
}

impl RasterEngine for EngineRuntime {
    fn open(&self) -> Result<Box<dyn DocumentHandle + '_>, EngineError> {
        Ok(Box::new(RuntimeDocument::new(self.pdfium.as_ref())))
    }
}

/// What a [`RuntimeDocument`] currently holds.
enum Content<'a> {
    Empty,
    Pdf(PdfDocument<'a>),
    Frames(Vec<DynamicImage>),
}

/// A per-request document handle.
pub struct RuntimeDocument<'a> {
    pdfium: Option<&'a Pdfium>,
    density: Option<f64>,
    content: Content<'a>,
}

impl<'a> RuntimeDocument<'a> {
    fn new(pdfium: Option<&'a Pdfium>) -> Self {
        Self {
            pdfium,
            density: None,
            content: Content::Empty,
        }
    }
}

impl DocumentHandle for RuntimeDocument<'_> {
    fn set_resolution(&mut self, x_dpi: f64, y_dpi: f64) -> Result<(), EngineError> {
        for dpi in [x_dpi, y_dpi] {
            if !dpi.is_finite() || dpi <= 0.0 {
                return Err(EngineError::InvalidArgument(format!(
                    "resolution must be a positive number of DPI, got {dpi}"
                )));
            }
        }
        if x_dpi != y_dpi {
            return Err(EngineError::InvalidArgument(format!(
                "anisotropic resolution {x_dpi}x{y_dpi} is not supported"
            )));
        }
        self.density = Some(x_dpi);
        Ok(())
    }

    fn read_blob(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        if bytes.is_empty() {
            return Err(EngineError::Decode("empty input".into()));
        }

        self.content = if looks_like_pdf(bytes) {
            let pdfium = self.pdfium.ok_or_else(|| EngineError::Unavailable {
                backend: "pdfium",
                detail: "PDF input received but pdfium is not bound".into(),
            })?;
            let document = pdf::load(pdfium, bytes)?;
            debug!("PDF loaded: {} pages", pdf::page_count(&document));
            Content::Pdf(document)
        } else {
            Content::Frames(bitmap::decode(bytes)?)
        };
        Ok(())
    }

    fn page_count(&self) -> usize {
        match &self.content {
            Content::Empty => 0,
            Content::Pdf(document) => pdf::page_count(document),
            Content::Frames(frames) => frames.len(),
        }
    }

    fn extract_page(&self, index: usize) -> Result<Box<dyn PageHandle + '_>, EngineError> {
        let page = match &self.content {
            Content::Empty => return Err(EngineError::NotDecoded),
            Content::Pdf(document) => {
                let density = self.density.unwrap_or(crate::config::DEFAULT_DENSITY);
                pdf::render_page(document, index, density)?
            }
            Content::Frames(frames) => {
                let frame = frames.get(index).ok_or(EngineError::PageOutOfRange {
                    index,
                    count: frames.len(),
                })?;
                RasterPage::new(frame.clone())
            }
        };
        Ok(Box::new(page))
    }
}
