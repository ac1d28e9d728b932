//! Rasterization engine: the external collaborator the pipeline drives.
//!
//! The pipeline only talks to three traits, mirroring how a document moves
//! through any rasterizer:
//!
//! ```text
//! RasterEngine ──open──▶ DocumentHandle ──extract_page──▶ PageHandle
//!  (process-wide)         (one per request)                (one per page)
//! ```
//!
//! Handles release their resources on `Drop`. A document handle lives for
//! one request; a page handle lives for one iteration of the page loop, so
//! peak memory is bounded by a single page regardless of document length.
//!
//! [`EngineRuntime`] is the production implementation: pdfium for PDF input,
//! the `image`/`tiff` codecs for raster input. Tests substitute fakes.

mod bitmap;
mod page;
mod pdf;
mod runtime;

pub use page::RasterPage;
pub use runtime::EngineRuntime;

use crate::config::OutputFormat;
use crate::error::EngineError;

/// A process-wide rasterization engine.
///
/// Implementations must be safe to share between concurrently running
/// request workers; each worker opens its own independent document handle.
pub trait RasterEngine: Send + Sync {
    /// Open a fresh, empty document handle.
    fn open(&self) -> Result<Box<dyn DocumentHandle + '_>, EngineError>;
}

/// One decoded (or to-be-decoded) source document.
pub trait DocumentHandle {
    /// Rendering resolution in DPI. Must be called before [`read_blob`](Self::read_blob).
    fn set_resolution(&mut self, x_dpi: f64, y_dpi: f64) -> Result<(), EngineError>;

    /// Decode the whole input.
    fn read_blob(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    /// Number of pages decoded; zero before [`read_blob`](Self::read_blob).
    fn page_count(&self) -> usize;

    /// Copy page `index` into its own handle so transforms cannot leak into
    /// other pages.
    fn extract_page(&self, index: usize) -> Result<Box<dyn PageHandle + '_>, EngineError>;
}

/// One page, isolated from the rest of its document.
pub trait PageHandle {
    /// Merge all layers onto a single opaque raster.
    fn flatten(&mut self) -> Result<(), EngineError>;

    fn set_compression_quality(&mut self, quality: u64) -> Result<(), EngineError>;

    fn set_format(&mut self, format: OutputFormat) -> Result<(), EngineError>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Rotate by `degrees`; positive is clockwise.
    fn rotate(&mut self, degrees: f64) -> Result<(), EngineError>;

    /// Encode the page with the configured format and quality.
    fn to_blob(&self) -> Result<Vec<u8>, EngineError>;
}
