//! # pagezip
//!
//! Rasterise every page of a document and hand the pages back as a zip
//! archive, over HTTP.
//!
//! ## Why this crate?
//!
//! Downstream tools (OCR, thumbnailers, review UIs) usually want one image
//! per page in a predictable format and orientation, not a PDF or a
//! multi-page TIFF. This crate does that single job: `POST` the document,
//! get back `0000.jpg`, `0001.jpg`, … in one archive.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Params    density / quality / format / layout → ConversionConfig
//!  ├─ 2. Decode    pdfium (PDF) or image/tiff (raster), spawn_blocking
//!  ├─ 3. Per page  extract → flatten → quality → format → orient → encode
//!  └─ 4. Archive   %04d.<ext> entries, deflate (fastest), finalised once
//! ```
//!
//! Any failure aborts the whole request: there are no partial archives.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagezip::engine::EngineRuntime;
//! use pagezip::{convert_blocking, ConversionConfig, ConversionRequest, OutputFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = EngineRuntime::initialize(None)?;
//!     let config = ConversionConfig {
//!         format: OutputFormat::Png,
//!         ..ConversionConfig::default()
//!     };
//!     let bytes = std::fs::read("document.pdf")?;
//!     let output = convert_blocking(&engine, &ConversionRequest::new(bytes, config))?;
//!     std::fs::write("pages.zip", &output.archive)?;
//!     eprintln!("{} pages in {}ms", output.stats.page_count, output.stats.duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagezip` server binary (clap + config + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library or the router in another service:
//! ```toml
//! pagezip = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod server;
#[cfg(feature = "cli")]
pub mod settings;
#[cfg(feature = "cli")]
pub mod telemetry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, Layout, OutputFormat};
pub use convert::{convert, convert_blocking, ConversionRequest};
pub use error::{ConvertError, EngineError};
pub use output::{ConversionOutput, ConversionStats};
pub use params::ConversionParams;

/// Crate version, reported by `GET /version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
