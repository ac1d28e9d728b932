//! The conversion pipeline: input bytes + config → zip archive.
//!
//! ## Why spawn_blocking?
//!
//! Rasterising and re-encoding pages is CPU-bound and the engine's handles
//! are not `Send`. [`convert`] moves the whole pipeline onto tokio's blocking
//! pool, where [`convert_blocking`] runs start to finish without a single
//! suspension point. Async worker threads keep serving other requests.
//!
//! ## Why one page at a time?
//!
//! Each page handle is created, transformed, serialised and dropped inside
//! one loop iteration. Only the growing archive buffer outlives the loop, so
//! peak memory is one decoded page plus the compressed output regardless of
//! document length.

use crate::config::ConversionConfig;
use crate::engine::{DocumentHandle, RasterEngine};
use crate::error::{ConvertError, EngineError, EngineStage};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::archive::{entry_name, ArchiveWriter};
use crate::pipeline::orient;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// An immutable unit of work: the raw document and how to convert it.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: Bytes,
    pub config: ConversionConfig,
}

impl ConversionRequest {
    pub fn new(input: impl Into<Bytes>, config: ConversionConfig) -> Self {
        Self {
            input: input.into(),
            config,
        }
    }
}

/// Convert on tokio's blocking pool.
///
/// # Errors
/// Any engine or archive failure aborts the whole conversion; no partial
/// archive is ever returned. A panic inside the pipeline surfaces as
/// [`ConvertError::Internal`].
pub async fn convert(
    engine: Arc<dyn RasterEngine>,
    request: ConversionRequest,
) -> Result<ConversionOutput, ConvertError> {
    tokio::task::spawn_blocking(move || convert_blocking(engine.as_ref(), &request))
        .await
        .map_err(|e| ConvertError::Internal(format!("Conversion task failed: {}", e)))?
}

/// Run the full pipeline on the current thread.
pub fn convert_blocking(
    engine: &dyn RasterEngine,
    request: &ConversionRequest,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    let config = &request.config;
    info!(
        "Starting conversion: {} bytes, density={} quality={} format={} layout={}",
        request.input.len(),
        config.density,
        config.quality,
        config.format,
        config.layout
    );

    // ── Step 1: Open and decode ──────────────────────────────────────────
    let mut document = engine
        .open()
        .map_err(|e| ConvertError::engine(EngineStage::Open, None, e))?;
    document
        .set_resolution(config.density, config.density)
        .map_err(|e| ConvertError::engine(EngineStage::Resolution, None, e))?;
    document
        .read_blob(&request.input)
        .map_err(|e| ConvertError::engine(EngineStage::Decode, None, e))?;

    let page_count = document.page_count();
    debug!("Decoded document with {} pages", page_count);

    // ── Step 2: Pages ────────────────────────────────────────────────────
    let mut archive = ArchiveWriter::new();
    for index in 0..page_count {
        let blob = render_page(&*document, index, config)?;
        archive.append(index, &entry_name(index, config.format), &blob)?;
    }

    // ── Step 3: Finalise ─────────────────────────────────────────────────
    let archive = archive.finish()?;
    drop(document);

    let stats = ConversionStats {
        page_count,
        input_bytes: request.input.len(),
        archive_bytes: archive.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} pages, {} bytes archive, {}ms",
        stats.page_count, stats.archive_bytes, stats.duration_ms
    );

    Ok(ConversionOutput { archive, stats })
}

/// Extract, transform and serialise one page. The page handle is dropped
/// on return, on success and failure alike.
fn render_page(
    document: &dyn DocumentHandle,
    index: usize,
    config: &ConversionConfig,
) -> Result<Vec<u8>, ConvertError> {
    let at = |stage: EngineStage| {
        move |e: EngineError| ConvertError::engine(stage, Some(index), e)
    };

    let mut page = document.extract_page(index).map_err(at(EngineStage::Extract))?;
    page.flatten().map_err(at(EngineStage::Flatten))?;
    page.set_compression_quality(config.quality).map_err(at(EngineStage::Quality))?;
    page.set_format(config.format).map_err(at(EngineStage::Format))?;
    orient::apply(&mut *page, config.layout).map_err(at(EngineStage::Rotate))?;
    let blob = page.to_blob().map_err(at(EngineStage::Serialize))?;

    debug!(
        "Page {} → {}x{} {} ({} bytes)",
        index,
        page.width(),
        page.height(),
        config.format,
        blob.len()
    );
    Ok(blob)
}
