//! Shared fixtures for the integration tests.
//!
//! [`FakeEngine`] stands in for pdfium: it "decodes" any input starting with
//! `FAKE` into blank pages of preset sizes, counts every handle it opens and
//! releases, and can be told to fail at a chosen stage. Pages delegate to the
//! real [`RasterPage`], so blobs coming out of it are genuine images.

#![allow(dead_code)]

use image::DynamicImage;
use pagezip::config::OutputFormat;
use pagezip::engine::{DocumentHandle, PageHandle, RasterEngine, RasterPage};
use pagezip::EngineError;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const FAKE_MAGIC: &[u8] = b"FAKE";

/// Where a [`FakeEngine`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Open,
    Decode,
    Extract(usize),
    Serialize(usize),
}

#[derive(Debug, Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub documents_released: AtomicUsize,
    pub pages_extracted: AtomicUsize,
    pub pages_released: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeEngine {
    pages: Vec<(u32, u32)>,
    failure: Option<Failure>,
    pub counters: Arc<Counters>,
    pub resolution: Arc<Mutex<Option<(f64, f64)>>>,
}

impl FakeEngine {
    pub fn with_pages(pages: &[(u32, u32)]) -> Self {
        Self {
            pages: pages.to_vec(),
            failure: None,
            counters: Arc::new(Counters::default()),
            resolution: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn opened(&self) -> usize {
        Counters::get(&self.counters.opened)
    }

    pub fn documents_released(&self) -> usize {
        Counters::get(&self.counters.documents_released)
    }

    pub fn pages_extracted(&self) -> usize {
        Counters::get(&self.counters.pages_extracted)
    }

    pub fn pages_released(&self) -> usize {
        Counters::get(&self.counters.pages_released)
    }
}

impl RasterEngine for FakeEngine {
    fn open(&self) -> Result<Box<dyn DocumentHandle + '_>, EngineError> {
        if self.failure == Some(Failure::Open) {
            return Err(EngineError::Unavailable {
                backend: "fake",
                detail: "told to fail".into(),
            });
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDocument {
            engine: self,
            decoded: false,
        }))
    }
}

struct FakeDocument<'a> {
    engine: &'a FakeEngine,
    decoded: bool,
}

impl Drop for FakeDocument<'_> {
    fn drop(&mut self) {
        self.engine
            .counters
            .documents_released
            .fetch_add(1, Ordering::SeqCst);
    }
}

impl DocumentHandle for FakeDocument<'_> {
    fn set_resolution(&mut self, x_dpi: f64, y_dpi: f64) -> Result<(), EngineError> {
        *self.engine.resolution.lock().unwrap() = Some((x_dpi, y_dpi));
        Ok(())
    }

    fn read_blob(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        if self.engine.failure == Some(Failure::Decode) || !bytes.starts_with(FAKE_MAGIC) {
            return Err(EngineError::Decode("not a fake document".into()));
        }
        self.decoded = true;
        Ok(())
    }

    fn page_count(&self) -> usize {
        if self.decoded {
            self.engine.pages.len()
        } else {
            0
        }
    }

    fn extract_page(&self, index: usize) -> Result<Box<dyn PageHandle + '_>, EngineError> {
        if self.engine.failure == Some(Failure::Extract(index)) {
            return Err(EngineError::Render(format!("page {index} told to fail")));
        }
        let (width, height) = self.engine.pages[index];
        self.engine
            .counters
            .pages_extracted
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            inner: RasterPage::new(DynamicImage::new_rgb8(width, height)),
            fail_serialize: self.engine.failure == Some(Failure::Serialize(index)),
            counters: &self.engine.counters,
        }))
    }
}

struct FakePage<'a> {
    inner: RasterPage,
    fail_serialize: bool,
    counters: &'a Counters,
}

impl Drop for FakePage<'_> {
    fn drop(&mut self) {
        self.counters.pages_released.fetch_add(1, Ordering::SeqCst);
    }
}

impl PageHandle for FakePage<'_> {
    fn flatten(&mut self) -> Result<(), EngineError> {
        self.inner.flatten()
    }

    fn set_compression_quality(&mut self, quality: u64) -> Result<(), EngineError> {
        self.inner.set_compression_quality(quality)
    }

    fn set_format(&mut self, format: OutputFormat) -> Result<(), EngineError> {
        self.inner.set_format(format)
    }

    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn rotate(&mut self, degrees: f64) -> Result<(), EngineError> {
        self.inner.rotate(degrees)
    }

    fn to_blob(&self) -> Result<Vec<u8>, EngineError> {
        if self.fail_serialize {
            return Err(EngineError::Encode("told to fail".into()));
        }
        self.inner.to_blob()
    }
}

// ── Archive helpers ──────────────────────────────────────────────────────

/// Entry names in archive order.
pub fn entry_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).expect("entry exists").name().to_string())
        .collect()
}

/// Decode entry `index` of the archive as an image.
pub fn entry_image(archive: &[u8], index: usize) -> DynamicImage {
    use std::io::Read;
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("valid zip archive");
    let mut file = zip.by_index(index).expect("entry exists");
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).expect("entry readable");
    image::load_from_memory(&bytes).expect("entry is an image")
}
