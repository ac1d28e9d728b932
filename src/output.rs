//! Conversion results.

use serde::Serialize;

/// The finished archive plus what it took to produce it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Complete zip archive, one entry per page.
    pub archive: Vec<u8>,
    pub stats: ConversionStats,
}

/// Summary numbers logged once per conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub page_count: usize,
    pub input_bytes: usize,
    pub archive_bytes: usize,
    pub duration_ms: u64,
}
