//! In-memory zip assembly for converted pages.
//!
//! Entries are deflated at the fastest level: page images are already
//! compressed, so a higher level costs CPU for almost no gain.

use crate::config::OutputFormat;
use crate::error::{ArchiveStage, ConvertError};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const FASTEST_DEFLATE: i32 = 1;

/// Archive entry name for page `index`: zero-padded to four digits.
pub fn entry_name(index: usize, format: OutputFormat) -> String {
    format!("{:04}.{}", index, format.extension())
}

/// Builds the output archive one page at a time.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
    entries: usize,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(FASTEST_DEFLATE)),
            entries: 0,
        }
    }

    /// Add `bytes` as entry `name`, attributing failures to page `index`.
    pub fn append(&mut self, index: usize, name: &str, bytes: &[u8]) -> Result<(), ConvertError> {
        self.zip
            .start_file(name, self.options)
            .map_err(|e| ConvertError::archive(ArchiveStage::CreateEntry, Some(index), e))?;
        self.zip
            .write_all(bytes)
            .map_err(|e| ConvertError::archive(ArchiveStage::WriteEntry, Some(index), e))?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| ConvertError::archive(ArchiveStage::Finalize, None, e))?;
        Ok(cursor.into_inner())
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}
