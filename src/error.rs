//! Error types for the pagezip library.
//!
//! Two error types reflect the two layers of a conversion:
//!
//! * [`EngineError`]: reported by the rasterization engine itself (bad
//!   bytes, an unsupported colour model, an encoder failure). It knows nothing
//!   about requests or pipeline stages.
//!
//! * [`ConvertError`]: **fatal** for the request. Every failure aborts the
//!   conversion and no partial archive is produced. Engine failures are
//!   wrapped together with the [`EngineStage`] and page they happened at so
//!   logs can say exactly where a document broke.
//!
//! Each [`ConvertError`] carries a fixed, client-safe message
//! ([`ConvertError::client_message`]). Raw engine text goes to the logs only.

use std::fmt;
use thiserror::Error;

// ── Stages & fields ──────────────────────────────────────────────────────

/// A request parameter understood by the parameter resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    Density,
    Quality,
    Format,
    Layout,
}

impl ParameterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterField::Density => "density",
            ParameterField::Quality => "quality",
            ParameterField::Format => "format",
            ParameterField::Layout => "layout",
        }
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine operation a conversion was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Open,
    Resolution,
    Decode,
    Extract,
    Flatten,
    Quality,
    Format,
    Rotate,
    Serialize,
}

impl EngineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineStage::Open => "open",
            EngineStage::Resolution => "set_resolution",
            EngineStage::Decode => "decode",
            EngineStage::Extract => "extract_page",
            EngineStage::Flatten => "flatten",
            EngineStage::Quality => "set_quality",
            EngineStage::Format => "set_format",
            EngineStage::Rotate => "rotate",
            EngineStage::Serialize => "serialize",
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            EngineStage::Open => "failed to open rasterization engine",
            EngineStage::Resolution => "failed to set density",
            EngineStage::Decode => "failed to read image",
            EngineStage::Extract => "failed to extract page",
            EngineStage::Flatten => "failed to flatten image",
            EngineStage::Quality => "failed to set compression quality",
            EngineStage::Format => "failed to set output format",
            EngineStage::Rotate => "failed to rotate image",
            EngineStage::Serialize => "failed to get output blob",
        }
    }
}

impl fmt::Display for EngineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The archive operation a conversion was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStage {
    CreateEntry,
    WriteEntry,
    Finalize,
}

impl ArchiveStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveStage::CreateEntry => "create_entry",
            ArchiveStage::WriteEntry => "write_entry",
            ArchiveStage::Finalize => "finalize",
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            ArchiveStage::CreateEntry => "failed to create new Zip archive entry",
            ArchiveStage::WriteEntry => "failed to write image into Zip archive",
            ArchiveStage::Finalize => "failed to close Zip archive",
        }
    }
}

impl fmt::Display for ArchiveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Engine errors ────────────────────────────────────────────────────────

/// Errors reported by a [`crate::engine::RasterEngine`] implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The backend needed for this input is not bound in this process.
    #[error("{backend} backend is unavailable: {detail}")]
    Unavailable { backend: &'static str, detail: String },

    /// The input bytes are not in any format the engine can decode.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// The input was recognised but could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// An operation that needs decoded content ran before `read_blob`.
    #[error("no document has been decoded yet")]
    NotDecoded,

    /// Page index past the end of the document.
    #[error("page {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// An argument the engine refuses (non-positive density, odd angle, …).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A PDF page could not be rasterised.
    #[error("render failed: {0}")]
    Render(String),

    /// The page could not be encoded into the output codec.
    #[error("encode failed: {0}")]
    Encode(String),
}

// ── Conversion errors ────────────────────────────────────────────────────

/// All errors that can terminate a conversion request.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A query parameter was present but malformed.
    #[error("invalid {field} parameter: {value:?}")]
    InvalidParameter { field: ParameterField, value: String },

    /// The query string itself could not be decoded.
    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    /// The request body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The rasterization engine failed.
    #[error("engine stage '{stage}' failed{}: {source}", at_page(.page))]
    Engine {
        stage: EngineStage,
        page: Option<usize>,
        #[source]
        source: EngineError,
    },

    /// Building the output archive failed.
    #[error("archive stage '{stage}' failed{}: {reason}", at_page(.page))]
    Archive {
        stage: ArchiveStage,
        page: Option<usize>,
        reason: String,
    },

    /// The blocking conversion task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

fn at_page(page: &Option<usize>) -> String {
    match page {
        Some(index) => format!(" at page {index}"),
        None => String::new(),
    }
}

impl ConvertError {
    pub fn invalid(field: ParameterField, value: impl Into<String>) -> Self {
        ConvertError::InvalidParameter {
            field,
            value: value.into(),
        }
    }

    pub fn engine(stage: EngineStage, page: Option<usize>, source: EngineError) -> Self {
        ConvertError::Engine {
            stage,
            page,
            source,
        }
    }

    pub fn archive(stage: ArchiveStage, page: Option<usize>, reason: impl fmt::Display) -> Self {
        ConvertError::Archive {
            stage,
            page,
            reason: reason.to_string(),
        }
    }

    /// `true` when the caller sent something we refuse to work with.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidParameter { .. }
                | ConvertError::InvalidQuery(_)
                | ConvertError::BodyTooLarge { .. }
        )
    }

    /// Stage name for structured logging, if the error came from one.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            ConvertError::Engine { stage, .. } => Some(stage.as_str()),
            ConvertError::Archive { stage, .. } => Some(stage.as_str()),
            _ => None,
        }
    }

    /// Zero-based page the error happened on, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            ConvertError::Engine { page, .. } | ConvertError::Archive { page, .. } => *page,
            _ => None,
        }
    }

    /// The message returned to HTTP clients. Never contains engine output.
    pub fn client_message(&self) -> &'static str {
        match self {
            ConvertError::InvalidParameter { field, .. } => match field {
                ParameterField::Density => "invalid density",
                ParameterField::Quality => "invalid compression quality",
                ParameterField::Format => "invalid output format",
                ParameterField::Layout => "invalid output layout",
            },
            ConvertError::InvalidQuery(_) => "invalid query string",
            ConvertError::BodyTooLarge { .. } => "request body too large",
            ConvertError::BodyRead(_) => "failed to read request body",
            ConvertError::Engine { stage, .. } => stage.client_message(),
            ConvertError::Archive { stage, .. } => stage.client_message(),
            ConvertError::Internal(_) => "internal server error",
        }
    }
}
