//! Configuration types for a single conversion.
//!
//! A [`ConversionConfig`] is the validated, typed form of the `density`,
//! `quality`, `format` and `layout` request parameters. It is only ever
//! produced by [`crate::params::ConversionParams::resolve`] or built directly
//! by library callers, so the pipeline never sees free-form strings.
//!
//! [`OutputFormat`] and [`Layout`] are closed enums parsed case-insensitively
//! through [`FromStr`]; anything else is rejected as an invalid parameter.

use crate::error::{ConvertError, ParameterField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rendering resolution used when the request does not specify one.
pub const DEFAULT_DENSITY: f64 = 300.0;

/// Compression quality used when the request does not specify one.
pub const DEFAULT_QUALITY: u64 = 85;

/// Configuration for one document-to-archive conversion.
///
/// # Example
/// ```rust
/// use pagezip::{ConversionConfig, Layout, OutputFormat};
///
/// let config = ConversionConfig {
///     format: OutputFormat::Png,
///     layout: Layout::Portrait,
///     ..ConversionConfig::default()
/// };
/// assert_eq!(config.density, 300.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Rendering resolution in DPI, applied horizontally and vertically. Default: 300.
    ///
    /// Only affects inputs the engine rasterises itself (PDF). Raster inputs
    /// already have pixels and keep their native size.
    pub density: f64,

    /// Compression quality handed to the output codec. Default: 85.
    ///
    /// JPEG reads it as 1–100 (clamped). PNG follows the usual convention of
    /// the tens digit selecting the zlib effort and the units digit the row
    /// filter. TIFF output is lossless and ignores it.
    pub quality: u64,

    /// Output codec for every page. Default: [`OutputFormat::Jpeg`].
    pub format: OutputFormat,

    /// Orientation policy applied per page. Default: [`Layout::Keep`].
    pub layout: Layout,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
            layout: Layout::default(),
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output codec for rasterised pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    /// JPEG File Interchange Format. (default)
    #[default]
    Jpeg,
    /// Portable Network Graphics.
    Png,
    /// Tagged Image File Format.
    Tiff,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Tiff];

    /// Canonical upper-case name, as accepted in the `format` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Tiff => "TIFF",
        }
    }

    /// File extension used for archive entry names.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tiff",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConvertError::invalid(ParameterField::Format, s))
    }
}

/// Orientation policy enforced on every output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Layout {
    /// Rotate tall pages so that width exceeds height.
    Landscape,
    /// Rotate wide pages so that height exceeds width.
    Portrait,
    /// Leave every page as decoded. (default)
    #[default]
    Keep,
}

impl Layout {
    pub const ALL: [Layout; 3] = [Layout::Landscape, Layout::Portrait, Layout::Keep];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Landscape => "LANDSCAPE",
            Layout::Portrait => "PORTRAIT",
            Layout::Keep => "KEEP",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layout::ALL
            .into_iter()
            .find(|layout| layout.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConvertError::invalid(ParameterField::Layout, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ConversionConfig::default();
        assert_eq!(c.density, 300.0);
        assert_eq!(c.quality, 85);
        assert_eq!(c.format, OutputFormat::Jpeg);
        assert_eq!(c.layout, Layout::Keep);
    }

    #[test]
    fn format_parse_is_case_insensitive() {
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("Png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("TIFF".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
    }

    #[test]
    fn format_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Tiff.extension(), "tiff");
    }

    #[test]
    fn format_rejects_aliases() {
        // Only the canonical names are accepted, not extensions.
        for bad in ["jpg", "tif", "gif", "", " jpeg"] {
            let err = bad.parse::<OutputFormat>().unwrap_err();
            assert_eq!(err.client_message(), "invalid output format", "input {bad:?}");
        }
    }

    #[test]
    fn layout_parse() {
        assert_eq!("landscape".parse::<Layout>().unwrap(), Layout::Landscape);
        assert_eq!("Portrait".parse::<Layout>().unwrap(), Layout::Portrait);
        assert_eq!("KEEP".parse::<Layout>().unwrap(), Layout::Keep);
        assert!("sideways".parse::<Layout>().is_err());
    }

    #[test]
    fn config_serialises_with_upper_case_enums() {
        let json = serde_json::to_value(ConversionConfig::default()).unwrap();
        assert_eq!(json["format"], "JPEG");
        assert_eq!(json["layout"], "KEEP");
    }
}
