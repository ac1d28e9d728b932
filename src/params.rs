//! Parameter resolution: untyped request parameters → [`ConversionConfig`].
//!
//! Runs before the request body is read and before any engine handle is
//! opened, so malformed input is rejected without doing expensive work.
//! Absent or empty values fall back to the defaults in [`crate::config`].

use crate::config::{ConversionConfig, Layout, OutputFormat};
use crate::error::{ConvertError, ParameterField};
use serde::Deserialize;
use tracing::warn;

/// Raw conversion parameters as received in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConversionParams {
    pub density: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
    pub layout: Option<String>,
}

impl ConversionParams {
    /// Collect recognised keys from arbitrary name/value pairs.
    ///
    /// Unknown keys are ignored. When a key repeats, the first value wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "density" => &mut params.density,
                "quality" => &mut params.quality,
                "format" => &mut params.format,
                "layout" => &mut params.layout,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    /// Validate every parameter and substitute defaults for absent ones.
    pub fn resolve(&self) -> Result<ConversionConfig, ConvertError> {
        let mut config = ConversionConfig::default();

        if let Some(v) = present(&self.density) {
            config.density = v.parse::<f64>().map_err(|_| rejected(ParameterField::Density, v))?;
        }

        if let Some(v) = present(&self.quality) {
            config.quality = parse_quality(v).ok_or_else(|| rejected(ParameterField::Quality, v))?;
        }

        if let Some(v) = present(&self.format) {
            config.format = v
                .parse::<OutputFormat>()
                .inspect_err(|_| log_rejection(ParameterField::Format, v))?;
        }

        if let Some(v) = present(&self.layout) {
            config.layout = v
                .parse::<Layout>()
                .inspect_err(|_| log_rejection(ParameterField::Layout, v))?;
        }

        Ok(config)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Plain decimal digits only: no sign, no whitespace.
fn parse_quality(v: &str) -> Option<u64> {
    if !v.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    v.parse().ok()
}

fn rejected(field: ParameterField, value: &str) -> ConvertError {
    log_rejection(field, value);
    ConvertError::invalid(field, value)
}

fn log_rejection(field: ParameterField, value: &str) {
    warn!(field = field.as_str(), value, "rejected conversion parameter");
}
