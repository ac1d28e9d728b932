//! Process settings for the `pagezip` binary.
//!
//! Precedence, lowest first:
//!
//! 1. built-in defaults
//! 2. `/etc/pagezip/config.*`, `$HOME/.config/pagezip/config.*`, `./config.*`
//!    (any format the `config` crate understands; all optional)
//! 3. `--config-file <PATH>` (required to exist when given)
//! 4. `PAGEZIP_*` environment variables
//! 5. command-line flags

use clap::builder::BoolishValueParser;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const SYSTEM_CONFIG_BASENAME: &str = "/etc/pagezip/config";
const LOCAL_CONFIG_BASENAME: &str = "config";
const ENV_PREFIX: &str = "PAGEZIP";

const DEFAULT_LISTEN: &str = "0.0.0.0:8081";
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Command-line arguments.
#[derive(Debug, Default, Parser)]
#[command(
    name = "pagezip",
    version,
    about = "Rasterise documents page by page and return them as a zip archive"
)]
pub struct Cli {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PAGEZIP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Address to listen on, e.g. `0.0.0.0:8081` or `:8081`.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Base log level (trace|debug|info|warn|error). RUST_LOG overrides it.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub log_json: Option<bool>,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[arg(long = "shutdown-grace-secs", value_name = "SECONDS")]
    pub shutdown_grace_secs: Option<u64>,

    /// Largest accepted request body, in bytes.
    #[arg(long = "max-body-bytes", value_name = "BYTES")]
    pub max_body_bytes: Option<usize>,

    /// pdfium shared library, or the directory containing it.
    #[arg(long = "pdfium-library", value_name = "PATH")]
    pub pdfium_library: Option<PathBuf>,
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub log_level: LevelFilter,
    pub log_json: bool,
    pub shutdown_grace: Duration,
    pub max_body_bytes: usize,
    pub pdfium_library: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl SettingsError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Layer every configuration source and validate the result.
pub fn load(cli: &Cli) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(SYSTEM_CONFIG_BASENAME).required(false));

    if let Some(home) = std::env::var_os("HOME") {
        let user = PathBuf::from(home).join(".config/pagezip/config");
        builder = builder.add_source(File::with_name(&user.to_string_lossy()).required(false));
    }

    builder = builder.add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(cli);
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    listen: Option<String>,
    log_level: Option<String>,
    log_json: Option<bool>,
    shutdown_grace_secs: Option<u64>,
    max_body_bytes: Option<usize>,
    pdfium_library: Option<PathBuf>,
}

impl RawSettings {
    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(listen) = cli.listen.as_ref() {
            self.listen = Some(listen.clone());
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.log_level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.log_json = Some(json);
        }
        if let Some(secs) = cli.shutdown_grace_secs {
            self.shutdown_grace_secs = Some(secs);
        }
        if let Some(bytes) = cli.max_body_bytes {
            self.max_body_bytes = Some(bytes);
        }
        if let Some(path) = cli.pdfium_library.as_ref() {
            self.pdfium_library = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        let listen = parse_listen(raw.listen.as_deref().unwrap_or(DEFAULT_LISTEN))
            .map_err(|reason| SettingsError::invalid("listen", reason))?;

        let log_level = match raw.log_level {
            Some(level) => LevelFilter::from_str(level.trim()).map_err(|err| {
                SettingsError::invalid("log_level", format!("failed to parse: {err}"))
            })?,
            None => LevelFilter::INFO,
        };

        let grace_secs = raw.shutdown_grace_secs.unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS);
        if grace_secs == 0 {
            return Err(SettingsError::invalid(
                "shutdown_grace_secs",
                "must be greater than zero",
            ));
        }

        let max_body_bytes = raw.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(SettingsError::invalid(
                "max_body_bytes",
                "must be greater than zero",
            ));
        }

        let pdfium_library = raw
            .pdfium_library
            .filter(|path| !path.as_os_str().is_empty());

        Ok(Settings {
            listen,
            log_level,
            log_json: raw.log_json.unwrap_or(false),
            shutdown_grace: Duration::from_secs(grace_secs),
            max_body_bytes,
            pdfium_library,
        })
    }
}

/// Accepts `host:port`, `[v6]:port` and the bare `:port` shorthand
/// (all interfaces).
fn parse_listen(value: &str) -> Result<SocketAddr, String> {
    let value = value.trim();
    let candidate = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => value.to_string(),
    };
    candidate
        .parse()
        .map_err(|err| format!("`{value}` is not a socket address: {err}"))
}
