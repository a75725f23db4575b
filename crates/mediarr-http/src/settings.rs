//! Shared request defaults
//!
//! Values every root [`RequestBuilder`](crate::RequestBuilder) starts from.
//! Loaded from a TOML file and `MEDIARR_HTTP_*` environment variables on top
//! of [`HttpDefaults::default`].

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Accept header sent when none is configured
pub const DEFAULT_ACCEPT: &str = "*/*";

const ENV_PREFIX: &str = "MEDIARR_HTTP";

/// Defaults injected into root request builders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpDefaults {
    /// Headers added to every request
    pub headers: BTreeMap<String, String>,
    /// `Accept` header value
    pub accept: String,
    /// Log responses with an HTTP error status
    pub log_http_error: bool,
    /// Let the transport follow redirects
    pub allow_auto_redirect: bool,
    /// Keep connections alive
    pub keep_alive: bool,
    /// Log decoded response content
    pub log_response_content: bool,
    /// Send a short user agent
    pub use_simplified_user_agent: bool,
    /// Minimum seconds between requests to the same host
    pub rate_limit_secs: f64,
    /// HTTP error statuses that are not raised as errors
    pub suppressed_status_codes: Vec<u16>,
}

impl Default for HttpDefaults {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            accept: DEFAULT_ACCEPT.to_string(),
            log_http_error: true,
            allow_auto_redirect: true,
            keep_alive: true,
            log_response_content: false,
            use_simplified_user_agent: false,
            rate_limit_secs: 0.0,
            suppressed_status_codes: Vec::new(),
        }
    }
}

impl HttpDefaults {
    /// Load defaults from a TOML file, then apply `MEDIARR_HTTP_*` overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Config::builder()
            // use defaults
            .add_source(Config::try_from(&default)?)
            // override with file contents
            .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
            // override with environment
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    /// Load defaults from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Config::builder()
            .add_source(Config::try_from(&default)?)
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        config.try_deserialize()
    }
}
