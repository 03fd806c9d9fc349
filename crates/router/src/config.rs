use crate::report::{ErrorReporter, FileSink};
use crate::view::ResponseConfig;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Settings applied when building a [`crate::Router`].
///
/// ```
/// use micro_router::RouterConfig;
///
/// let config = RouterConfig::from_toml_str(r#"
///     base_path = "/api"
///     log_errors = true
/// "#).unwrap();
///
/// assert_eq!(config.base_path, "/api");
/// assert!(config.use_json);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Prefix of every registered route.
    pub base_path: String,
    /// Render errors as JSON whatever the request asks for.
    pub use_json: bool,
    /// Expose fault details in rendered error responses.
    pub debug: bool,
    /// Append faults to the file at `log_path`.
    pub log_errors: bool,
    pub log_path: PathBuf,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            use_json: true,
            debug: false,
            log_errors: false,
            log_path: PathBuf::from("logs/error.log"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid router config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RouterConfig {
    /// Parses a config from TOML, fields which are left out keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed TOML or mistyped fields.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_json(mut self, use_json: bool) -> Self {
        self.use_json = use_json;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enables logging faults to `path`.
    pub fn with_error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_errors = true;
        self.log_path = path.into();
        self
    }

    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig { use_json: self.use_json }
    }

    pub(crate) fn reporter(&self) -> ErrorReporter {
        if self.log_errors { ErrorReporter::new(FileSink::new(self.log_path.clone())) } else { ErrorReporter::disabled() }
    }
}
