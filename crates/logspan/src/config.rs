// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logger configuration and the process-wide defaults new loggers start from.

use std::env;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::debug;

use crate::error_handler::{set_global_error_handler, ErrorHandler};
use crate::errors::ConfigError;
use crate::formatter::{default_formatter, Formatter};
use crate::level::Severity;
use crate::output::Output;

pub const DEFAULT_LOG_TYPE: &str = "request";

/// Settings a logger starts from.
#[derive(Clone)]
pub struct Config {
    /// Records below this severity are discarded.
    pub min_level: Severity,
    /// Sink for flushed batches. `None` discards them.
    pub output: Option<Output>,
    /// Attach call-site information to every record.
    pub source_info: bool,
    /// Indent JSON output.
    pub prettify_json: bool,
    /// Flush automatically once this many records are buffered. 0 disables.
    pub max_log_entries: usize,
    /// Value of the envelope's `type` field.
    pub log_type: String,
    /// Write an envelope even when a flush finds no records.
    pub flush_empty: bool,
    /// Installed as the global error handler by [`init`].
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_level: Severity::Info,
            output: Some(Output::stdout()),
            source_info: false,
            prettify_json: false,
            max_log_entries: 0,
            log_type: DEFAULT_LOG_TYPE.to_string(),
            flush_empty: true,
            error_handler: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("min_level", &self.min_level)
            .field("output", &self.output.is_some())
            .field("source_info", &self.source_info)
            .field("prettify_json", &self.prettify_json)
            .field("max_log_entries", &self.max_log_entries)
            .field("log_type", &self.log_type)
            .field("flush_empty", &self.flush_empty)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl Config {
    /// Defaults overridden by `LOGSPAN_*` environment variables.
    ///
    /// - `LOGSPAN_LEVEL`: severity label, case-insensitive
    /// - `LOGSPAN_SOURCE_INFO`, `LOGSPAN_PRETTIFY_JSON`, `LOGSPAN_FLUSH_EMPTY`:
    ///   `true`/`false`, `1`/`0` or `yes`/`no`
    /// - `LOGSPAN_MAX_LOG_ENTRIES`: non-negative integer
    /// - `LOGSPAN_LOG_TYPE`: envelope `type`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let min_level = env::var("LOGSPAN_LEVEL")
            .map(|val| Severity::parse(&val.trim().to_uppercase()))
            .unwrap_or(defaults.min_level);
        let source_info = bool_var("LOGSPAN_SOURCE_INFO")?.unwrap_or(defaults.source_info);
        let prettify_json = bool_var("LOGSPAN_PRETTIFY_JSON")?.unwrap_or(defaults.prettify_json);
        let flush_empty = bool_var("LOGSPAN_FLUSH_EMPTY")?.unwrap_or(defaults.flush_empty);
        let max_log_entries = match env::var("LOGSPAN_MAX_LOG_ENTRIES") {
            Ok(val) => val
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "LOGSPAN_MAX_LOG_ENTRIES".to_string(),
                    value: val,
                })?,
            Err(_) => defaults.max_log_entries,
        };
        let log_type =
            env::var("LOGSPAN_LOG_TYPE").unwrap_or_else(|_| DEFAULT_LOG_TYPE.to_string());

        let config = Self {
            min_level,
            source_info,
            prettify_json,
            max_log_entries,
            log_type,
            flush_empty,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_type.trim().is_empty() {
            return Err(ConfigError::EmptyLogType);
        }
        Ok(())
    }

    /// Formatter implied by `prettify_json`.
    pub fn formatter(&self) -> Arc<dyn Formatter> {
        default_formatter(self.prettify_json)
    }

    #[must_use]
    pub fn with_min_level(mut self, min_level: Severity) -> Self {
        self.min_level = min_level;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Into<Output>) -> Self {
        self.output = Some(output.into());
        self
    }

    #[must_use]
    pub fn without_output(mut self) -> Self {
        self.output = None;
        self
    }

    #[must_use]
    pub fn with_source_info(mut self, source_info: bool) -> Self {
        self.source_info = source_info;
        self
    }

    #[must_use]
    pub fn with_prettify_json(mut self, prettify_json: bool) -> Self {
        self.prettify_json = prettify_json;
        self
    }

    #[must_use]
    pub fn with_max_log_entries(mut self, max_log_entries: usize) -> Self {
        self.max_log_entries = max_log_entries;
        self
    }

    #[must_use]
    pub fn with_log_type(mut self, log_type: impl Into<String>) -> Self {
        self.log_type = log_type.into();
        self
    }

    #[must_use]
    pub fn with_flush_empty(mut self, flush_empty: bool) -> Self {
        self.flush_empty = flush_empty;
        self
    }

    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }
}

fn bool_var(key: &str) -> Result<Option<bool>, ConfigError> {
    let Ok(val) = env::var(key) else {
        return Ok(None);
    };
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: val,
        }),
    }
}

lazy_static! {
    static ref GLOBAL: RwLock<Option<Config>> = RwLock::new(None);
}

/// Replaces the process-wide configuration.
///
/// Installs `config.error_handler` as the global error handler when set and
/// reconfigures the default direct logger. Loggers created earlier keep their
/// settings.
///
/// The stored configuration carries no handler, so loggers built from
/// [`current`] report through the global handler and follow later calls to
/// [`set_global_error_handler`].
pub fn init(mut config: Config) {
    if let Some(handler) = config.error_handler.take() {
        set_global_error_handler(Some(handler));
    }
    *GLOBAL.write() = Some(config.clone());
    crate::direct_logger::direct().reconfigure(&config);
    debug!("logspan configuration initialized: {config:?}");
}

/// The configuration passed to [`init`], minus its error handler, or the
/// defaults before that.
pub fn current() -> Config {
    GLOBAL.read().clone().unwrap_or_default()
}

pub fn is_initialized() -> bool {
    GLOBAL.read().is_some()
}

/// Drops the configuration installed by [`init`]. Test helper.
#[cfg(test)]
pub(crate) fn reset() {
    *GLOBAL.write() = None;
}
