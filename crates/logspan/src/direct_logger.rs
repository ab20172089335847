// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logger that writes every record immediately as its own envelope.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::config::{self, Config};
use crate::emit::emit;
use crate::error_handler::ErrorReporter;
use crate::formatter::{Envelope, Formatter};
use crate::level::Severity;
use crate::middleware::Pipeline;
use crate::output::Output;
use crate::pool::Pool;
use crate::source::SourceLocation;

struct State {
    output: Option<Output>,
    formatter: Arc<dyn Formatter>,
    source_info: bool,
    log_type: String,
}

/// Unbuffered counterpart of [`crate::ContextLogger`].
///
/// Each call that passes the level filter and the middleware chain is
/// written at once as an envelope with one line, an empty context and zero
/// elapsed time.
pub struct DirectLogger {
    min_level: AtomicU8,
    state: Mutex<State>,
    pipeline: Pipeline,
    errors: ErrorReporter,
    pool: &'static Pool,
}

impl DirectLogger {
    pub fn new() -> Self {
        Self::from_config(&config::current())
    }

    pub fn from_config(config: &Config) -> Self {
        let errors = match &config.error_handler {
            Some(handler) => ErrorReporter::new(Some(Arc::clone(handler))),
            None => ErrorReporter::global().clone(),
        };
        Self {
            min_level: AtomicU8::new(config.min_level.as_u8()),
            state: Mutex::new(State {
                output: config.output.clone(),
                formatter: config.formatter(),
                source_info: config.source_info,
                log_type: config.log_type.clone(),
            }),
            pipeline: Pipeline::global().clone(),
            errors,
            pool: Pool::global(),
        }
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn with_error_reporter(mut self, errors: ErrorReporter) -> Self {
        self.errors = errors;
        self
    }

    /// Applies output, level, formatter, source capture and log type from
    /// `config`. The error reporter is left alone.
    pub fn reconfigure(&self, config: &Config) {
        self.set_level(config.min_level);
        let mut state = self.state.lock();
        state.output = config.output.clone();
        state.formatter = config.formatter();
        state.source_info = config.source_info;
        state.log_type = config.log_type.clone();
    }

    #[track_caller]
    pub fn log(&self, level: Severity, message: impl AsRef<str>) {
        let location = Location::caller();
        self.write(level, message.as_ref(), None, || {
            SourceLocation::from_location(location)
        });
    }

    #[track_caller]
    pub fn log_with_fields(
        &self,
        level: Severity,
        message: impl AsRef<str>,
        fields: Map<String, Value>,
    ) {
        let location = Location::caller();
        self.write(level, message.as_ref(), Some(fields), || {
            SourceLocation::from_location(location)
        });
    }

    pub fn log_with_source(
        &self,
        level: Severity,
        message: impl AsRef<str>,
        fields: Option<Map<String, Value>>,
        source: SourceLocation,
    ) {
        self.write(level, message.as_ref(), fields, || source);
    }

    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Severity::Debug, message);
    }

    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Severity::Info, message);
    }

    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Severity::Warn, message);
    }

    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Severity::Error, message);
    }

    #[track_caller]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(Severity::Critical, message);
    }

    pub fn level(&self) -> Severity {
        Severity::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub fn is_level_enabled(&self, level: Severity) -> bool {
        level.is_enabled(self.level())
    }

    pub fn set_level(&self, level: Severity) {
        self.min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn set_level_from_str(&self, label: &str) {
        self.set_level(Severity::parse(label));
    }

    pub fn set_output(&self, output: Option<Output>) {
        self.state.lock().output = output;
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.state.lock().formatter = formatter;
    }

    pub fn set_source_info(&self, source_info: bool) {
        self.state.lock().source_info = source_info;
    }

    pub fn set_log_type(&self, log_type: impl Into<String>) {
        self.state.lock().log_type = log_type.into();
    }

    fn write<S>(
        &self,
        level: Severity,
        message: &str,
        fields: Option<Map<String, Value>>,
        source: S,
    ) where
        S: FnOnce() -> SourceLocation,
    {
        if !self.is_level_enabled(level) {
            return;
        }

        let state = self.state.lock();

        let mut record = self.pool.acquire_record();
        let now = Utc::now();
        record.timestamp = now;
        record.level = level;
        record.message.push_str(message);
        record.fields = fields.filter(|fields| !fields.is_empty());
        if state.source_info {
            record.source = Some(source());
        }

        let mut lines = self.pool.acquire_batch();
        if !self.pipeline.process(record, |record| lines.push(record)) {
            trace!(level = %level, "Record dropped by middleware");
            self.pool.release_batch(lines);
            return;
        }

        let envelope = Envelope::new(state.log_type.clone(), Map::new(), now, now, lines);
        emit(
            &envelope,
            state.formatter.as_ref(),
            state.output.as_ref(),
            &self.errors,
        );
        self.pool.release_batch(envelope.runtime.lines);
    }
}

impl Default for DirectLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DirectLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DirectLogger")
            .field("level", &self.level())
            .field("log_type", &state.log_type)
            .field("output", &state.output.is_some())
            .finish_non_exhaustive()
    }
}

/// Process-wide direct logger, created from [`config::current`] on first use
/// and updated by [`config::init`].
pub fn direct() -> &'static DirectLogger {
    static DIRECT: OnceLock<DirectLogger> = OnceLock::new();
    DIRECT.get_or_init(DirectLogger::new)
}
