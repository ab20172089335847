// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Aggregating logger for one unit of work.
//!
//! Every record logged while handling a request or job is buffered and
//! written as a single envelope when the logger is flushed:
//!
//! ```text
//! log ──> level filter ──> middleware ──> buffer ──(flush)──> formatter ──> output
//!                                            │
//!                                            └── auto flush at max_log_entries
//! ```
//!
//! Context fields persist across flushes. Dropping a logger does not flush it.

use std::fmt;
use std::mem;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{self, Config};
use crate::emit::emit;
use crate::error_handler::ErrorReporter;
use crate::formatter::{Envelope, Formatter};
use crate::level::Severity;
use crate::middleware::Pipeline;
use crate::output::Output;
use crate::pool::Pool;
use crate::record::Record;
use crate::source::SourceLocation;

struct State {
    lines: Vec<Record>,
    context: Map<String, Value>,
    start_time: DateTime<Utc>,
    output: Option<Output>,
    formatter: Arc<dyn Formatter>,
    max_log_entries: usize,
    flush_empty: bool,
    source_info: bool,
    log_type: String,
}

/// Buffers records and writes them as one envelope per flush.
///
/// All methods take `&self`; share a logger between threads with an `Arc`.
/// The state lock is held for the whole of a log call, including a flush it
/// triggers, so a middleware must not log into the logger that is running
/// it.
pub struct ContextLogger {
    min_level: AtomicU8,
    state: Mutex<State>,
    pipeline: Pipeline,
    errors: ErrorReporter,
    pool: &'static Pool,
}

impl ContextLogger {
    /// A logger configured from [`config::current`].
    pub fn new() -> Self {
        Self::from_config(&config::current())
    }

    /// A logger configured from `config`, using the global middleware
    /// pipeline. A handler in `config` is used by this logger only; without
    /// one failures go to the global error handler.
    pub fn from_config(config: &Config) -> Self {
        let errors = match &config.error_handler {
            Some(handler) => ErrorReporter::new(Some(Arc::clone(handler))),
            None => ErrorReporter::global().clone(),
        };
        let pool = Pool::global();
        Self {
            min_level: AtomicU8::new(config.min_level.as_u8()),
            state: Mutex::new(State {
                lines: pool.acquire_batch(),
                context: Map::new(),
                start_time: Utc::now(),
                output: config.output.clone(),
                formatter: config.formatter(),
                max_log_entries: config.max_log_entries,
                flush_empty: config.flush_empty,
                source_info: config.source_info,
                log_type: config.log_type.clone(),
            }),
            pipeline: Pipeline::global().clone(),
            errors,
            pool,
        }
    }

    /// Runs records through `pipeline` instead of the global one.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Reports failures to `errors` instead of the global handler.
    #[must_use]
    pub fn with_error_reporter(mut self, errors: ErrorReporter) -> Self {
        self.errors = errors;
        self
    }

    pub fn add_context_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.lock().context.insert(key.into(), value.into());
    }

    pub fn add_context_values<I, K, V>(&self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut state = self.state.lock();
        for (key, value) in values {
            state.context.insert(key.into(), value.into());
        }
    }

    pub fn context_value(&self, key: &str) -> Option<Value> {
        self.state.lock().context.get(key).cloned()
    }

    pub fn context(&self) -> Map<String, Value> {
        self.state.lock().context.clone()
    }

    #[track_caller]
    pub fn log(&self, level: Severity, message: impl AsRef<str>) {
        let location = Location::caller();
        self.append(level, message.as_ref(), None, || {
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
        self.append(level, message.as_ref(), Some(fields), || {
            SourceLocation::from_location(location)
        });
    }

    /// Logs with an explicit call site. Used by the logging macros, which
    /// also know the enclosing function.
    pub fn log_with_source(
        &self,
        level: Severity,
        message: impl AsRef<str>,
        fields: Option<Map<String, Value>>,
        source: SourceLocation,
    ) {
        self.append(level, message.as_ref(), fields, || source);
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

    /// Writes buffered records as one envelope and starts a new batch.
    ///
    /// An empty buffer is written only when `flush_empty` is set. Context
    /// fields are kept.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        self.flush_locked(&mut state);
    }

    pub fn is_level_enabled(&self, level: Severity) -> bool {
        level.is_enabled(self.level())
    }

    pub fn level(&self) -> Severity {
        Severity::from_u8(self.min_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Severity) {
        self.min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Sets the minimum level from a label; unknown labels mean `INFO`.
    pub fn set_level_from_str(&self, label: &str) {
        self.set_level(Severity::parse(label));
    }

    /// `None` discards flushed batches.
    pub fn set_output(&self, output: Option<Output>) {
        self.state.lock().output = output;
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.state.lock().formatter = formatter;
    }

    /// 0 disables auto flush.
    pub fn set_max_log_entries(&self, max_log_entries: usize) {
        self.state.lock().max_log_entries = max_log_entries;
    }

    pub fn set_flush_empty(&self, flush_empty: bool) {
        self.state.lock().flush_empty = flush_empty;
    }

    pub fn set_source_info(&self, source_info: bool) {
        self.state.lock().source_info = source_info;
    }

    pub fn set_log_type(&self, log_type: impl Into<String>) {
        self.state.lock().log_type = log_type.into();
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().lines.is_empty()
    }

    fn append<S>(
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

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let mut record = self.pool.acquire_record();
        record.timestamp = Utc::now();
        record.level = level;
        record.message.push_str(message);
        record.fields = fields.filter(|fields| !fields.is_empty());
        if state.source_info {
            record.source = Some(source());
        }

        let lines = &mut state.lines;
        if !self.pipeline.process(record, |record| lines.push(record)) {
            trace!(level = %level, "Record dropped by middleware");
            return;
        }

        if state.max_log_entries > 0 && state.lines.len() >= state.max_log_entries {
            debug!(
                entries = state.lines.len(),
                "Reached max log entries, flushing batch"
            );
            self.flush_locked(state);
        }
    }

    fn flush_locked(&self, state: &mut State) {
        if state.lines.is_empty() && !state.flush_empty {
            return;
        }

        let end_time = Utc::now();
        let lines = mem::replace(&mut state.lines, self.pool.acquire_batch());
        let envelope = Envelope::new(
            state.log_type.clone(),
            state.context.clone(),
            state.start_time,
            end_time,
            lines,
        );

        emit(
            &envelope,
            state.formatter.as_ref(),
            state.output.as_ref(),
            &self.errors,
        );

        self.pool.release_batch(envelope.runtime.lines);
        state.start_time = Utc::now();
    }
}

impl Default for ContextLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ContextLogger")
            .field("level", &self.level())
            .field("log_type", &state.log_type)
            .field("buffered", &state.lines.len())
            .field("context", &state.context)
            .field("max_log_entries", &state.max_log_entries)
            .finish_non_exhaustive()
    }
}
