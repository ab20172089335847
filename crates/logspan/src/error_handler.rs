// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reporting of internal failures.
//!
//! Formatting and write failures never propagate to callers of `log` or
//! `flush`. They are handed to an [`ErrorHandler`] held in an
//! [`ErrorReporter`] slot; an empty slot swallows them.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::errors::Error;
use crate::output::Output;

pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, operation: &str, error: &Error);
}

/// Any `Fn(&str, &Error)` closure can act as a handler.
impl<F> ErrorHandler for F
where
    F: Fn(&str, &Error) + Send + Sync,
{
    fn handle_error(&self, operation: &str, error: &Error) {
        self(operation, error)
    }
}

/// Writes `[LOGGER ERROR] <operation>: <error>` lines to an output.
///
/// Defaults to stderr so diagnostics never mix with the log stream.
#[derive(Debug)]
pub struct WriterErrorHandler {
    output: Mutex<Option<Output>>,
}

impl WriterErrorHandler {
    pub fn new() -> Self {
        Self::with_output(Output::stderr())
    }

    pub fn with_output(output: Output) -> Self {
        Self {
            output: Mutex::new(Some(output)),
        }
    }

    pub fn set_output(&self, output: Option<Output>) {
        *self.output.lock() = output;
    }
}

impl Default for WriterErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler for WriterErrorHandler {
    fn handle_error(&self, operation: &str, error: &Error) {
        let output = self.output.lock();
        if let Some(output) = output.as_ref() {
            let line = format!("[LOGGER ERROR] {operation}: {error}\n");
            // Nowhere left to report a failure of the diagnostic stream itself.
            let _ = output.write_all(line.as_bytes());
        }
    }
}

/// Drops every error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentErrorHandler;

impl ErrorHandler for SilentErrorHandler {
    fn handle_error(&self, _operation: &str, _error: &Error) {}
}

/// Swappable slot holding the active handler.
///
/// Reporting takes the read lock, swapping takes the write lock.
#[derive(Clone)]
pub struct ErrorReporter {
    handler: Arc<RwLock<Option<Arc<dyn ErrorHandler>>>>,
}

impl ErrorReporter {
    pub fn new(handler: Option<Arc<dyn ErrorHandler>>) -> Self {
        Self {
            handler: Arc::new(RwLock::new(handler)),
        }
    }

    /// Process-wide reporter, initialized with a [`WriterErrorHandler`] on
    /// stderr.
    pub fn global() -> &'static ErrorReporter {
        static GLOBAL: OnceLock<ErrorReporter> = OnceLock::new();
        GLOBAL.get_or_init(|| ErrorReporter::new(Some(Arc::new(WriterErrorHandler::new()))))
    }

    pub fn set(&self, handler: Option<Arc<dyn ErrorHandler>>) {
        *self.handler.write() = handler;
    }

    pub fn get(&self) -> Option<Arc<dyn ErrorHandler>> {
        self.handler.read().clone()
    }

    pub fn report(&self, operation: &str, error: &Error) {
        let handler = self.handler.read();
        if let Some(handler) = handler.as_ref() {
            handler.handle_error(operation, error);
        }
    }

    /// Reports the error side of `result`; `Ok` never reaches the handler.
    pub fn report_result<T, E>(&self, operation: &str, result: Result<T, E>) -> Option<T>
    where
        E: Into<Error>,
    {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(operation, &error.into());
                None
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        ErrorReporter::global().clone()
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("installed", &self.handler.read().is_some())
            .finish()
    }
}

pub fn set_global_error_handler(handler: Option<Arc<dyn ErrorHandler>>) {
    ErrorReporter::global().set(handler);
}

pub fn global_error_handler() -> Option<Arc<dyn ErrorHandler>> {
    ErrorReporter::global().get()
}
