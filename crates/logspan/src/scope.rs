// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-thread "current" logger.
//!
//! A request handler enters a scope with its [`ContextLogger`]; code further
//! down the call stack logs through the free functions here without being
//! handed the logger.
//!
//! ```
//! use std::sync::Arc;
//! use logspan::{scope, ContextLogger};
//!
//! let logger = Arc::new(ContextLogger::new());
//! scope::with(Arc::clone(&logger), || {
//!     scope::add_context_value("request_id", "r-42");
//!     scope::info("handling request");
//! });
//! assert_eq!(logger.len(), 1);
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::context_logger::ContextLogger;
use crate::level::Severity;

thread_local! {
    static STACK: RefCell<Vec<Arc<ContextLogger>>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a logger current until dropped. Must be dropped on the thread that
/// created it.
#[must_use = "the logger stops being current when the guard is dropped"]
pub struct ScopeGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        STACK.with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

/// Makes `logger` the current logger of this thread.
pub fn enter(logger: Arc<ContextLogger>) -> ScopeGuard {
    let depth = STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(logger);
        stack.len() - 1
    });
    ScopeGuard {
        depth,
        _not_send: PhantomData,
    }
}

/// Runs `f` with `logger` current.
pub fn with<F, R>(logger: Arc<ContextLogger>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = enter(logger);
    f()
}

/// Innermost logger entered on this thread, if any.
pub fn try_current() -> Option<Arc<ContextLogger>> {
    STACK.with(|stack| stack.borrow().last().cloned())
}

/// Innermost logger entered on this thread.
///
/// Outside any scope this is a fresh logger built from the global
/// configuration, so records logged through it are only written if that same
/// handle is flushed.
pub fn current() -> Arc<ContextLogger> {
    try_current().unwrap_or_else(|| Arc::new(ContextLogger::new()))
}

pub fn add_context_value(key: impl Into<String>, value: impl Into<Value>) {
    current().add_context_value(key, value);
}

pub fn add_context_values<I, K, V>(values: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    current().add_context_values(values);
}

#[track_caller]
pub fn log(level: Severity, message: impl AsRef<str>) {
    current().log(level, message);
}

#[track_caller]
pub fn debug(message: impl AsRef<str>) {
    current().log(Severity::Debug, message);
}

#[track_caller]
pub fn info(message: impl AsRef<str>) {
    current().log(Severity::Info, message);
}

#[track_caller]
pub fn warn(message: impl AsRef<str>) {
    current().log(Severity::Warn, message);
}

#[track_caller]
pub fn error(message: impl AsRef<str>) {
    current().log(Severity::Error, message);
}

#[track_caller]
pub fn critical(message: impl AsRef<str>) {
    current().log(Severity::Critical, message);
}

pub fn flush() {
    current().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error_handler::ErrorReporter;
    use crate::middleware::Pipeline;
    use crate::output::BufferOutput;

    fn logger() -> (Arc<ContextLogger>, BufferOutput) {
        let buffer = BufferOutput::new();
        let logger = ContextLogger::from_config(&Config::default().with_output(buffer.clone()))
            .with_pipeline(Pipeline::new())
            .with_error_reporter(ErrorReporter::new(None));
        (Arc::new(logger), buffer)
    }

    #[test]
    fn test_free_functions_use_current_logger() {
        let (logger, buffer) = logger();
        with(Arc::clone(&logger), || {
            add_context_value("request_id", "r-1");
            add_context_values([("user", "bob")]);
            debug("hidden");
            info("a");
            warn("b");
            error("c");
            critical("d");
            log(Severity::Info, "e");
            assert_eq!(logger.len(), 5);
            flush();
        });

        let out: Value = serde_json::from_str(&buffer.lines()[0]).unwrap();
        assert_eq!(out["context"]["request_id"], "r-1");
        assert_eq!(out["context"]["user"], "bob");
        assert_eq!(out["runtime"]["severity"], "CRITICAL");
        assert_eq!(out["runtime"]["lines"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_nested_scopes() {
        let (outer, _) = logger();
        let (inner, _) = logger();

        assert!(try_current().is_none());
        let _outer_guard = enter(Arc::clone(&outer));
        {
            let _inner_guard = enter(Arc::clone(&inner));
            info("inner");
            assert!(Arc::ptr_eq(&current(), &inner));
        }
        info("outer");
        assert!(Arc::ptr_eq(&current(), &outer));
        assert_eq!(inner.len(), 1);
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn test_scope_is_per_thread() {
        let (logger, _) = logger();
        let _guard = enter(Arc::clone(&logger));

        let seen = std::thread::spawn(|| try_current().is_some())
            .join()
            .unwrap();
        assert!(!seen);
        assert!(try_current().is_some());
    }

    #[test]
    fn test_fallback_is_fresh_logger() {
        assert!(try_current().is_none());
        let a = current();
        let b = current();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(a.is_empty());
    }

    #[test]
    fn test_with_returns_value() {
        let (logger, _) = logger();
        let result = with(logger, || 42);
        assert_eq!(result, 42);
        assert!(try_current().is_none());
    }
}
