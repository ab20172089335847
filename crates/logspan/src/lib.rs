// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request-scoped log aggregation.
//!
//! A [`ContextLogger`] collects every line logged while one request or job
//! is handled and writes them as a single structured envelope:
//!
//! ```json
//! {"type":"request","context":{"request_id":"r-42"},
//!  "runtime":{"severity":"WARN","startTime":"...","endTime":"...","elapsed":12,
//!             "lines":[{"timestamp":"...","level":"INFO","message":"..."}, ...]}}
//! ```
//!
//! Records pass a level filter and the middleware [`Pipeline`] before they
//! are buffered. A [`Formatter`] serializes each flushed batch and an
//! [`Output`] receives the bytes. Formatting and write failures never reach
//! the caller; they go to an [`ErrorHandler`].
//!
//! [`DirectLogger`] writes every record at once as its own envelope, and
//! [`scope`] makes a logger reachable from deep in a call stack.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod context_logger;
pub mod direct_logger;
mod emit;
pub mod error_handler;
pub mod errors;
pub mod formatter;
pub mod level;
mod macros;
pub mod masking;
pub mod middleware;
pub mod output;
pub mod pool;
pub mod record;
pub mod scope;
pub mod source;

pub use config::Config;
pub use context_logger::ContextLogger;
pub use direct_logger::{direct, DirectLogger};
pub use error_handler::{
    global_error_handler, set_global_error_handler, ErrorHandler, ErrorReporter,
    SilentErrorHandler, WriterErrorHandler,
};
pub use errors::{ConfigError, Error, FormatError};
pub use formatter::{
    default_formatter, ContextFlattenFormatter, DatadogFormatter, Envelope, Formatter,
    JsonFormatter, Runtime,
};
pub use level::Severity;
pub use masking::PasswordMasking;
pub use middleware::{
    add_middleware, clear_middleware, middleware_count, Middleware, MiddlewareChain, Next,
    Pipeline,
};
pub use output::{BufferOutput, Output};
pub use pool::Pool;
pub use record::Record;
pub use source::SourceLocation;
