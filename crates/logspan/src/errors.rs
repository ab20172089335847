// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types.
//!
//! None of these ever reach callers of `log` or `flush`; they are routed to
//! the active [`crate::ErrorHandler`] instead.

use thiserror::Error;

/// A formatter could not serialize an envelope.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Failure while emitting a batch.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to format log output: {0}")]
    Format(#[from] FormatError),

    #[error("failed to write log output: {0}")]
    Write(#[from] std::io::Error),
}

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("log type must not be empty")]
    EmptyLogType,
}
