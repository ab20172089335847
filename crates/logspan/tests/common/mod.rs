// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers shared by the integration tests

#![allow(dead_code)]

use logspan::{BufferOutput, Config, ContextLogger, ErrorReporter, Pipeline};
use serde_json::Value;

/// Logger writing to a fresh buffer, isolated from global middleware and
/// error handling.
pub fn buffered_logger(config: Config) -> (ContextLogger, BufferOutput) {
    let buffer = BufferOutput::new();
    let logger = ContextLogger::from_config(&config.with_output(buffer.clone()))
        .with_pipeline(Pipeline::new())
        .with_error_reporter(ErrorReporter::new(None));
    (logger, buffer)
}

/// Every envelope written to `buffer`, in order.
pub fn envelopes(buffer: &BufferOutput) -> Vec<Value> {
    buffer
        .lines()
        .iter()
        .map(|line| serde_json::from_str(line).expect("envelope is valid JSON"))
        .collect()
}

/// `(level, message)` of each line in `envelope`.
pub fn lines(envelope: &Value) -> Vec<(String, String)> {
    envelope["runtime"]["lines"]
        .as_array()
        .expect("lines is an array")
        .iter()
        .map(|line| {
            (
                line["level"].as_str().unwrap_or_default().to_string(),
                line["message"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

pub fn messages(envelope: &Value) -> Vec<String> {
    lines(envelope).into_iter().map(|(_, message)| message).collect()
}
