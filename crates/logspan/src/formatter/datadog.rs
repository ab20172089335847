// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use super::{to_json, Envelope, Formatter};
use crate::errors::FormatError;
use crate::level::Severity;
use crate::record::{format_timestamp, Record};

const LOGGER_NAME: &str = "logspan";

/// Emits Datadog standard attributes.
///
/// ```json
/// {"timestamp": "...", "status": "warn", "message": "...", "logger": "logspan",
///  "duration": 12, "request_id": "...", "lines": [...]}
/// ```
///
/// Context keys sit at the top level and replace any standard attribute of
/// the same name. `lines` is omitted for an empty batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatadogFormatter {
    indent: String,
}

impl DatadogFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
        }
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Lowercase status Datadog expects for `severity`.
    pub fn status(severity: Severity) -> &'static str {
        match severity {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    fn summary(lines: &[Record]) -> &str {
        match lines {
            [] => "Empty log context",
            [line] => &line.message,
            _ => "Log context with multiple entries",
        }
    }

    fn line(record: &Record) -> Value {
        let mut line = Map::new();
        line.insert(
            "timestamp".to_string(),
            Value::String(
                record
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
        line.insert(
            "status".to_string(),
            Value::String(Self::status(record.level).to_string()),
        );
        line.insert(
            "message".to_string(),
            Value::String(record.message.clone()),
        );
        line.insert(
            "logger".to_string(),
            Value::String(LOGGER_NAME.to_string()),
        );
        if let Some(fields) = &record.fields {
            for (key, value) in fields {
                line.insert(key.clone(), value.clone());
            }
        }
        Value::Object(line)
    }

    fn convert(envelope: &Envelope) -> Map<String, Value> {
        let runtime = &envelope.runtime;
        let mut output = Map::new();
        output.insert(
            "timestamp".to_string(),
            Value::String(format_timestamp(&runtime.start_time)),
        );
        output.insert(
            "status".to_string(),
            Value::String(Self::status(runtime.severity).to_string()),
        );
        output.insert(
            "message".to_string(),
            Value::String(Self::summary(&runtime.lines).to_string()),
        );
        output.insert(
            "logger".to_string(),
            Value::String(LOGGER_NAME.to_string()),
        );
        output.insert("duration".to_string(), Value::from(runtime.elapsed));

        for (key, value) in &envelope.context {
            output.insert(key.clone(), value.clone());
        }

        if !runtime.lines.is_empty() {
            output.insert(
                "lines".to_string(),
                Value::Array(runtime.lines.iter().map(Self::line).collect()),
            );
        }
        output
    }
}

impl Formatter for DatadogFormatter {
    fn format(&self, envelope: &Envelope) -> Result<Vec<u8>, FormatError> {
        to_json(&Self::convert(envelope), &self.indent)
    }
}
