// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Serialization of a finished batch.
//!
//! A logger builds one [`Envelope`] per flush and hands it to its
//! [`Formatter`], which turns it into the bytes written to the sink.
//!
//! - [`JsonFormatter`]: the envelope as nested JSON
//! - [`ContextFlattenFormatter`]: context keys promoted to the top level
//! - [`DatadogFormatter`]: Datadog standard attributes

mod datadog;
mod flatten;
mod json;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::errors::FormatError;
use crate::level::Severity;
use crate::record::{serialize_timestamp, Record};

pub use datadog::DatadogFormatter;
pub use flatten::ContextFlattenFormatter;
pub use json::JsonFormatter;

/// Indentation used when pretty printing is enabled.
pub const PRETTY_INDENT: &str = "  ";

/// Turns an envelope into bytes. Implementations must not keep state between
/// calls that changes their output.
pub trait Formatter: Send + Sync {
    fn format(&self, envelope: &Envelope) -> Result<Vec<u8>, FormatError>;
}

impl<F> Formatter for F
where
    F: Fn(&Envelope) -> Result<Vec<u8>, FormatError> + Send + Sync,
{
    fn format(&self, envelope: &Envelope) -> Result<Vec<u8>, FormatError> {
        self(envelope)
    }
}

/// One flushed batch: `{"type", "context", "runtime"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub context: Map<String, Value>,
    pub runtime: Runtime,
}

/// Timing and content of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    pub severity: Severity,
    #[serde(serialize_with = "serialize_timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub end_time: DateTime<Utc>,
    /// Whole milliseconds between start and end.
    pub elapsed: i64,
    pub lines: Vec<Record>,
}

impl Envelope {
    /// Builds an envelope, deriving severity and elapsed time from the
    /// arguments.
    pub fn new(
        kind: impl Into<String>,
        context: Map<String, Value>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        lines: Vec<Record>,
    ) -> Self {
        let severity = Severity::highest(lines.iter().map(|line| line.level));
        let elapsed = (end_time - start_time).num_milliseconds();
        Self {
            kind: kind.into(),
            context,
            runtime: Runtime {
                severity,
                start_time,
                end_time,
                elapsed,
                lines,
            },
        }
    }
}

/// Compact JSON formatter, or one indented by [`PRETTY_INDENT`] when
/// `prettify` is set.
pub fn default_formatter(prettify: bool) -> Arc<dyn Formatter> {
    if prettify {
        Arc::new(JsonFormatter::with_indent(PRETTY_INDENT))
    } else {
        Arc::new(JsonFormatter::new())
    }
}

/// Serializes `value`, compact when `indent` is empty.
fn to_json<T>(value: &T, indent: &str) -> Result<Vec<u8>, FormatError>
where
    T: Serialize + ?Sized,
{
    if indent.is_empty() {
        return Ok(serde_json::to_vec(value)?);
    }

    let mut buffer = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(
        &mut buffer,
        PrettyFormatter::with_indent(indent.as_bytes()),
    );
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    pub(crate) fn sample_envelope() -> Envelope {
        let start = Utc.with_ymd_and_hms(2023, 10, 27, 0, 59, 58).unwrap()
            + chrono::Duration::milliseconds(123);
        let end = start + chrono::Duration::milliseconds(2100);

        let mut first = Record::new(Severity::Info, "Request processing started");
        first.timestamp = start + chrono::Duration::seconds(1);
        let mut second = Record::new(Severity::Warn, "Slow query").with_field("query_ms", 840);
        second.timestamp = start + chrono::Duration::seconds(2);

        let mut context = Map::new();
        context.insert("request_id".to_string(), json!("req-123"));
        context.insert("user_id".to_string(), json!("user-456"));

        Envelope::new("request", context, start, end, vec![first, second])
    }

    #[test]
    fn test_envelope_derives_severity_and_elapsed() {
        let envelope = sample_envelope();
        assert_eq!(envelope.runtime.severity, Severity::Warn);
        assert_eq!(envelope.runtime.elapsed, 2100);
    }

    #[test]
    fn test_empty_envelope_is_debug() {
        let now = Utc::now();
        let envelope = Envelope::new("request", Map::new(), now, now, Vec::new());
        assert_eq!(envelope.runtime.severity, Severity::Debug);
        assert_eq!(envelope.runtime.elapsed, 0);
    }

    #[test]
    fn test_envelope_shape() {
        let value = serde_json::to_value(sample_envelope()).unwrap();
        assert_eq!(value["type"], "request");
        assert_eq!(value["context"]["request_id"], "req-123");
        assert_eq!(value["runtime"]["severity"], "WARN");
        assert_eq!(value["runtime"]["startTime"], "2023-10-27T00:59:58.123Z");
        assert_eq!(value["runtime"]["endTime"], "2023-10-27T01:00:00.223Z");
        assert_eq!(value["runtime"]["elapsed"], 2100);
        assert_eq!(value["runtime"]["lines"][1]["fields"], json!({"query_ms": 840}));
    }

    #[test]
    fn test_default_formatter() {
        let envelope = sample_envelope();
        let compact = default_formatter(false).format(&envelope).unwrap();
        let pretty = default_formatter(true).format(&envelope).unwrap();

        assert!(!compact.contains(&b'\n'));
        assert!(pretty.starts_with(b"{\n  \"type\""));

        let a: Value = serde_json::from_slice(&compact).unwrap();
        let b: Value = serde_json::from_slice(&pretty).unwrap();
        assert_eq!(a, b);
    }
}
