// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A single log line.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::level::Severity;
use crate::source::SourceLocation;

/// One log line as retained in a batch.
///
/// Middleware receives records by value and may rewrite any field before
/// passing them on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub source: Option<SourceLocation>,
}

impl Record {
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        if !fields.is_empty() {
            self.fields.get_or_insert_with(Map::new).extend(fields);
        }
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.as_ref().and_then(|fields| fields.get(key))
    }

    /// Returns every field to its zero value, keeping the message buffer.
    /// The pool drops records whose buffer grew too large before calling this.
    pub(crate) fn reset(&mut self) {
        self.timestamp = DateTime::<Utc>::UNIX_EPOCH;
        self.level = Severity::Debug;
        self.message.clear();
        self.fields = None;
        self.source = None;
    }
}

impl Default for Record {
    fn default() -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            level: Severity::Debug,
            message: String::new(),
            fields: None,
            source: None,
        }
    }
}

/// RFC 3339 with only as many sub-second digits as needed.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn serialize_timestamp<S>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(timestamp))
}
