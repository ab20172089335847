// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::{Map, Value};

use super::{to_json, Envelope, Formatter};
use crate::errors::FormatError;

/// Promotes context keys to the top level next to `type` and `runtime`.
///
/// A context key named `type` or `runtime` replaces the envelope's own value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFlattenFormatter {
    indent: String,
}

impl ContextFlattenFormatter {
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

    /// The top-level object that [`Formatter::format`] serializes.
    pub fn flatten(&self, envelope: &Envelope) -> Result<Map<String, Value>, FormatError> {
        let mut flattened = envelope.context.clone();
        if !flattened.contains_key("type") {
            flattened.insert("type".to_string(), Value::String(envelope.kind.clone()));
        }
        if !flattened.contains_key("runtime") {
            flattened.insert(
                "runtime".to_string(),
                serde_json::to_value(&envelope.runtime)?,
            );
        }
        Ok(flattened)
    }
}

impl Formatter for ContextFlattenFormatter {
    fn format(&self, envelope: &Envelope) -> Result<Vec<u8>, FormatError> {
        to_json(&self.flatten(envelope)?, &self.indent)
    }
}
