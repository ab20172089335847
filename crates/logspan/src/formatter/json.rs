// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{to_json, Envelope, Formatter};
use crate::errors::FormatError;

/// Writes the envelope as-is: `{"type", "context", "runtime"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonFormatter {
    indent: String,
}

impl JsonFormatter {
    /// Compact output on a single line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty output using `indent` per level. An empty indent is compact.
    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
        }
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, envelope: &Envelope) -> Result<Vec<u8>, FormatError> {
        to_json(envelope, &self.indent)
    }
}
