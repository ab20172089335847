// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record severity.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a log record, ordered from least to most severe.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
    Critical = 4,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Parses an upper-case label such as `"WARN"`.
    ///
    /// Matching is case-sensitive. Anything unrecognized yields
    /// [`Severity::Info`]; a bad label is never an error.
    pub fn parse(label: &str) -> Severity {
        match label {
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "WARN" => Severity::Warn,
            "ERROR" => Severity::Error,
            "CRITICAL" => Severity::Critical,
            _ => Severity::Info,
        }
    }

    /// Returns true when a record at `self` passes a `minimum` threshold.
    pub fn is_enabled(&self, minimum: Severity) -> bool {
        *self >= minimum
    }

    pub fn is_higher_than(&self, other: Severity) -> bool {
        *self > other
    }

    pub fn is_lower_than(&self, other: Severity) -> bool {
        *self < other
    }

    /// Highest severity in `levels`, or [`Severity::Debug`] when empty.
    pub fn highest<I>(levels: I) -> Severity
    where
        I: IntoIterator<Item = Severity>,
    {
        levels.into_iter().max().unwrap_or(Severity::Debug)
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Severity {
        match value {
            0 => Severity::Debug,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Severity::parse(s))
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        Severity::parse(label)
    }
}
