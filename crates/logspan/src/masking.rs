// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Middleware that redacts credentials from messages and record fields.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::middleware::{Middleware, Next};
use crate::record::Record;

const DEFAULT_MASK: &str = "***";

const DEFAULT_KEYS: [&str; 13] = [
    "password",
    "passwd",
    "pwd",
    "pass",
    "secret",
    "token",
    "key",
    "auth",
    "credential",
    "credentials",
    "api_key",
    "access_token",
    "refresh_token",
];

lazy_static! {
    /// `password=value` and `password: value`
    static ref ASSIGNMENT_PATTERN: Regex = Regex::new(
        r"(?i)(password|passwd|pwd|pass|secret|token|key|auth|credential|api_key|access_token|refresh_token)\s*[=:]\s*\S+"
    )
    .expect("failed creating regex");

    /// `"password":"value"`
    static ref JSON_PATTERN: Regex = Regex::new(
        r#"(?i)"(password|passwd|pwd|pass|secret|token|key|auth|credential|api_key|access_token|refresh_token)"\s*:\s*"[^"]+""#
    )
    .expect("failed creating regex");
}

/// Replaces credential values with a mask before records are kept.
///
/// Message text is scanned with the configured patterns. Record fields whose
/// key matches one of the configured keys (ignoring case) have their whole
/// value replaced. The record always continues down the chain.
#[derive(Debug, Clone)]
pub struct PasswordMasking {
    mask: String,
    keys: Vec<String>,
    patterns: Vec<Regex>,
}

impl Default for PasswordMasking {
    fn default() -> Self {
        Self {
            mask: DEFAULT_MASK.to_string(),
            keys: DEFAULT_KEYS.iter().map(|key| key.to_string()).collect(),
            patterns: vec![ASSIGNMENT_PATTERN.clone(), JSON_PATTERN.clone()],
        }
    }
}

impl PasswordMasking {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }

    /// Replaces the field keys that are masked.
    #[must_use]
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn add_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Adds a message pattern. The part of each match after the first `=` or
    /// `:` is masked; a match with neither is masked entirely.
    #[must_use]
    pub fn add_pattern(mut self, pattern: Regex) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn is_password_key(&self, key: &str) -> bool {
        self.keys
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(key))
    }

    pub fn mask_message<'a>(&self, message: &'a str) -> Cow<'a, str> {
        let mut masked = Cow::Borrowed(message);
        for pattern in &self.patterns {
            if !pattern.is_match(&masked) {
                continue;
            }
            let replaced = pattern
                .replace_all(&masked, |caps: &Captures<'_>| self.mask_match(&caps[0]))
                .into_owned();
            masked = Cow::Owned(replaced);
        }
        masked
    }

    fn mask_match(&self, matched: &str) -> String {
        let Some(index) = matched.find(['=', ':']) else {
            return self.mask.clone();
        };
        let prefix = &matched[..index];
        if matched.as_bytes()[index] == b'=' {
            return format!("{prefix}={}", self.mask);
        }

        let value = matched[index + 1..].trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            format!("{prefix}:\"{}\"", self.mask)
        } else {
            format!("{prefix}: {}", self.mask)
        }
    }

    fn mask_fields(&self, record: &mut Record) {
        let Some(fields) = record.fields.as_mut() else {
            return;
        };
        for (key, value) in fields.iter_mut() {
            if self.is_password_key(key) {
                *value = Value::String(self.mask.clone());
            }
        }
    }
}

impl Middleware for PasswordMasking {
    fn handle(&self, mut record: Record, next: Next<'_>) {
        if let Cow::Owned(masked) = self.mask_message(&record.message) {
            record.message = masked;
        }
        self.mask_fields(&mut record);
        next.run(record);
    }
}
