// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Formatting macros that record the enclosing function as well as the file
//! and line.
//!
//! Each level macro takes either a format string, logging into
//! [`crate::scope::current`], or a logger followed by a format string:
//!
//! ```
//! use logspan::{info, warn, ContextLogger};
//!
//! let logger = ContextLogger::new();
//! info!(logger, "charged {} cents", 1250);
//! warn!("no logger in scope, goes to a throwaway one");
//! assert_eq!(logger.len(), 1);
//! ```
//!
//! The logger may be a [`crate::ContextLogger`] or a [`crate::DirectLogger`],
//! or anything that dereferences to one.

/// Logs at an explicit [`crate::Severity`].
#[macro_export]
macro_rules! log {
    ($level:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::scope::current().log_with_source(
            $level,
            ::std::format!($fmt $(, $arg)*),
            ::std::option::Option::None,
            $crate::source_location!(),
        )
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_with_source(
            $level,
            ::std::format!($($arg)+),
            ::std::option::Option::None,
            $crate::source_location!(),
        )
    };
}

#[macro_export]
macro_rules! debug {
    ($fmt:literal $($rest:tt)*) => {
        $crate::log!($crate::Severity::Debug, $fmt $($rest)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($fmt:literal $($rest:tt)*) => {
        $crate::log!($crate::Severity::Info, $fmt $($rest)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($fmt:literal $($rest:tt)*) => {
        $crate::log!($crate::Severity::Warn, $fmt $($rest)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $($rest:tt)*) => {
        $crate::log!($crate::Severity::Error, $fmt $($rest)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($fmt:literal $($rest:tt)*) => {
        $crate::log!($crate::Severity::Critical, $fmt $($rest)*)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Critical, $($arg)+)
    };
}
