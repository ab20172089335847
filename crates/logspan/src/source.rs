// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Call-site capture for records.
//!
//! Location is taken exactly once, at the outermost public logging entry
//! point. Plain method calls rely on `#[track_caller]` and therefore know the
//! file and line but not the enclosing function; the logging macros also fill
//! in the function name.

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Where a record was produced.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(rename = "funcname", skip_serializing_if = "Option::is_none", default)]
    pub function: Option<String>,
    #[serde(rename = "filename")]
    pub file: String,
    #[serde(rename = "fileline")]
    pub line: u32,
}

impl SourceLocation {
    pub fn new(function: Option<&str>, file: &str, line: u32) -> Self {
        Self {
            function: function.map(str::to_string),
            file: base_name(file).to_string(),
            line,
        }
    }

    /// Location of whoever called the `#[track_caller]` chain this is
    /// invoked from.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(None, location.file(), location.line())
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Expands to the fully qualified name of the enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let mut name = name.strip_suffix("::f").unwrap_or(name);
        while let Some(outer) = name.strip_suffix("::{{closure}}") {
            name = outer;
        }
        name
    }};
}

/// Expands to a [`SourceLocation`] for the macro call site.
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::SourceLocation::new(Some($crate::__function_name!()), file!(), line!())
    };
}
