// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Format-and-write step shared by both loggers.

use tracing::{debug, warn};

use crate::error_handler::ErrorReporter;
use crate::errors::Error;
use crate::formatter::{Envelope, Formatter};
use crate::output::Output;

/// Formats `envelope` and writes it, followed by a newline, in one call.
///
/// Failures are reported to `errors` and a plain-text notice is written in
/// place of the batch. Nothing here panics or returns an error.
pub(crate) fn emit(
    envelope: &Envelope,
    formatter: &dyn Formatter,
    output: Option<&Output>,
    errors: &ErrorReporter,
) {
    let Some(output) = output else {
        debug!(
            lines = envelope.runtime.lines.len(),
            "No output configured, discarding log batch"
        );
        return;
    };

    let mut bytes = match formatter.format(envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to format log batch: {e}");
            let notice = format!("Error formatting log: {e}\n");
            errors.report("format", &Error::Format(e));
            write_fallback(output, &notice, errors);
            return;
        }
    };

    bytes.push(b'\n');
    if let Err(e) = output.write_all(&bytes) {
        warn!("Failed to write log batch: {e}");
        let notice = format!("Error writing log output: {e}\n");
        errors.report("write", &Error::Write(e));
        write_fallback(output, &notice, errors);
    }
}

fn write_fallback(output: &Output, notice: &str, errors: &ErrorReporter) {
    if let Err(e) = output.write_all(notice.as_bytes()) {
        errors.report("write_fallback", &Error::Write(e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FormatError;
    use crate::formatter::JsonFormatter;
    use crate::output::BufferOutput;
    use chrono::Utc;
    use parking_lot::Mutex;
    use serde_json::Map;
    use std::io::{self, Write};
    use std::sync::Arc;
    use tracing_test::traced_test;

    struct RejectingFormatter;

    impl Formatter for RejectingFormatter {
        fn format(&self, _envelope: &Envelope) -> Result<Vec<u8>, FormatError> {
            Err(FormatError::Custom("unsupported value".to_string()))
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn recording_reporter() -> (ErrorReporter, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ErrorReporter::new(Some(Arc::new(move |op: &str, err: &Error| {
            sink.lock().push(format!("{op}: {err}"));
        })));
        (reporter, seen)
    }

    fn envelope() -> Envelope {
        let now = Utc::now();
        Envelope::new("request", Map::new(), now, now, Vec::new())
    }

    #[test]
    fn test_writes_single_line() {
        let buffer = BufferOutput::new();
        let (reporter, seen) = recording_reporter();

        emit(
            &envelope(),
            &JsonFormatter::new(),
            Some(&buffer.clone().into()),
            &reporter,
        );

        let contents = buffer.contents();
        assert!(contents.starts_with("{\"type\":\"request\""));
        assert!(contents.ends_with("}\n"));
        assert_eq!(buffer.lines().len(), 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_format_failure_writes_notice() {
        let buffer = BufferOutput::new();
        let (reporter, seen) = recording_reporter();

        emit(
            &envelope(),
            &RejectingFormatter,
            Some(&buffer.clone().into()),
            &reporter,
        );

        assert_eq!(
            buffer.contents(),
            "Error formatting log: unsupported value\n"
        );
        assert_eq!(
            seen.lock().as_slice(),
            ["format: failed to format log output: unsupported value"]
        );
        assert!(logs_contain("Failed to format log batch"));
    }

    #[test]
    #[traced_test]
    fn test_write_failure_reports_both_attempts() {
        let (reporter, seen) = recording_reporter();

        emit(
            &envelope(),
            &JsonFormatter::new(),
            Some(&Output::new(BrokenPipe)),
            &reporter,
        );

        assert_eq!(
            seen.lock().as_slice(),
            [
                "write: failed to write log output: pipe closed",
                "write_fallback: failed to write log output: pipe closed",
            ]
        );
        assert!(logs_contain("Failed to write log batch"));
    }

    #[test]
    #[traced_test]
    fn test_missing_output_is_silent() {
        let (reporter, seen) = recording_reporter();

        emit(&envelope(), &RejectingFormatter, None, &reporter);

        assert!(seen.lock().is_empty());
        assert!(logs_contain("No output configured"));
    }
}
