//! Failure translation for the HTTP transport
//!
//! Every failure raised while executing a request is mapped onto
//! `Error::Connection` with an advisory retry flag.
//!
//! # Retry eligibility
//!
//! Retryable:
//! - Timeouts (reqwest's own or the per-call deadline)
//! - Connection failures: refused, reset, aborted, DNS, broken pipe
//!
//! Non-retryable:
//! - Any other reqwest error (decode, redirect, protocol, builder)
//! - Anything else unexpected during the call

use crate::error::Error;
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::Duration;

/// Translate a reqwest failure.
pub fn classify(err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::connection(format!("Request timed out: {err}"), true)
    } else if err.is_connect() || has_connection_io_error(err) {
        Error::connection(format!("Connection failed: {}", describe(err)), true)
    } else {
        Error::connection(format!("HTTP client error: {}", describe(err)), false)
    }
}

/// The per-call deadline elapsed before the exchange completed.
pub fn deadline_elapsed(timeout: Duration) -> Error {
    Error::connection(format!("Request timed out after {timeout:?}"), true)
}

/// A failure that did not originate from the transport library.
pub fn unexpected(err: impl std::fmt::Display) -> Error {
    Error::connection(format!("Unexpected error during request: {err}"), false)
}

fn has_connection_io_error(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
            )
        {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Flatten the source chain; reqwest's top-level message alone rarely names the cause.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
