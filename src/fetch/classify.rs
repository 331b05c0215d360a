//! Maps reqwest transport errors to [`FailureKind`].
//!
//! reqwest does not expose DNS failures as a typed error, so the source chain
//! is inspected: typed `std::io::Error` kinds first, then the resolver's
//! message text.
//!
//! | Error | Kind |
//! |-------|------|
//! | deadline elapsed | Timeout |
//! | "dns error" / lookup failure in chain | Dns |
//! | io reset / aborted / broken pipe / unexpected EOF | Temporary |
//! | body read interrupted | Temporary |
//! | io timed out | Timeout |
//! | refused, bad URL, TLS, anything else | Other |

use std::error::Error as StdError;
use std::io;

use super::types::FailureKind;

/// Message fragments resolvers put in lookup failures.
const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
    "temporary failure in name resolution",
];

/// Classifies a failed `send()` or body read.
pub(crate) fn classify_reqwest_error(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() {
        return FailureKind::Timeout;
    }

    match classify_error_chain(error) {
        FailureKind::Other if error.is_body() || error.is_decode() => FailureKind::Temporary,
        kind => kind,
    }
}

/// Walks an error and its sources looking for a recognisable cause.
pub(crate) fn classify_error_chain(error: &(dyn StdError + 'static)) -> FailureKind {
    let mut current = Some(error);
    while let Some(err) = current {
        if is_dns_message(&err.to_string()) {
            return FailureKind::Dns;
        }
        if let Some(io_error) = err.downcast_ref::<io::Error>()
            && let Some(kind) = classify_io_kind(io_error.kind())
        {
            return kind;
        }
        current = err.source();
    }
    FailureKind::Other
}

fn classify_io_kind(kind: io::ErrorKind) -> Option<FailureKind> {
    match kind {
        io::ErrorKind::TimedOut => Some(FailureKind::Timeout),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::Interrupted
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::WouldBlock => Some(FailureKind::Temporary),
        io::ErrorKind::ConnectionRefused => Some(FailureKind::Other),
        _ => None,
    }
}

fn is_dns_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    DNS_MARKERS.iter().any(|marker| lower.contains(marker))
}
