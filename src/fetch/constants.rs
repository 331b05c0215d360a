//! Constants for the fetch stage (timeouts, retry budget, redirect cap).

use std::time::Duration;

/// Default TCP connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(7);

/// Default total-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(9);

/// Default deadline for receiving response headers.
pub const RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(11);

/// Default retry budget for timeouts and temporary network errors.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default redirect cap. Following more hops than this is a failure.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// Default base delay before a same-domain retry is re-queued.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any single backoff delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(32);
