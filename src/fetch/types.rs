//! Request, outcome, and result types that flow through the fetch stage.

use chrono::{DateTime, Utc};

/// Prefix marking a domain that already went through the DNS fallback.
pub const WWW_PREFIX: &str = "www.";

/// A pending robots.txt fetch for one domain.
///
/// `attempt` counts transient-fault retries only; the DNS fallback
/// rewrites `domain` and leaves `attempt` untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Bare domain name, no scheme or path.
    pub domain: String,
    /// Zero for the first try of a lineage.
    pub attempt: u32,
}

impl FetchRequest {
    /// Creates the first request of a lineage.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            attempt: 0,
        }
    }

    /// Returns the URL this request fetches.
    #[must_use]
    pub fn robots_url(&self) -> String {
        robots_url(&self.domain)
    }

    /// Same domain, one more attempt.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            attempt: self.attempt + 1,
        }
    }

    /// `www.`-prefixed domain, attempt unchanged.
    ///
    /// Returns `None` when the domain already carries the prefix.
    #[must_use]
    pub fn with_www_fallback(&self) -> Option<Self> {
        if has_www_prefix(&self.domain) {
            return None;
        }
        Some(Self {
            domain: format!("{WWW_PREFIX}{}", self.domain),
            attempt: self.attempt,
        })
    }
}

/// Builds `http://<domain>/robots.txt`.
#[must_use]
pub fn robots_url(domain: &str) -> String {
    format!("http://{domain}/robots.txt")
}

fn has_www_prefix(domain: &str) -> bool {
    domain
        .get(..WWW_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(WWW_PREFIX))
}

/// Transport-level failure classes the fetch policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The host name did not resolve.
    Dns,
    /// Connect, header, or total-request deadline elapsed.
    Timeout,
    /// Connection reset/aborted or an interrupted body read.
    Temporary,
    /// Anything else: refused connection, malformed URL, TLS failure.
    Other,
}

impl FailureKind {
    /// Stable label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Timeout => "timeout",
            Self::Temporary => "temporary",
            Self::Other => "other",
        }
    }
}

/// A response that made it back to the client after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code of the last response in the redirect chain.
    pub status: u16,
    /// Every `Content-Type` header value, in order.
    pub content_types: Vec<String>,
    /// URL of the last response in the redirect chain.
    pub final_url: String,
    /// Redirect hops followed to get here.
    pub redirect_count: u32,
    /// Body bytes. Only read when the response classifies as robots.txt.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether this response counts as a usable robots.txt.
    #[must_use]
    pub fn is_robots(&self) -> bool {
        is_robots_response(self.status, &self.content_types)
    }
}

/// Success iff status is in `200..=206` and every declared content type is
/// `text/plain`. No content-type header at all is not a violation.
#[must_use]
pub fn is_robots_response(status: u16, content_types: &[String]) -> bool {
    (200..=206).contains(&status)
        && content_types
            .iter()
            .all(|value| value.starts_with("text/plain"))
}

/// What one HTTP attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The request never produced a usable response. Overrunning the
    /// redirect cap lands here as [`FailureKind::Other`].
    Transport(FailureKind),
    /// A final, non-redirect response.
    Response(HttpResponse),
}

/// Terminal record of one lineage, written as one row to the sink.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FetchResult {
    /// Domain of the attempt that ended the lineage (may carry `www.`).
    pub domain: String,
    /// Empty when no response was ever received.
    pub final_url: String,
    /// Whether a usable robots.txt was found.
    pub success: bool,
    /// When the terminal attempt completed.
    pub fetched_at: DateTime<Utc>,
    /// robots.txt bytes; always empty unless `success`.
    #[serde(skip)]
    pub body: Vec<u8>,
    /// Redirect hops followed by the terminal attempt.
    pub redirect_count: u32,
}

impl FetchResult {
    /// The domain could not be reached at all.
    pub fn unreachable(domain: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            final_url: String::new(),
            success: false,
            fetched_at,
            body: Vec::new(),
            redirect_count: 0,
        }
    }

    /// The domain answered but did not serve a usable robots.txt.
    pub fn rejected(
        domain: impl Into<String>,
        final_url: impl Into<String>,
        redirect_count: u32,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: domain.into(),
            final_url: final_url.into(),
            success: false,
            fetched_at,
            body: Vec::new(),
            redirect_count,
        }
    }

    /// A robots.txt was served.
    pub fn found(
        domain: impl Into<String>,
        final_url: impl Into<String>,
        body: Vec<u8>,
        redirect_count: u32,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: domain.into(),
            final_url: final_url.into(),
            success: true,
            fetched_at,
            body,
            redirect_count,
        }
    }

    /// True when no response was ever received (empty final URL).
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.final_url.is_empty()
    }
}
