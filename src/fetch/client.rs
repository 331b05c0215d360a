//! HTTP client wrapper for one-shot robots.txt fetches.
//!
//! [`HttpFetcher`] issues a single GET per attempt with independent connect,
//! response-header, and total-request deadlines, no connection reuse, and no
//! transport compression. Redirects are followed by hand so the hop count is
//! exact for each request and the cap can be enforced per attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONNECTION, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode, redirect};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use super::classify::classify_reqwest_error;
use super::constants::{
    CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS, REQUEST_TIMEOUT, RESPONSE_HEADER_TIMEOUT,
};
use super::types::{FailureKind, FetchOutcome, HttpResponse, is_robots_response, robots_url};
use crate::user_agent;

/// Errors building the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// reqwest rejected the client configuration.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Performs one fetch attempt for a domain.
///
/// Implementations never fail: every problem is folded into the returned
/// [`FetchOutcome`] for the fetch policy to classify.
#[async_trait]
pub trait RobotsFetcher: Send + Sync {
    /// Fetches `http://<domain>/robots.txt` once.
    async fn fetch(&self, domain: &str) -> FetchOutcome;
}

/// Timeout and redirect settings for [`HttpFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherSettings {
    /// TCP connect deadline.
    pub connect_timeout: Duration,
    /// Deadline for the whole request, per hop.
    pub request_timeout: Duration,
    /// Deadline for receiving response headers, per hop.
    pub response_header_timeout: Duration,
    /// Redirect hops allowed before the attempt fails.
    pub max_redirects: u32,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            response_header_timeout: RESPONSE_HEADER_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// reqwest-backed [`RobotsFetcher`].
///
/// Cheap to clone; clones share the underlying client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    settings: FetcherSettings,
}

impl HttpFetcher {
    /// Creates a fetcher with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] if reqwest cannot build the client
    /// (for example when the TLS backend fails to initialise).
    pub fn new(settings: FetcherSettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            // One-shot requests: nothing to gain from keep-alive.
            .pool_max_idle_per_host(0)
            // Short compressed bodies have a history of stalling connections.
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .redirect(redirect::Policy::none())
            .user_agent(user_agent::default_user_agent())
            .build()?;

        debug!(?settings, "created robots.txt fetcher");
        Ok(Self { client, settings })
    }

    /// Returns the settings this fetcher was built with.
    #[must_use]
    pub fn settings(&self) -> &FetcherSettings {
        &self.settings
    }

    /// Sends one GET, bounding the wait for response headers.
    async fn send(&self, url: &str) -> Result<reqwest::Response, FailureKind> {
        let request = self.client.get(url).header(CONNECTION, "close");
        match tokio::time::timeout(self.settings.response_header_timeout, request.send()).await {
            Err(_) => Err(FailureKind::Timeout),
            Ok(Err(error)) => {
                debug!(url, error = %error, "request failed");
                Err(classify_reqwest_error(&error))
            }
            Ok(Ok(response)) => Ok(response),
        }
    }
}

#[async_trait]
impl RobotsFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url))]
    async fn fetch(&self, domain: &str) -> FetchOutcome {
        let start_url = robots_url(domain);
        tracing::Span::current().record("url", start_url.as_str());

        let mut current = match Url::parse(&start_url) {
            Ok(url) => url,
            Err(error) => {
                debug!(error = %error, "domain does not form a valid URL");
                return FetchOutcome::Transport(FailureKind::Other);
            }
        };
        let mut redirects = 0u32;

        loop {
            let response = match self.send(current.as_str()).await {
                Ok(response) => response,
                Err(kind) => {
                    debug!(kind = kind.as_str(), hop = redirects, "attempt failed");
                    return FetchOutcome::Transport(kind);
                }
            };

            if let Some(next) = redirect_target(&response, &current) {
                if redirects >= self.settings.max_redirects {
                    debug!(redirects, last_url = %current, "redirect cap reached");
                    return FetchOutcome::Transport(FailureKind::Other);
                }
                redirects += 1;
                debug!(hop = redirects, to = %next, "following redirect");
                current = next;
                continue;
            }

            return read_final_response(response, current, redirects).await;
        }
    }
}

/// Resolves the next hop for a redirect response, if this is one.
fn redirect_target(response: &reqwest::Response, current: &Url) -> Option<Url> {
    if !matches!(
        response.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    ) {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

async fn read_final_response(
    response: reqwest::Response,
    final_url: Url,
    redirect_count: u32,
) -> FetchOutcome {
    let status = response.status().as_u16();
    let content_types: Vec<String> = response
        .headers()
        .get_all(CONTENT_TYPE)
        .iter()
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect();

    // Bodies of rejected responses are never stored, so skip reading them.
    let body = if is_robots_response(status, &content_types) {
        match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(error) => {
                debug!(error = %error, "failed reading robots.txt body");
                return FetchOutcome::Transport(FailureKind::Temporary);
            }
        }
    } else {
        Vec::new()
    };

    FetchOutcome::Response(HttpResponse {
        status,
        content_types,
        final_url: final_url.to_string(),
        redirect_count,
        body,
    })
}
