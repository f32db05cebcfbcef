//! TMDB id resolution for watchlist entries.
//!
//! Letterboxd film pages embed the TMDB id as an HTML attribute
//! (`data-tmdb-id="<digits>"`). [`TmdbResolver`] checks the on-disk
//! [`TmdbCache`] first and only fetches the page on a miss, writing
//! successful extractions back through to the cache.
//!
//! A page without the attribute is a normal outcome, not an error: `resolve`
//! returns `Ok(None)` and the caller logs and skips the row.

mod cache;

pub use cache::{CacheError, TmdbCache};

use std::sync::LazyLock;

use regex::Regex;
use tokio::time::sleep;
use tracing::{debug, instrument};
use url::Url;

use crate::auth::LetterboxdSession;
use crate::retry::{
    FailureType, RetryDecision, RetryPolicy, classify_status, classify_transport_error,
};

/// Matches the TMDB id attribute on Letterboxd film pages.
#[allow(clippy::expect_used)]
static TMDB_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-tmdb-id="(\d+)""#).expect("static pattern is valid"));

/// Errors raised while resolving a film page URL to a TMDB id.
///
/// Absence of an id on the page is NOT represented here — that is the
/// `Ok(None)` outcome of [`TmdbResolver::resolve`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The watchlist row does not contain a parseable URL.
    #[error("invalid film page URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// Transport failed and retries were exhausted.
    #[error("failed to fetch film page '{url}': {source}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// Final transport failure after retries.
        #[source]
        source: reqwest::Error,
    },

    /// The page responded with a retryable status until retries ran out.
    #[error("film page '{url}' returned HTTP status {status} after {attempts} attempt(s)")]
    Http {
        /// The URL being fetched.
        url: String,
        /// The last status observed.
        status: u16,
        /// How many attempts were made.
        attempts: u32,
    },

    /// Cache write-through failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Resolves film page URLs to TMDB ids, with cache write-through.
#[derive(Debug)]
pub struct TmdbResolver {
    cache: TmdbCache,
    policy: RetryPolicy,
}

impl TmdbResolver {
    /// Creates a resolver around an opened cache and a retry policy.
    #[must_use]
    pub fn new(cache: TmdbCache, policy: RetryPolicy) -> Self {
        Self { cache, policy }
    }

    /// Returns the underlying cache.
    #[must_use]
    pub fn cache(&self) -> &TmdbCache {
        &self.cache
    }

    /// Resolves a film page URL to its TMDB id.
    ///
    /// Cache hits return without any HTTP traffic. On a miss the page is
    /// fetched through the authenticated session (transient failures are
    /// retried per the policy) and scanned for `data-tmdb-id="<digits>"`.
    /// A match is written through to the cache; no match returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for unparseable URLs, exhausted transport
    /// retries, or cache write failures.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn resolve(
        &mut self,
        session: &LetterboxdSession,
        url: &str,
    ) -> Result<Option<String>, ResolveError> {
        if let Some(id) = self.cache.get(url) {
            debug!(url, id, "cache hit");
            return Ok(Some(id.to_string()));
        }

        let body = self.fetch_page(session, url).await?;

        let Some(id) = extract_tmdb_id(&body) else {
            debug!(url, "page has no TMDB id attribute");
            return Ok(None);
        };

        self.cache.put(url, &id)?;
        debug!(url, id, "resolved and cached");
        Ok(Some(id))
    }

    /// Fetches a film page body, retrying transient failures.
    async fn fetch_page(
        &self,
        session: &LetterboxdSession,
        url: &str,
    ) -> Result<String, ResolveError> {
        let parsed: Url = url.parse().map_err(|source| ResolveError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut attempt: u32 = 1;
        loop {
            match session.get(parsed.clone()).await {
                Ok(response) => {
                    let status = response.status();
                    if classify_status(status) == FailureType::Transient {
                        match self.policy.should_retry(FailureType::Transient, attempt) {
                            RetryDecision::Retry { delay, attempt: next } => {
                                debug!(url, status = status.as_u16(), "retrying page fetch");
                                sleep(delay).await;
                                attempt = next;
                                continue;
                            }
                            RetryDecision::DoNotRetry { .. } => {
                                return Err(ResolveError::Http {
                                    url: url.to_string(),
                                    status: status.as_u16(),
                                    attempts: attempt,
                                });
                            }
                        }
                    }

                    // Non-2xx permanent statuses still return a body; a 404
                    // page simply has no id attribute and resolves to None.
                    return response
                        .text()
                        .await
                        .map_err(|source| ResolveError::Transport {
                            url: url.to_string(),
                            source,
                        });
                }
                Err(error) => {
                    let failure = classify_transport_error(&error);
                    match self.policy.should_retry(failure, attempt) {
                        RetryDecision::Retry { delay, attempt: next } => {
                            debug!(url, error = %error, "retrying after transport failure");
                            sleep(delay).await;
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { .. } => {
                            return Err(ResolveError::Transport {
                                url: url.to_string(),
                                source: error,
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Extracts the first TMDB id attribute value from a page body.
#[must_use]
pub fn extract_tmdb_id(body: &str) -> Option<String> {
    TMDB_ID_PATTERN
        .captures(body)
        .map(|captures| captures[1].to_string())
}
