//! Overseerr REST client.
//!
//! A thin wrapper over the `/api/v1` surface: submitting movie requests and
//! paging through the media library. The API key rides on every request as
//! an `X-Api-Key` default header.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

const API_KEY_HEADER: &str = "X-Api-Key";
const PAGE_SIZE: u32 = 20;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Errors raised by the Overseerr client.
#[derive(Debug, thiserror::Error)]
pub enum OverseerrError {
    /// The configured host does not parse as a base URL.
    #[error("invalid Overseerr host '{host}': {source}")]
    InvalidHost {
        /// The offending host string.
        host: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The API key contains bytes that cannot form a header value.
    #[error("Overseerr API key is not a valid header value")]
    InvalidApiKey,

    /// Transport failed (client construction, connect, timeout, body).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A media listing page returned a non-success status.
    #[error("Overseerr media listing returned HTTP status {status}")]
    Http {
        /// Status code returned by the endpoint.
        status: u16,
    },
}

/// Outcome of submitting a single movie request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 201 — the request was created.
    Created,
    /// 409 — a request for this movie already exists.
    AlreadyRequested,
    /// Any other status; logged and counted, never fatal to the batch.
    Failed(u16),
}

#[derive(Debug, Serialize)]
struct MediaRequestBody {
    #[serde(rename = "mediaType")]
    media_type: &'static str,
    #[serde(rename = "mediaId")]
    media_id: u64,
    #[serde(rename = "is4k")]
    is_4k: bool,
}

/// One item from the media listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    /// Overseerr's internal media id.
    pub id: u64,
    /// TMDB id, when known.
    #[serde(rename = "tmdbId")]
    pub tmdb_id: Option<u64>,
    /// Overseerr availability status code.
    #[serde(default)]
    pub status: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    page: u32,
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct MediaPage {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    results: Vec<MediaItem>,
}

/// Client for an Overseerr server.
#[derive(Debug, Clone)]
pub struct Overseerr {
    client: Client,
    base: Url,
}

impl Overseerr {
    /// Creates a client for the given server and API key.
    ///
    /// # Errors
    ///
    /// Returns [`OverseerrError`] when the host does not parse, the API key
    /// is not a valid header value, or the HTTP client cannot be built.
    pub fn new(host: &str, api_key: &str) -> Result<Self, OverseerrError> {
        // Keep any path prefix the server is mounted under; a trailing slash
        // makes Url::join append instead of replacing the last segment.
        let mut normalized = host.trim_end_matches('/').to_string();
        normalized.push('/');
        let root = Url::parse(&normalized).map_err(|source| OverseerrError::InvalidHost {
            host: host.to_string(),
            source,
        })?;
        let base = root
            .join("api/v1/")
            .map_err(|source| OverseerrError::InvalidHost {
                host: host.to_string(),
                source,
            })?;

        let mut key_value =
            HeaderValue::from_str(api_key).map_err(|_| OverseerrError::InvalidApiKey)?;
        key_value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key_value);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .user_agent(concat!("boxdsync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base })
    }

    /// Submits a movie request for a TMDB id.
    ///
    /// 201 is a created request, 409 an existing one; any other status is
    /// reported as [`RequestOutcome::Failed`] and left to the caller to count.
    ///
    /// # Errors
    ///
    /// Returns [`OverseerrError::Transport`] on transport failure; HTTP-level
    /// rejection is an outcome, not an error.
    #[instrument(level = "debug", skip(self))]
    pub async fn request(&self, tmdb_id: u64, is_4k: bool) -> Result<RequestOutcome, OverseerrError> {
        let url = self.endpoint("request")?;
        info!(tmdb_id, "requesting movie");

        let body = MediaRequestBody {
            media_type: "movie",
            media_id: tmdb_id,
            is_4k,
        };

        let response = self.client.post(url).json(&body).send().await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(tmdb_id, "request created");
                Ok(RequestOutcome::Created)
            }
            StatusCode::CONFLICT => {
                warn!(tmdb_id, "request already exists");
                Ok(RequestOutcome::AlreadyRequested)
            }
            status => {
                warn!(tmdb_id, status = status.as_u16(), "request failed");
                Ok(RequestOutcome::Failed(status.as_u16()))
            }
        }
    }

    /// Fetches the complete media listing, following pagination.
    ///
    /// # Errors
    ///
    /// Returns [`OverseerrError`] on transport failure or a non-success page
    /// status.
    #[instrument(level = "debug", skip(self))]
    pub async fn media(&self) -> Result<Vec<MediaItem>, OverseerrError> {
        let url = self.endpoint("media")?;
        let mut all = Vec::new();
        let mut skip: u32 = 0;

        loop {
            let response = self
                .client
                .get(url.clone())
                .query(&[("take", PAGE_SIZE), ("skip", skip)])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(OverseerrError::Http {
                    status: status.as_u16(),
                });
            }

            let page: MediaPage = response.json().await?;
            debug!(
                page = page.page_info.page,
                pages = page.page_info.pages,
                items = page.results.len(),
                "fetched media page"
            );
            all.extend(page.results);

            if page.page_info.page < page.page_info.pages {
                skip += PAGE_SIZE;
            } else {
                break;
            }
        }

        Ok(all)
    }

    fn endpoint(&self, path: &str) -> Result<Url, OverseerrError> {
        self.base.join(path).map_err(|source| OverseerrError::InvalidHost {
            host: self.base.to_string(),
            source,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_mount_prefix() {
        let client = Overseerr::new("https://media.example.net/overseerr", "key").unwrap();
        assert_eq!(
            client.base.as_str(),
            "https://media.example.net/overseerr/api/v1/"
        );
        assert_eq!(
            client.endpoint("request").unwrap().as_str(),
            "https://media.example.net/overseerr/api/v1/request"
        );
    }

    #[test]
    fn test_base_url_tolerates_trailing_slash() {
        let client = Overseerr::new("https://media.example.net/", "key").unwrap();
        assert_eq!(client.base.as_str(), "https://media.example.net/api/v1/");
    }

    #[test]
    fn test_invalid_host_rejected() {
        assert!(matches!(
            Overseerr::new("not a url", "key"),
            Err(OverseerrError::InvalidHost { .. })
        ));
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        assert!(matches!(
            Overseerr::new("https://media.example.net", "bad\nkey"),
            Err(OverseerrError::InvalidApiKey)
        ));
    }

    #[test]
    fn test_request_body_wire_shape() {
        let body = MediaRequestBody {
            media_type: "movie",
            media_id: 693_134,
            is_4k: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mediaType": "movie",
                "mediaId": 693_134,
                "is4k": false,
            })
        );
    }
}
