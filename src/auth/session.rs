//! Authenticated Letterboxd session lifecycle.
//!
//! [`LetterboxdSession`] owns the HTTP client and its cookie jar. Login tries
//! three paths in priority order — live in-memory cookies, the on-disk cookie
//! snapshot, then credential login with a CSRF token — inside a bounded loop,
//! and persists the resulting cookies so later runs can skip the form POST.
//!
//! Cookies set by responses are mirrored into a [`CookieRecord`] list as they
//! arrive; the jar handles outgoing requests, the records handle persistence.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{REFERER, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::LetterboxdConfig;

use super::store::{CookieStore, StoreError};
use super::{CookieRecord, load_records_into_jar, parse_set_cookie, unix_now};

/// Name of the Letterboxd CSRF cookie read before credential login.
pub const CSRF_COOKIE: &str = "com.xk72.webparts.csrf";

/// Path of the liveness probe used to validate cached cookies.
const LOGGED_IN_PATH: &str = "loggedin";

/// Path of the credential login form endpoint.
const LOGIN_PATH: &str = "user/login.do";

/// Upper bound on login passes (in-memory, cached, credential).
const MAX_LOGIN_ATTEMPTS: usize = 3;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Errors raised while establishing or maintaining the session.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Credential login returned a non-200 status.
    #[error("failed to log in with user credentials: HTTP status {status}")]
    Status {
        /// Status code returned by the login endpoint.
        status: u16,
    },

    /// Credential login returned 200 but the JSON body did not report success.
    #[error("failed to log in with user credentials: result '{result}'")]
    Rejected {
        /// The `result` field from the login response body.
        result: String,
    },

    /// No password is available and no cached session satisfied the probe.
    #[error("no password configured for '{username}' and no usable cached session")]
    MissingPassword {
        /// The account that credential login would have used.
        username: String,
    },

    /// The CSRF cookie never appeared after visiting the host root.
    #[error("CSRF cookie '{name}' not set after visiting host root")]
    MissingCsrfToken {
        /// The cookie name that was expected.
        name: &'static str,
    },

    /// Stale cached cookies were detected but the file could not be removed.
    #[error("failed to clear stale cached cookies at {path}: {source}")]
    StaleCookieCleanup {
        /// Path of the cookie file that resisted deletion.
        path: PathBuf,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// Every login path was tried and none produced an authenticated session.
    #[error("login attempts exhausted after {attempts} passes")]
    AttemptsExhausted {
        /// Number of passes made through the login paths.
        attempts: usize,
    },

    /// Cookie store I/O failed outside the stale-cleanup path.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// HTTP transport failed (client construction, connect, timeout, body).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A login URL could not be built from the configured host.
    #[error("invalid login URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    result: String,
}

/// An authenticated HTTP session against a Letterboxd host.
pub struct LetterboxdSession {
    host: Url,
    username: String,
    password: Option<String>,
    store: CookieStore,
    client: Client,
    captured: Mutex<Vec<CookieRecord>>,
}

impl LetterboxdSession {
    /// Creates a session with an empty cookie jar.
    ///
    /// Credentials are taken from the config; no network traffic happens
    /// until [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &LetterboxdConfig, store: CookieStore) -> Result<Self, LoginError> {
        let client = build_client(Arc::new(Jar::default()))?;
        Ok(Self {
            host: config.host.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            store,
            client,
            captured: Mutex::new(Vec::new()),
        })
    }

    /// Returns the configured host root.
    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// Returns the account username this session authenticates as.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the underlying HTTP client for building custom requests.
    ///
    /// Pair with [`execute`](Self::execute) so response cookies are captured.
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Joins a relative path onto the host root.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] when the path cannot be joined.
    pub fn absolute(&self, path: &str) -> Result<Url, url::ParseError> {
        self.host.join(path)
    }

    /// Sends a request built on [`http`](Self::http), capturing response cookies.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] on transport failure.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        let response = request.send().await?;
        self.capture_from(&response);
        Ok(response)
    }

    /// Issues an authenticated GET request.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] on transport failure.
    pub async fn get(&self, url: Url) -> Result<Response, reqwest::Error> {
        debug!(url = %url, "GET");
        self.execute(self.client.get(url)).await
    }

    /// Establishes an authenticated session.
    ///
    /// Attempts, in order: the in-memory cookie jar, the on-disk cookie
    /// snapshot, then credential login. Each pass that fails a liveness probe
    /// clears the cookies it tried (deleting the snapshot file for the cached
    /// path) and falls through. The loop is bounded; success is implied by
    /// `Ok(())`, failure always raises.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError`] when credential login is rejected, stale cookie
    /// cleanup fails, transport fails, or all passes are exhausted.
    #[instrument(level = "debug", skip(self), fields(username = %self.username))]
    pub async fn login(&mut self) -> Result<(), LoginError> {
        for attempt in 1..=MAX_LOGIN_ATTEMPTS {
            if self.has_cookies() {
                let response = self.get(self.host.clone()).await?;
                if is_host_root(response.url(), &self.host) {
                    debug!("logged in with in-memory session cookies");
                    return Ok(());
                }
                debug!(attempt, "in-memory session cookies rejected; clearing");
                self.reset_cookies(&[])?;
                continue;
            }

            if let Some(records) = self.store.load()? {
                self.reset_cookies(&records)?;
                let probe = self.host.join(LOGGED_IN_PATH)?;
                let response = self.get(probe).await?;
                if is_host_root(response.url(), &self.host) {
                    debug!("logged in with cached cookies");
                    return Ok(());
                }

                debug!(attempt, "cached cookies are stale; deleting snapshot");
                match self.store.clear() {
                    Ok(_) => {}
                    Err(source) => {
                        return Err(LoginError::StaleCookieCleanup {
                            path: self.store.path().to_path_buf(),
                            source,
                        });
                    }
                }
                self.reset_cookies(&[])?;
                continue;
            }

            self.credential_login().await?;
            return Ok(());
        }

        Err(LoginError::AttemptsExhausted {
            attempts: MAX_LOGIN_ATTEMPTS,
        })
    }

    /// Saves the currently captured cookies to the on-disk store.
    ///
    /// Called by the orchestrator at the end of a run; a run that never
    /// captured cookies leaves the previous snapshot untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when writing the snapshot fails.
    pub fn persist(&self) -> Result<(), StoreError> {
        let records = self.snapshot();
        if records.is_empty() {
            return Ok(());
        }
        self.store.save(&records)
    }

    /// Performs the credential login flow: fetch CSRF cookie, POST the form,
    /// require HTTP 200 and `result == "success"`, then persist the cookies.
    async fn credential_login(&self) -> Result<(), LoginError> {
        let Some(password) = self.password.as_deref() else {
            return Err(LoginError::MissingPassword {
                username: self.username.clone(),
            });
        };

        // Visiting the host root sets the CSRF cookie.
        self.get(self.host.clone()).await?;
        let token = self
            .cookie_value(CSRF_COOKIE)
            .ok_or(LoginError::MissingCsrfToken { name: CSRF_COOKIE })?;

        let login_url = self.host.join(LOGIN_PATH)?;
        debug!(url = %login_url, "posting credential login");
        let response = self
            .execute(
                self.client
                    .post(login_url)
                    .header(REFERER, self.host.as_str())
                    .form(&[
                        ("__csrf", token.as_str()),
                        ("username", &self.username),
                        ("password", password),
                    ]),
            )
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(LoginError::Status {
                status: status.as_u16(),
            });
        }

        let body: LoginResponse = response.json().await?;
        if body.result != "success" {
            return Err(LoginError::Rejected {
                result: body.result,
            });
        }

        info!(username = %self.username, "logged in with user credentials");
        self.store.save(&self.snapshot())?;
        Ok(())
    }

    /// Returns the captured value of a cookie by name, if present.
    #[must_use]
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.captured
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|record| record.name == name)
            .map(|record| record.value().to_string())
    }

    /// Returns true when the session holds any in-memory cookies.
    #[must_use]
    pub fn has_cookies(&self) -> bool {
        self.captured
            .lock()
            .map(|records| !records.is_empty())
            .unwrap_or(false)
    }

    /// Replaces the cookie jar (and the captured record list) with the given
    /// records, rebuilding the HTTP client around the fresh jar.
    fn reset_cookies(&mut self, records: &[CookieRecord]) -> Result<(), LoginError> {
        let jar = load_records_into_jar(records);
        self.client = build_client(jar)?;
        if let Ok(mut captured) = self.captured.lock() {
            captured.clear();
            captured.extend_from_slice(records);
        }
        Ok(())
    }

    /// Mirrors `Set-Cookie` headers from a response into the captured list.
    ///
    /// Only the final response of a redirect chain is visible here; cookies
    /// set mid-chain still reach the jar via reqwest's cookie provider.
    fn capture_from(&self, response: &Response) {
        let url = response.url().clone();
        let now = unix_now();

        let Ok(mut captured) = self.captured.lock() else {
            return;
        };

        for header in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else {
                warn!("ignoring Set-Cookie header with non-ASCII content");
                continue;
            };
            let Some(record) = parse_set_cookie(raw, &url) else {
                warn!("ignoring unparseable Set-Cookie header");
                continue;
            };

            captured.retain(|existing| {
                existing.name != record.name
                    || existing.domain != record.domain
                    || existing.path != record.path
            });

            if record.is_expired(now) {
                debug!(name = %record.name, "response evicted cookie");
            } else {
                debug!(name = %record.name, domain = %record.domain, "captured cookie");
                captured.push(record);
            }
        }
    }

    fn snapshot(&self) -> Vec<CookieRecord> {
        self.captured
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

/// Builds the session HTTP client around the given cookie jar.
fn build_client(jar: Arc<Jar>) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .user_agent(concat!("boxdsync/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .cookie_provider(jar)
        .build()
}

/// Liveness check: was the final response URL the host root?
///
/// A redirect away from the root (to a sign-in page) marks the cookies as
/// invalid. Comparison goes through parsed URL components so trailing-slash
/// normalization and default ports cannot misclassify a live session.
fn is_host_root(response_url: &Url, host: &Url) -> bool {
    response_url.scheme() == host.scheme()
        && response_url.host_str() == host.host_str()
        && response_url.port_or_known_default() == host.port_or_known_default()
        && response_url.path() == host.path()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_host_root_exact_match() {
        assert!(is_host_root(
            &url("https://letterboxd.com/"),
            &url("https://letterboxd.com")
        ));
    }

    #[test]
    fn test_is_host_root_redirected_path_rejected() {
        assert!(!is_host_root(
            &url("https://letterboxd.com/sign-in/"),
            &url("https://letterboxd.com")
        ));
    }

    #[test]
    fn test_is_host_root_ignores_default_port() {
        assert!(is_host_root(
            &url("https://letterboxd.com:443/"),
            &url("https://letterboxd.com/")
        ));
    }

    #[test]
    fn test_is_host_root_different_host_rejected() {
        assert!(!is_host_root(
            &url("https://example.com/"),
            &url("https://letterboxd.com/")
        ));
    }

    #[test]
    fn test_is_host_root_scheme_mismatch_rejected() {
        assert!(!is_host_root(
            &url("http://letterboxd.com/"),
            &url("https://letterboxd.com/")
        ));
    }

    #[test]
    fn test_new_session_has_no_cookies() {
        let config = LetterboxdConfig {
            host: url("https://letterboxd.com"),
            username: "fdrabsch".to_string(),
            password: None,
        };
        let store = CookieStore::new(std::env::temp_dir().join("boxdsync-test-unused.json"));
        let session = LetterboxdSession::new(&config, store).unwrap();
        assert!(!session.has_cookies());
        assert!(session.cookie_value(CSRF_COOKIE).is_none());
    }
}
