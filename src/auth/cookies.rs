//! Cookie model and `Set-Cookie` header parsing.
//!
//! Cookies captured from Letterboxd responses are kept as [`CookieRecord`]s so
//! they can be persisted to disk and later re-installed into a
//! `reqwest::cookie::Jar` for a new HTTP client.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::cookie::Jar;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// A single session cookie captured from a `Set-Cookie` response header.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive session data.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieRecord {
    /// The domain the cookie belongs to (leading dot = subdomains match).
    pub domain: String,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive — never log).
    value: String,
}

impl CookieRecord {
    /// Creates a new cookie record.
    #[must_use]
    pub fn new(
        domain: String,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            path,
            secure,
            expires,
            name,
            value,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive — avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true when the cookie carries an expiry in the past.
    ///
    /// Session cookies (`expires == 0`) never report expired.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Current Unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Parses a single `Set-Cookie` response header into a [`CookieRecord`].
///
/// `request_url` supplies the defaults the header may omit: domain falls back
/// to the request host (host-only cookie) and path falls back to `/`.
/// `Max-Age` takes precedence over `Expires`; a non-positive `Max-Age` or a
/// past `Expires` yields a record that reports [`CookieRecord::is_expired`],
/// which callers treat as an eviction marker.
///
/// Returns `None` for headers without a parseable `name=value` pair.
#[must_use]
pub fn parse_set_cookie(header: &str, request_url: &Url) -> Option<CookieRecord> {
    let mut parts = header.split(';');

    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().to_string();

    let mut domain = request_url.host_str()?.to_string();
    let mut path = "/".to_string();
    let mut secure = false;
    let mut expires: u64 = 0;
    let mut max_age: Option<i64> = None;

    for attribute in parts {
        let attribute = attribute.trim();
        let (key, attr_value) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attribute, ""),
        };

        if key.eq_ignore_ascii_case("domain") && !attr_value.is_empty() {
            domain = attr_value.to_string();
        } else if key.eq_ignore_ascii_case("path") && !attr_value.is_empty() {
            path = attr_value.to_string();
        } else if key.eq_ignore_ascii_case("secure") {
            secure = true;
        } else if key.eq_ignore_ascii_case("max-age") {
            max_age = attr_value.parse::<i64>().ok();
        } else if key.eq_ignore_ascii_case("expires") {
            if let Ok(time) = httpdate::parse_http_date(attr_value) {
                expires = time
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                // A pre-epoch Expires is a deletion marker; an expires of 0
                // would read back as a session cookie, so clamp to 1.
                if expires == 0 {
                    expires = 1;
                }
            }
        }
    }

    // Max-Age wins over Expires when both are present (RFC 6265 §4.1.2.2).
    if let Some(seconds) = max_age {
        expires = if seconds <= 0 {
            1
        } else {
            unix_now().saturating_add(seconds.unsigned_abs())
        };
    }

    Some(CookieRecord::new(
        domain,
        path,
        secure,
        expires,
        name.to_string(),
        value,
    ))
}

/// Loads cookie records into a fresh `reqwest::cookie::Jar`.
///
/// Each record is converted to a `Set-Cookie` header string and added to the
/// jar with the appropriate origin URL for domain matching.
///
/// # Returns
///
/// An `Arc<Jar>` suitable for passing to `reqwest::ClientBuilder::cookie_provider()`.
#[must_use]
pub fn load_records_into_jar(records: &[CookieRecord]) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());

    for record in records {
        let set_cookie = build_set_cookie_string(record);
        let origin_url = build_origin_url(record);

        if let Ok(url) = origin_url.parse::<Url>() {
            jar.add_cookie_str(&set_cookie, &url);
            debug!(
                domain = %record.domain,
                name = %record.name,
                "loaded cookie into jar"
            );
        } else {
            warn!(
                domain = %record.domain,
                name = %record.name,
                "skipping cookie with unparseable domain"
            );
        }
    }

    jar
}

/// Builds a `Set-Cookie` header string from a [`CookieRecord`].
fn build_set_cookie_string(record: &CookieRecord) -> String {
    let mut parts = vec![format!("{}={}", record.name, record.value())];

    // A leading dot marks a domain cookie; host-only cookies rely on the
    // origin URL alone (IP hosts reject an explicit Domain attribute).
    if record.domain.starts_with('.') {
        parts.push(format!("Domain={}", record.domain));
    }

    parts.push(format!("Path={}", record.path));

    if record.secure {
        parts.push("Secure".to_string());
    }

    // Expires (0 = session cookie, omit Expires)
    if record.expires > 0 {
        if let Some(expires_str) = unix_to_http_date(record.expires) {
            parts.push(format!("Expires={expires_str}"));
        } else {
            warn!(
                domain = %record.domain,
                name = %record.name,
                expires = record.expires,
                "cookie expiry timestamp overflows SystemTime; treating as session cookie"
            );
        }
    }

    parts.join("; ")
}

/// Builds the origin URL for `Jar::add_cookie_str` from a [`CookieRecord`].
///
/// Uses `https://` for secure cookies and `http://` for non-secure.
/// Strips the leading dot from the domain for the URL.
fn build_origin_url(record: &CookieRecord) -> String {
    let scheme = if record.secure { "https" } else { "http" };
    let domain = record.domain.strip_prefix('.').unwrap_or(&record.domain);
    format!("{scheme}://{domain}{}", record.path)
}

/// Converts a Unix timestamp to an HTTP-date string (RFC 7231).
fn unix_to_http_date(timestamp: u64) -> Option<String> {
    use std::time::Duration;

    let time = UNIX_EPOCH.checked_add(Duration::from_secs(timestamp))?;
    Some(httpdate::fmt_http_date(time))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn origin() -> Url {
        "https://letterboxd.com/".parse().unwrap()
    }

    // ---- Set-Cookie parsing ----

    #[test]
    fn test_parse_set_cookie_name_value_only() {
        let record = parse_set_cookie("letterboxd.signed.in.as=abc123", &origin()).unwrap();
        assert_eq!(record.name, "letterboxd.signed.in.as");
        assert_eq!(record.value(), "abc123");
        assert_eq!(record.domain, "letterboxd.com");
        assert_eq!(record.path, "/");
        assert!(!record.secure);
        assert_eq!(record.expires, 0);
    }

    #[test]
    fn test_parse_set_cookie_full_attributes() {
        let record = parse_set_cookie(
            "token=xyz; Domain=.letterboxd.com; Path=/user; Secure; Expires=Wed, 15 Nov 2023 22:13:20 GMT",
            &origin(),
        )
        .unwrap();
        assert_eq!(record.domain, ".letterboxd.com");
        assert_eq!(record.path, "/user");
        assert!(record.secure);
        assert_eq!(record.expires, 1_700_086_400);
    }

    #[test]
    fn test_parse_set_cookie_max_age_wins_over_expires() {
        let record = parse_set_cookie(
            "t=v; Expires=Wed, 15 Nov 2023 22:13:20 GMT; Max-Age=3600",
            &origin(),
        )
        .unwrap();
        let now = unix_now();
        assert!(
            record.expires >= now + 3599,
            "Max-Age should override Expires"
        );
    }

    #[test]
    fn test_parse_set_cookie_negative_max_age_is_eviction() {
        let record = parse_set_cookie("t=v; Max-Age=0", &origin()).unwrap();
        assert!(record.is_expired(unix_now()));
        let record = parse_set_cookie("t=v; Max-Age=-1", &origin()).unwrap();
        assert!(record.is_expired(unix_now()));
    }

    #[test]
    fn test_parse_set_cookie_attributes_case_insensitive() {
        let record = parse_set_cookie("t=v; dOmAiN=.x.com; SECURE; pAtH=/a", &origin()).unwrap();
        assert_eq!(record.domain, ".x.com");
        assert_eq!(record.path, "/a");
        assert!(record.secure);
    }

    #[test]
    fn test_parse_set_cookie_no_equals_rejected() {
        assert!(parse_set_cookie("garbage-without-pair", &origin()).is_none());
    }

    #[test]
    fn test_parse_set_cookie_empty_name_rejected() {
        assert!(parse_set_cookie("=value", &origin()).is_none());
    }

    #[test]
    fn test_parse_set_cookie_value_may_be_empty() {
        let record = parse_set_cookie("flag=", &origin()).unwrap();
        assert_eq!(record.value(), "");
    }

    #[test]
    fn test_parse_set_cookie_unparseable_expires_ignored() {
        let record = parse_set_cookie("t=v; Expires=not-a-date", &origin()).unwrap();
        assert_eq!(record.expires, 0);
    }

    #[test]
    fn test_is_expired_session_cookie_never_expires() {
        let record = parse_set_cookie("t=v", &origin()).unwrap();
        assert!(!record.is_expired(u64::MAX));
    }

    // ---- Debug redaction ----

    #[test]
    fn test_cookie_record_debug_redacts_value() {
        let record = CookieRecord::new(
            ".letterboxd.com".to_string(),
            "/".to_string(),
            true,
            0,
            "session".to_string(),
            "super_secret_token".to_string(),
        );
        let debug_str = format!("{record:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super_secret_token"));
    }

    // ---- Jar loading ----

    #[test]
    fn test_load_records_into_jar_basic() {
        let records = vec![CookieRecord::new(
            ".example.com".to_string(),
            "/".to_string(),
            false,
            0,
            "session".to_string(),
            "abc123".to_string(),
        )];

        let jar = load_records_into_jar(&records);

        let url = "http://example.com/page".parse::<Url>().unwrap();
        let cookie_header = jar.cookies(&url).expect("jar should match domain");
        assert!(cookie_header.to_str().unwrap().contains("session=abc123"));
    }

    #[test]
    fn test_load_records_into_jar_subdomain_matching() {
        let records = vec![CookieRecord::new(
            ".example.com".to_string(),
            "/".to_string(),
            false,
            0,
            "session".to_string(),
            "abc123".to_string(),
        )];

        let jar = load_records_into_jar(&records);

        let url = "http://sub.example.com/page".parse::<Url>().unwrap();
        assert!(
            jar.cookies(&url).is_some(),
            "domain cookie should match subdomain"
        );
    }

    #[test]
    fn test_load_records_into_jar_no_cross_domain() {
        let records = vec![CookieRecord::new(
            ".example.com".to_string(),
            "/".to_string(),
            false,
            0,
            "session".to_string(),
            "abc123".to_string(),
        )];

        let jar = load_records_into_jar(&records);

        let url = "http://other.com/page".parse::<Url>().unwrap();
        assert!(jar.cookies(&url).is_none());
    }

    #[test]
    fn test_load_records_into_jar_empty_list() {
        let jar = load_records_into_jar(&[]);
        let url = "http://example.com/".parse::<Url>().unwrap();
        assert!(jar.cookies(&url).is_none());
    }

    #[test]
    fn test_build_set_cookie_string_host_only_omits_domain() {
        let record = CookieRecord::new(
            "letterboxd.com".to_string(),
            "/".to_string(),
            false,
            0,
            "name".to_string(),
            "val".to_string(),
        );
        let s = build_set_cookie_string(&record);
        assert!(s.contains("name=val"));
        assert!(!s.contains("Domain="));
        assert!(s.contains("Path=/"));
        assert!(!s.contains("Secure"));
        assert!(!s.contains("Expires"));
    }

    #[test]
    fn test_build_set_cookie_string_with_expiry_and_secure() {
        let record = CookieRecord::new(
            ".letterboxd.com".to_string(),
            "/".to_string(),
            true,
            1_700_000_000,
            "token".to_string(),
            "xyz".to_string(),
        );
        let s = build_set_cookie_string(&record);
        assert!(s.contains("Domain=.letterboxd.com"));
        assert!(s.contains("Secure"));
        assert!(s.contains("Expires="));
    }

    #[test]
    fn test_build_origin_url_strips_leading_dot() {
        let record = CookieRecord::new(
            ".secure.com".to_string(),
            "/api".to_string(),
            true,
            0,
            "n".to_string(),
            "v".to_string(),
        );
        assert_eq!(build_origin_url(&record), "https://secure.com/api");
    }

    // ---- Serde round-trip (fields survive persistence) ----

    #[test]
    fn test_cookie_record_json_round_trip() {
        let record = CookieRecord::new(
            ".letterboxd.com".to_string(),
            "/".to_string(),
            true,
            1_700_000_000,
            "letterboxd.user.CI".to_string(),
            "opaque-token".to_string(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: CookieRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
