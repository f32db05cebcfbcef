//! Watchlist export fetching and CSV parsing.
//!
//! Letterboxd exposes an authenticated CSV export of a user's watchlist. Each
//! row carries the canonical film page URL in the `Letterboxd URI` column;
//! name and year ride along for logging.

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::auth::LetterboxdSession;

/// Accept header sent with the export request.
const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

/// Errors raised while fetching or parsing the watchlist export.
#[derive(Debug, thiserror::Error)]
pub enum WatchlistError {
    /// The export URL could not be built from the host and username.
    #[error("invalid watchlist export URL: {0}")]
    Url(#[from] url::ParseError),

    /// The export request failed at the transport level.
    #[error("watchlist export request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The export endpoint returned a non-success status.
    #[error("watchlist export returned HTTP status {status}")]
    Http {
        /// Status code returned by the export endpoint.
        status: u16,
    },

    /// The response body is not the expected CSV shape.
    #[error("watchlist export is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One watchlist entry from the CSV export.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistRow {
    /// Canonical film page URL; the only load-bearing column.
    #[serde(rename = "Letterboxd URI")]
    pub uri: String,

    /// Film title, used for logging only.
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Release year, when the export provides one.
    #[serde(rename = "Year", default)]
    pub year: Option<u16>,
}

/// Fetches the watchlist export for a user and parses it into rows.
///
/// The caller must have logged the session in first. An N-row CSV yields
/// exactly N rows in input order.
///
/// # Errors
///
/// Returns [`WatchlistError`] on transport failure, a non-success status, or
/// a response body that does not parse as CSV with the expected columns.
#[instrument(level = "debug", skip(session))]
pub async fn fetch_watchlist(
    session: &LetterboxdSession,
    username: &str,
) -> Result<Vec<WatchlistRow>, WatchlistError> {
    let url = session.absolute(&format!("{username}/watchlist/export/"))?;
    info!(username, "fetching watchlist export");

    let response = session
        .execute(
            session
                .http()
                .get(url)
                .header(CONTENT_TYPE, HeaderValue::from_static(CSV_CONTENT_TYPE)),
        )
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(WatchlistError::Http {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    parse_watchlist_csv(&body)
}

/// Parses a watchlist export body into rows, preserving input order.
///
/// # Errors
///
/// Returns [`WatchlistError::Csv`] when a row is malformed or the
/// `Letterboxd URI` column is missing.
pub fn parse_watchlist_csv(body: &str) -> Result<Vec<WatchlistRow>, WatchlistError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut rows = Vec::new();

    for result in reader.deserialize() {
        let row: WatchlistRow = result?;
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_row_count_and_order() {
        let body = "\
Date,Name,Year,Letterboxd URI
2024-01-01,Dune: Part Two,2024,https://letterboxd.com/film/dune-part-two/
2024-01-02,The Matrix,1999,https://letterboxd.com/film/the-matrix/
2024-01-03,Stalker,1979,https://letterboxd.com/film/stalker/
";
        let rows = parse_watchlist_csv(body).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].uri, "https://letterboxd.com/film/dune-part-two/");
        assert_eq!(rows[1].uri, "https://letterboxd.com/film/the-matrix/");
        assert_eq!(rows[2].uri, "https://letterboxd.com/film/stalker/");
        assert_eq!(rows[0].name, "Dune: Part Two");
        assert_eq!(rows[2].year, Some(1979));
    }

    #[test]
    fn test_parse_uri_column_alone_is_enough() {
        let body = "Letterboxd URI\nhttps://letterboxd.com/film/dune-part-two/\n";
        let rows = parse_watchlist_csv(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uri, "https://letterboxd.com/film/dune-part-two/");
        assert!(rows[0].name.is_empty());
        assert!(rows[0].year.is_none());
    }

    #[test]
    fn test_parse_extra_columns_ignored() {
        let body = "\
Date,Name,Year,Letterboxd URI,Tags
2024-01-01,Dune,2021,https://letterboxd.com/film/dune-2021/,sci-fi
";
        let rows = parse_watchlist_csv(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uri, "https://letterboxd.com/film/dune-2021/");
    }

    #[test]
    fn test_parse_missing_uri_column_is_an_error() {
        let body = "Date,Name\n2024-01-01,Dune\n";
        assert!(matches!(
            parse_watchlist_csv(body),
            Err(WatchlistError::Csv(_))
        ));
    }

    #[test]
    fn test_parse_header_only_yields_no_rows() {
        let body = "Date,Name,Year,Letterboxd URI\n";
        let rows = parse_watchlist_csv(body).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_empty_year_field_is_none() {
        let body = "Name,Year,Letterboxd URI\nDune,,https://letterboxd.com/film/dune-2021/\n";
        let rows = parse_watchlist_csv(body).unwrap();
        assert!(rows[0].year.is_none());
    }
}
