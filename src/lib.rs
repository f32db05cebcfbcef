//! boxdsync core library
//!
//! Synchronizes a Letterboxd watchlist with an Overseerr request list:
//! log in (cookie-cached), export the watchlist as CSV, resolve each film
//! page to its TMDB id, and submit one request per resolved id.
//!
//! # Architecture
//!
//! - [`auth`] - Session lifecycle, cookie capture, cookie persistence
//! - [`config`] - Environment/credential loading with CLI overrides
//! - [`watchlist`] - Authenticated CSV export fetching and parsing
//! - [`resolver`] - URL→TMDB-id resolution with an on-disk cache
//! - [`overseerr`] - Downstream request API client
//! - [`retry`] - Bounded backoff for transient transport failures
//! - [`sync`] - Orchestration and per-row failure accounting

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod overseerr;
pub mod resolver;
pub mod retry;
pub mod sync;
pub mod watchlist;

// Re-export commonly used types
pub use auth::{CookieRecord, CookieStore, LetterboxdSession, LoginError};
pub use config::{Config, ConfigOverrides};
pub use overseerr::{Overseerr, RequestOutcome};
pub use resolver::{TmdbCache, TmdbResolver};
pub use retry::{DEFAULT_MAX_RETRIES, RetryPolicy};
pub use sync::{SyncOptions, SyncStats, run_sync};
pub use watchlist::{WatchlistRow, fetch_watchlist};
