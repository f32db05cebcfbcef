//! Sync orchestration: resolve watchlist rows, submit requests downstream.
//!
//! Resolution and submission failures are per-row: they are logged, counted
//! in [`SyncStats`], and never abort the batch. Only login failure (handled
//! before this module runs) is fatal to a sync.

use tracing::{error, info, instrument, warn};

use crate::auth::LetterboxdSession;
use crate::overseerr::{Overseerr, RequestOutcome};
use crate::resolver::TmdbResolver;
use crate::watchlist::WatchlistRow;

/// Options controlling a sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Resolve ids but submit nothing downstream.
    pub dry_run: bool,
    /// Submit requests as 4K.
    pub is_4k: bool,
}

/// Counters reported at the end of a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Rows that resolved to a TMDB id.
    pub resolved: usize,
    /// Rows with no id on the page or a failed fetch.
    pub unresolved: usize,
    /// Requests Overseerr created.
    pub created: usize,
    /// Requests Overseerr already had.
    pub duplicate: usize,
    /// Requests Overseerr rejected with another status.
    pub failed: usize,
}

/// Resolves every watchlist row and submits the resulting ids to Overseerr.
///
/// Rows are processed sequentially in input order. A row that fails to
/// resolve — no id attribute on the page, or a fetch error after retries —
/// is logged and skipped. In dry-run mode ids are resolved and reported but
/// nothing is submitted.
#[instrument(level = "debug", skip_all, fields(rows = rows.len()))]
pub async fn run_sync(
    session: &LetterboxdSession,
    resolver: &mut TmdbResolver,
    overseerr: &Overseerr,
    rows: &[WatchlistRow],
    options: SyncOptions,
) -> SyncStats {
    let mut stats = SyncStats::default();
    let mut ids: Vec<u64> = Vec::with_capacity(rows.len());

    for row in rows {
        match resolver.resolve(session, &row.uri).await {
            Ok(Some(id)) => match id.parse::<u64>() {
                Ok(id) => {
                    stats.resolved += 1;
                    ids.push(id);
                }
                Err(_) => {
                    error!(uri = %row.uri, id, "extracted TMDB id is not numeric");
                    stats.unresolved += 1;
                }
            },
            Ok(None) => {
                error!(uri = %row.uri, name = %row.name, "failed to get TMDB id");
                stats.unresolved += 1;
            }
            Err(err) => {
                error!(uri = %row.uri, error = %err, "failed to resolve watchlist row");
                stats.unresolved += 1;
            }
        }
    }

    for id in ids {
        if options.dry_run {
            info!(tmdb_id = id, "dry run; skipping request submission");
            continue;
        }

        match overseerr.request(id, options.is_4k).await {
            Ok(RequestOutcome::Created) => stats.created += 1,
            Ok(RequestOutcome::AlreadyRequested) => stats.duplicate += 1,
            Ok(RequestOutcome::Failed(status)) => {
                warn!(tmdb_id = id, status, "downstream request rejected");
                stats.failed += 1;
            }
            Err(err) => {
                error!(tmdb_id = id, error = %err, "downstream request failed");
                stats.failed += 1;
            }
        }
    }

    stats
}
