//! CLI entry point for the boxdsync tool.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use boxdsync::{
    Config, ConfigOverrides, CookieStore, LetterboxdSession, Overseerr, RetryPolicy, SyncOptions,
    TmdbCache, TmdbResolver, fetch_watchlist, run_sync,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let overrides = ConfigOverrides {
        data_dir: args.data_dir.clone(),
        username: args.username.clone(),
    };
    let config = Config::from_env(&overrides)?;
    debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    // Session login: a LoginError aborts here, before anything is submitted
    // downstream.
    let store = CookieStore::new(config.cookie_path());
    let mut session = LetterboxdSession::new(&config.letterboxd, store)?;
    session.login().await?;

    let rows = fetch_watchlist(&session, &config.letterboxd.username).await?;
    info!(rows = rows.len(), "watchlist fetched");

    let cache = TmdbCache::open(config.cache_path())?;
    let policy = RetryPolicy::with_max_attempts(u32::from(args.max_retries));
    let mut resolver = TmdbResolver::new(cache, policy);

    let overseerr = Overseerr::new(&config.overseerr.host, &config.overseerr.api_key)?;

    let options = SyncOptions {
        dry_run: args.dry_run,
        is_4k: args.four_k,
    };
    let stats = run_sync(&session, &mut resolver, &overseerr, &rows, options).await;

    // Refresh the cookie snapshot before exiting so the next run can skip
    // credential login.
    session.persist()?;

    info!(
        resolved = stats.resolved,
        unresolved = stats.unresolved,
        created = stats.created,
        duplicate = stats.duplicate,
        failed = stats.failed,
        "sync complete"
    );

    Ok(())
}
