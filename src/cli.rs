//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use boxdsync::DEFAULT_MAX_RETRIES;

/// Sync a Letterboxd watchlist with an Overseerr request list.
///
/// Credentials come from the environment: LBXD_USERNAME, LBXD_PASSWORD,
/// OVERSEERR_HOST, OVERSEERR_API_KEY (LBXD_HOST and BOXDSYNC_DATA_DIR are
/// optional).
#[derive(Parser, Debug)]
#[command(name = "boxdsync")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Resolve TMDB ids but submit nothing to Overseerr
    #[arg(long)]
    pub dry_run: bool,

    /// Submit requests as 4K
    #[arg(long = "4k")]
    pub four_k: bool,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Directory for the cookie snapshot and id cache (default: ~/.config/boxdsync)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Letterboxd username (overrides LBXD_USERNAME)
    #[arg(short, long)]
    pub username: Option<String>,
}
