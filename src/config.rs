//! Runtime configuration from environment variables and CLI overrides.
//!
//! Credentials and hosts come from the environment (`LBXD_*`, `OVERSEERR_*`);
//! the CLI may override the data directory and username. The data directory
//! defaults to `~/.config/boxdsync` (or `$XDG_CONFIG_HOME/boxdsync`) and holds
//! the cookie snapshot and the URL→TMDB-id cache.

use std::env;
use std::path::{Path, PathBuf};

use url::Url;

const ENV_LBXD_HOST: &str = "LBXD_HOST";
const ENV_LBXD_USERNAME: &str = "LBXD_USERNAME";
const ENV_LBXD_PASSWORD: &str = "LBXD_PASSWORD";
const ENV_OVERSEERR_HOST: &str = "OVERSEERR_HOST";
const ENV_OVERSEERR_API_KEY: &str = "OVERSEERR_API_KEY";
const ENV_DATA_DIR: &str = "BOXDSYNC_DATA_DIR";

const DEFAULT_HOST: &str = "https://letterboxd.com";
const COOKIE_FILE_NAME: &str = "letterboxd_cookies.json";
const CACHE_FILE_NAME: &str = "boxdurltotmdb.json";

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("required environment variable {name} is not set")]
    MissingVar {
        /// The variable that must be provided.
        name: &'static str,
    },

    /// The Letterboxd host is not a valid URL.
    #[error("invalid {name} value '{value}': {source}")]
    InvalidHost {
        /// The variable carrying the bad value.
        name: &'static str,
        /// The offending value.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// No suitable user config directory is available.
    #[error("unable to determine data directory (set BOXDSYNC_DATA_DIR, XDG_CONFIG_HOME or HOME)")]
    DataDirUnavailable,
}

/// Letterboxd host and account credentials.
#[derive(Debug, Clone)]
pub struct LetterboxdConfig {
    /// Host root, e.g. `https://letterboxd.com`.
    pub host: Url,
    /// Account whose watchlist is synced.
    pub username: String,
    /// Account password; may be absent when cached cookies are expected to
    /// satisfy login.
    pub password: Option<String>,
}

/// Overseerr host and API key.
#[derive(Debug, Clone)]
pub struct OverseerrConfig {
    /// Overseerr server base, e.g. `https://overseerr.example.net`.
    pub host: String,
    /// API key sent as `X-Api-Key` on every request.
    pub api_key: String,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Letterboxd side of the sync.
    pub letterboxd: LetterboxdConfig,
    /// Overseerr side of the sync.
    pub overseerr: OverseerrConfig,
    /// Directory holding the cookie snapshot and the id cache.
    pub data_dir: PathBuf,
}

/// CLI-provided overrides applied on top of the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Overrides `BOXDSYNC_DATA_DIR` and the default data directory.
    pub data_dir: Option<PathBuf>,
    /// Overrides `LBXD_USERNAME`.
    pub username: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing required variables, an unparseable
    /// host, or an undeterminable data directory.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests inject a closure over a map instead
    /// of mutating process-global environment state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Config::from_env`].
    pub fn from_lookup(
        overrides: &ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let host_value = non_empty(lookup(ENV_LBXD_HOST)).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = Url::parse(&host_value).map_err(|source| ConfigError::InvalidHost {
            name: ENV_LBXD_HOST,
            value: host_value,
            source,
        })?;

        let username = overrides
            .username
            .clone()
            .or_else(|| non_empty(lookup(ENV_LBXD_USERNAME)))
            .ok_or(ConfigError::MissingVar {
                name: ENV_LBXD_USERNAME,
            })?;

        let password = non_empty(lookup(ENV_LBXD_PASSWORD));

        let overseerr_host = non_empty(lookup(ENV_OVERSEERR_HOST)).ok_or(ConfigError::MissingVar {
            name: ENV_OVERSEERR_HOST,
        })?;
        let api_key = non_empty(lookup(ENV_OVERSEERR_API_KEY)).ok_or(ConfigError::MissingVar {
            name: ENV_OVERSEERR_API_KEY,
        })?;

        let data_dir = match &overrides.data_dir {
            Some(dir) => dir.clone(),
            None => match non_empty(lookup(ENV_DATA_DIR)) {
                Some(dir) => PathBuf::from(dir),
                None => default_data_dir(&lookup)?,
            },
        };

        Ok(Self {
            letterboxd: LetterboxdConfig {
                host,
                username,
                password,
            },
            overseerr: OverseerrConfig {
                host: overseerr_host,
                api_key,
            },
            data_dir,
        })
    }

    /// Path of the persisted cookie snapshot.
    #[must_use]
    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir.join(COOKIE_FILE_NAME)
    }

    /// Path of the URL→TMDB-id cache.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join(CACHE_FILE_NAME)
    }
}

/// Default data directory: `$XDG_CONFIG_HOME/boxdsync` or `~/.config/boxdsync`.
fn default_data_dir(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(xdg) = non_empty(lookup("XDG_CONFIG_HOME")) {
        return Ok(Path::new(&xdg).join("boxdsync"));
    }
    if let Some(home) = non_empty(lookup("HOME")) {
        return Ok(Path::new(&home).join(".config").join("boxdsync"));
    }
    Err(ConfigError::DataDirUnavailable)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
