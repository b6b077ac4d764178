//! Where the auth token and API location come from.
//!
//! Resolution order for `Config::from_env`:
//! 1. `PINBOARD_API_TOKEN` (a `.env` file in the working directory is loaded first)
//! 2. `api_token` in the `[authentication]` section of `~/.pinboardrc`
//!
//! `PINBOARD_API_URL` and `PINBOARD_TIMEOUT_SECS` are optional overrides.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::client::DEFAULT_BASE_URL;

pub const TOKEN_VAR: &str = "PINBOARD_API_TOKEN";
pub const BASE_URL_VAR: &str = "PINBOARD_API_URL";
pub const TIMEOUT_VAR: &str = "PINBOARD_TIMEOUT_SECS";
pub const RC_FILE: &str = ".pinboardrc";

const RC_SECTION: &str = "authentication";
const RC_KEY: &str = "api_token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API token: set PINBOARD_API_TOKEN or add api_token to ~/.pinboardrc")]
    MissingToken,

    #[error("invalid PINBOARD_TIMEOUT_SECS value {0:?}")]
    InvalidTimeout(String),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub token: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::resolve(|name| env::var(name).ok(), dirs::home_dir())
    }

    /// Resolve from a variable lookup, falling back to the rc file under `home`.
    fn resolve(
        var: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let token = match var(TOKEN_VAR) {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => {
                let rc = home
                    .map(|home| home.join(RC_FILE))
                    .ok_or(ConfigError::MissingToken)?;
                debug!(path = %rc.display(), "token variable not set, reading rc file");
                Self::from_rc_file(&rc)?.token
            }
        };

        let mut config = Self::new(token);
        if let Some(url) = var(BASE_URL_VAR) {
            config.base_url = url;
        }
        if let Some(secs) = var(TIMEOUT_VAR) {
            config.timeout = Some(parse_timeout(&secs)?);
        }
        Ok(config)
    }

    pub fn from_rc_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_rc_str(&contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ConfigError::MissingToken)
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse the INI-style rc format:
    ///
    /// ```text
    /// [authentication]
    /// api_token = user:0123456789ABCDEF
    /// ```
    pub fn from_rc_str(contents: &str) -> Result<Self, ConfigError> {
        let mut section = "";
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim();
                continue;
            }
            if section != RC_SECTION {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                continue;
            };
            if key.trim() == RC_KEY && !value.trim().is_empty() {
                return Ok(Self::new(value.trim()));
            }
        }
        Err(ConfigError::MissingToken)
    }
}

fn parse_timeout(secs: &str) -> Result<Duration, ConfigError> {
    secs.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidTimeout(secs.to_string()))
}
