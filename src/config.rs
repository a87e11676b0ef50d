//! Runtime configuration resolved from the environment
//!
//! Secrets are read from environment variables only, never from files or
//! command-line flags.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/api/token";
pub const MUSICBRAINZ_API_URL: &str = "https://musicbrainz.org/ws/2";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "trackmatch/",
    env!("CARGO_PKG_VERSION"),
    " ( https://github.com/trackmatch/trackmatch )"
);
const DEFAULT_DATA_DIR: &str = ".cache";
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MUSICBRAINZ_MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub spotify_credentials: Option<SpotifyCredentials>,
    pub spotify_api_url: String,
    pub spotify_auth_url: String,
    pub musicbrainz_api_url: String,
    /// Identifying header sent with every MusicBrainz request
    pub user_agent: String,
    pub musicbrainz_min_interval: Duration,
    pub request_timeout: Duration,
    pub debounce: Duration,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spotify_credentials: None,
            spotify_api_url: SPOTIFY_API_URL.to_string(),
            spotify_auth_url: SPOTIFY_AUTH_URL.to_string(),
            musicbrainz_api_url: MUSICBRAINZ_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            musicbrainz_min_interval: MUSICBRAINZ_MIN_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let (Some(client_id), Some(client_secret)) =
            (env_var("SPOTIFY_CLIENT_ID"), env_var("SPOTIFY_CLIENT_SECRET"))
        {
            config.spotify_credentials = Some(SpotifyCredentials {
                client_id,
                client_secret,
            });
        }
        if let Some(url) = env_var("TRACKMATCH_SPOTIFY_API_URL") {
            config.spotify_api_url = url;
        }
        if let Some(url) = env_var("TRACKMATCH_SPOTIFY_AUTH_URL") {
            config.spotify_auth_url = url;
        }
        if let Some(url) = env_var("TRACKMATCH_MUSICBRAINZ_URL") {
            config.musicbrainz_api_url = url;
        }
        if let Some(agent) = env_var("TRACKMATCH_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(dir) = env_var("TRACKMATCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        match env_var("TRACKMATCH_DEBOUNCE_MS").map(|ms| ms.parse::<u64>()) {
            Some(Ok(ms)) => config.debounce = Duration::from_millis(ms),
            Some(Err(e)) => tracing::warn!(error = %e, "Ignoring invalid TRACKMATCH_DEBOUNCE_MS"),
            None => {}
        }

        config
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
