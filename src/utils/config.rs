use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "API_PROBE_BASE_URL";

/// Environment variable overriding the request timeout (seconds)
pub const TIMEOUT_ENV: &str = "API_PROBE_TIMEOUT_SECS";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server root the check paths are joined to
    pub base_url: String,

    /// Set when the base URL came from the environment or the command line,
    /// so a suite's own `baseUrl` must not replace it
    pub base_url_explicit: bool,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Endpoint used by `login` steps that don't name one
    pub login_path: String,

    /// Endpoint used by `refresh` steps that don't name one
    pub refresh_path: String,

    /// Directory for JSON/JUnit reports
    pub output_dir: PathBuf,

    /// Directory that `file` step paths are resolved against
    pub root_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            base_url_explicit: false,
            timeout_secs: 10,
            login_path: "/api/auth/login".to_string(),
            refresh_path: "/api/auth/refresh".to_string(),
            output_dir: PathBuf::from("./output"),
            root_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Defaults overlaid with `API_PROBE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
                config.base_url_explicit = true;
            }
        }

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_secs = secs,
                _ => log::warn!("Ignoring invalid {}={:?}", TIMEOUT_ENV, raw),
            }
        }

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
