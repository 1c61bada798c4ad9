//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use crate::services::wizard::DEFAULT_WIZARD_TTL;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ticket API (wizard checkpoints and finalize)
    pub api_url: String,
    /// Base URL of the identity provider
    pub identity_url: String,
    /// Directory for persistent local storage
    pub storage_dir: PathBuf,
    /// Wizard session time-to-live, renewed on every write
    pub wizard_ttl: Duration,
    /// Delay before the recovery check reads storage
    pub recovery_settle_delay: Duration,
    /// Token refresh tuning
    pub refresh: RefreshSettings,
}

/// Timing knobs for the auth token coordinator.
#[derive(Debug, Clone, Copy)]
pub struct RefreshSettings {
    /// Fraction of the remaining lifetime after which the scheduled refresh fires
    pub proactive_fraction: f64,
    /// Quiet period after user activity before checking expiry
    pub activity_debounce: Duration,
    /// Activity-triggered refresh happens when less than this remains
    pub activity_threshold: Duration,
    /// Period of the background expiry check
    pub background_interval: Duration,
    /// Background refresh happens when less than this remains
    pub background_threshold: Duration,
    /// `valid_token` refreshes first when less than this remains
    pub request_margin: Duration,
    /// Delay between the expiry notice and the redirect to login
    pub expired_redirect_delay: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            proactive_fraction: 0.75,
            activity_debounce: Duration::from_secs(1),
            activity_threshold: Duration::from_secs(10 * 60),
            background_interval: Duration::from_secs(5 * 60),
            background_threshold: Duration::from_secs(15 * 60),
            request_margin: Duration::from_secs(5 * 60),
            expired_redirect_delay: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            identity_url: "http://localhost:3000".to_string(),
            storage_dir: env::temp_dir().join("simple-tracker-test"),
            wizard_ttl: DEFAULT_WIZARD_TTL,
            recovery_settle_delay: Duration::from_millis(100),
            refresh: RefreshSettings::default(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_url = env::var("TRACKER_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("TRACKER_API_URL"))?;

        let identity_url = env::var("TRACKER_IDENTITY_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| api_url.clone());

        let storage_dir = env::var("TRACKER_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".simple-tracker"));

        let defaults = RefreshSettings::default();
        let refresh = RefreshSettings {
            proactive_fraction: parse_var("TOKEN_PROACTIVE_FRACTION", 0.75)?,
            activity_threshold: secs_var(
                "TOKEN_ACTIVITY_THRESHOLD_SECS",
                defaults.activity_threshold,
            )?,
            background_interval: secs_var(
                "TOKEN_BACKGROUND_INTERVAL_SECS",
                defaults.background_interval,
            )?,
            background_threshold: secs_var(
                "TOKEN_BACKGROUND_THRESHOLD_SECS",
                defaults.background_threshold,
            )?,
            ..defaults
        };

        if !(0.0..=1.0).contains(&refresh.proactive_fraction) {
            return Err(ConfigError::Invalid {
                name: "TOKEN_PROACTIVE_FRACTION",
                value: refresh.proactive_fraction.to_string(),
            });
        }

        Ok(Self {
            api_url,
            identity_url,
            storage_dir,
            wizard_ttl: hours_var("WIZARD_TTL_HOURS", DEFAULT_WIZARD_TTL)?,
            recovery_settle_delay: Duration::from_millis(parse_var(
                "RECOVERY_SETTLE_DELAY_MS",
                500,
            )?),
            refresh,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn secs_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(name, default.as_secs()).map(Duration::from_secs)
}

fn hours_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let hours = parse_var(name, default.as_secs() / (60 * 60))?;
    hours
        .checked_mul(60 * 60)
        .map(Duration::from_secs)
        // Must still be a representable expiry when added to the current time
        .filter(|ttl| {
            chrono::Duration::from_std(*ttl)
                .ok()
                .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
                .is_some()
        })
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: hours.to_string(),
        })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
