//! Configuration loaded from environment variables with defaults.

use std::time::Duration;

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".clockmail/clockmail.db";

/// Environment variable naming the database path.
pub const ENV_DB: &str = "CLOCKMAIL_DB";

/// Environment variable supplying the default agent identity.
pub const ENV_AGENT: &str = "CLOCKMAIL_AGENT";

/// Environment variable controlling the tracing filter.
pub const ENV_LOG: &str = "CLOCKMAIL_LOG";

/// Retry policy for transient storage contention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base backoff delay; also the jitter bound
    pub base_delay: Duration,
    /// Backoff cap
    pub max_delay: Duration,
    /// Substrings identifying transient driver errors. Deployments on
    /// unusual SQLite builds can extend this without code changes.
    pub transient_patterns: Vec<&'static str>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            transient_patterns: vec![
                "SQLITE_BUSY",
                "SQLITE_LOCKED",
                "IOERR_SHORT_READ",
                "database is locked",
                "database table is locked",
                "(5)",   // SQLITE_BUSY code
                "(6)",   // SQLITE_LOCKED code
                "(522)", // SQLITE_IOERR_SHORT_READ code
            ],
        }
    }
}

/// Store-level configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite file; parent directory is created if missing
    pub db_path: String,
    /// SQLite busy_timeout
    pub busy_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            busy_timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    /// - `CLOCKMAIL_DB`: database path (default: `.clockmail/clockmail.db`)
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var(ENV_DB).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            ..Self::default()
        }
    }
}

/// Session-level configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Default agent identity; a per-invocation argument overrides it
    pub agent_id: Option<String>,
    /// Agents seen within this window count as active for the frontier
    pub liveness_window: Duration,
    /// Default lock TTL in seconds
    pub default_lock_ttl: Duration,
    /// Default page size for event queries
    pub default_event_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_id: None,
            liveness_window: Duration::from_secs(10 * 60),
            default_lock_ttl: Duration::from_secs(3600),
            default_event_limit: 100,
        }
    }
}

impl SessionConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    /// - `CLOCKMAIL_AGENT`: default agent id
    /// - `CLOCKMAIL_LIVENESS_SECS`: frontier liveness window in seconds
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            agent_id: std::env::var(ENV_AGENT).ok().filter(|s| !s.is_empty()),
            liveness_window: std::env::var("CLOCKMAIL_LIVENESS_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.liveness_window),
            ..defaults
        }
    }
}
