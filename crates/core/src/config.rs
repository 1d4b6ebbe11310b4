use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, failing on values that are present but malformed.
fn profiled_env_parse<T>(profile: &str, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match profiled_env_opt(profile, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn profiled_env_parse_opt<T>(profile: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    profiled_env_opt(profile, key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub aws: AwsConfig,
    pub queue: QueueConfig,
    pub postgres: PostgresConfig,
    pub startup: StartupConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `GEOINGEST_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = profiled_env_or("", "GEOINGEST_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            aws: AwsConfig::from_env_profiled(p),
            queue: QueueConfig::from_env_profiled(p)?,
            postgres: PostgresConfig::from_env_profiled(p)?,
            startup: StartupConfig::from_env_profiled(p)?,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  aws:       region={}, endpoint={}",
            self.aws.region,
            self.aws.endpoint_url.as_deref().unwrap_or("(default)")
        );
        tracing::info!(
            "  queue:     name={}, url={}, batch={}, wait={}s, visibility={}s",
            self.queue.queue_name,
            self.queue.queue_url.as_deref().unwrap_or("(resolve)"),
            self.queue.max_messages,
            self.queue.wait_time_secs,
            self.queue.visibility_timeout_secs
        );
        tracing::info!(
            "  postgres:  host={}:{}, db={}, user={}",
            self.postgres.host,
            self.postgres.port,
            self.postgres.database,
            self.postgres.username
        );
        tracing::info!(
            "  startup:   delay={:?}, max_delay={:?}, attempts={}",
            self.startup.retry_delay,
            self.startup.retry_max_delay,
            self.startup
                .max_attempts
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        );
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_DEFAULT_REGION", "us-east-1"),
            access_key_id: Some(profiled_env_or(p, "AWS_ACCESS_KEY_ID", "test")),
            secret_access_key: Some(profiled_env_or(p, "AWS_SECRET_ACCESS_KEY", "test")),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            endpoint_url: Some(profiled_env_or(p, "AWS_ENDPOINT_URL", "http://localstack:4566")),
        }
    }

    /// Endpoint with a scheme attached, or `None` for the provider default.
    pub fn endpoint(&self) -> Option<String> {
        let endpoint = self.endpoint_url.as_deref()?.trim();
        if endpoint.is_empty() {
            return None;
        }
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Some(endpoint.to_string())
        } else {
            Some(format!("https://{endpoint}"))
        }
    }
}

// ── Queue ─────────────────────────────────────────────────────

/// SQS caps a single receive at 10 messages.
pub const MAX_RECEIVE_BATCH: u32 = 10;

/// Longest long-poll wait SQS accepts.
pub const MAX_WAIT_TIME_SECS: u32 = 20;

/// Longest visibility timeout SQS accepts (12 hours).
pub const MAX_VISIBILITY_TIMEOUT_SECS: u32 = 43_200;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub queue_name: String,
    /// Skips name resolution when set.
    pub queue_url: Option<String>,
    pub max_messages: u32,
    pub wait_time_secs: u32,
    pub visibility_timeout_secs: u32,
    pub poll_error_delay: Duration,
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        let config = Self {
            queue_name: profiled_env_or(p, "QUEUE_NAME", "task2-ingest-queue"),
            queue_url: profiled_env_opt(p, "QUEUE_URL"),
            max_messages: profiled_env_parse(p, "QUEUE_MAX_MESSAGES", 5u32)?,
            wait_time_secs: profiled_env_parse(p, "QUEUE_WAIT_TIME_SECS", 10)?,
            visibility_timeout_secs: profiled_env_parse(p, "QUEUE_VISIBILITY_TIMEOUT_SECS", 30)?,
            poll_error_delay: Duration::from_millis(profiled_env_parse(
                p,
                "QUEUE_POLL_ERROR_DELAY_MS",
                3000u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject receive parameters SQS would refuse on every poll.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("QUEUE_MAX_MESSAGES", self.max_messages, 1, MAX_RECEIVE_BATCH)?;
        check_range("QUEUE_WAIT_TIME_SECS", self.wait_time_secs, 0, MAX_WAIT_TIME_SECS)?;
        check_range(
            "QUEUE_VISIBILITY_TIMEOUT_SECS",
            self.visibility_timeout_secs,
            0,
            MAX_VISIBILITY_TIMEOUT_SECS,
        )
    }
}

fn check_range(key: &str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("must be between {min} and {max}"),
    })
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: String,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            host: profiled_env_or(p, "PGHOST", "postgres"),
            port: profiled_env_parse(p, "PGPORT", 5432)?,
            database: profiled_env_or(p, "PGDATABASE", "geodb"),
            username: profiled_env_or(p, "PGUSER", "geo"),
            password: profiled_env_or(p, "PGPASSWORD", "geo"),
            ssl_mode: profiled_env_or(p, "PGSSLMODE", "prefer"),
        })
    }
}

// ── Startup ───────────────────────────────────────────────────

/// Reconnect strategy for dependencies that may come up after the worker.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub retry_delay: Duration,
    pub retry_max_delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl StartupConfig {
    fn from_env_profiled(p: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            retry_delay: Duration::from_millis(profiled_env_parse(
                p,
                "STARTUP_RETRY_DELAY_MS",
                2000u64,
            )?),
            retry_max_delay: Duration::from_millis(profiled_env_parse(
                p,
                "STARTUP_RETRY_MAX_DELAY_MS",
                30_000u64,
            )?),
            max_attempts: profiled_env_parse_opt(p, "STARTUP_MAX_ATTEMPTS")?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.retry_delay, self.retry_max_delay)
            .with_max_attempts(self.max_attempts)
    }
}
