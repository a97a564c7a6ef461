use std::time::Duration;

use dealgate_storage_sqlite::get_db_path;

const DEFAULT_DATA_DIR: &str = "./db";
const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 2_000;
const DEFAULT_DISPATCH_BATCH: i64 = 10;
const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// How often the dispatcher sweeps for queued deliverables.
    pub dispatch_interval: Duration,
    /// Deliverables processed per sweep.
    pub dispatch_batch: i64,
    /// Age after which a `generating` deliverable is considered abandoned.
    pub generation_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("DG_DB_PATH").unwrap_or_else(|| get_db_path(DEFAULT_DATA_DIR));
        let dispatch_interval_ms = lookup("DG_DISPATCH_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_DISPATCH_INTERVAL_MS);
        let dispatch_batch = lookup("DG_DISPATCH_BATCH")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_DISPATCH_BATCH);
        let generation_timeout_ms = lookup("DG_GENERATION_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_GENERATION_TIMEOUT_MS);
        let log_format = match lookup("DG_LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            db_path,
            dispatch_interval: Duration::from_millis(dispatch_interval_ms),
            dispatch_batch,
            generation_timeout: Duration::from_millis(generation_timeout_ms),
            log_format,
        }
    }
}
