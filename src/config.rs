//! Environment-driven configuration.
//! Used by: main, state, store::registry, executor.

use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PRIMARY_DB: &str = "historian.db";
const DEFAULT_SECONDARY_DB: &str = "historian-backup.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub primary_db: String,
    pub secondary_db: String,
    pub query_timeout: Duration,
    pub export_max_rows: usize,
    pub chart_max_points: usize,
    pub page_max_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            primary_db: DEFAULT_PRIMARY_DB.into(),
            secondary_db: DEFAULT_SECONDARY_DB.into(),
            query_timeout: Duration::from_secs(60),
            export_max_rows: 100_000,
            chart_max_points: 5_000,
            page_max_limit: 1_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            primary_db: lookup("HISTORIAN_PRIMARY_DB").unwrap_or(defaults.primary_db),
            secondary_db: lookup("HISTORIAN_SECONDARY_DB").unwrap_or(defaults.secondary_db),
            query_timeout: Duration::from_secs(parse_or(
                &lookup,
                "QUERY_TIMEOUT_SECS",
                defaults.query_timeout.as_secs(),
            )),
            export_max_rows: parse_or(&lookup, "EXPORT_MAX_ROWS", defaults.export_max_rows),
            chart_max_points: parse_or(&lookup, "CHART_MAX_POINTS", defaults.chart_max_points),
            page_max_limit: parse_or(&lookup, "PAGE_MAX_LIMIT", defaults.page_max_limit),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + PartialOrd + Default + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            tracing::warn!(key, value = %raw, default = %default, "invalid config value, using default");
            default
        }
    }
}
