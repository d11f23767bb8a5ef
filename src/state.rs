//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::store::registry::DataSources;
use crate::telemetry::Metrics;

pub struct AppStateInner {
    pub config: Config,
    pub sources: DataSources,
    pub metrics: Metrics,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn page_max_limit(&self) -> u32 {
        self.config.page_max_limit
    }
}

pub fn build_state(config: Config) -> AppState {
    Arc::new(AppStateInner {
        sources: DataSources::new(&config),
        metrics: Metrics::new(),
        config,
    })
}

#[cfg(test)]
pub fn build_test_state() -> crate::error::Result<AppState> {
    use crate::store::sqlite::fixtures::seeded;

    let config = Config {
        query_timeout: std::time::Duration::from_secs(1),
        export_max_rows: 1_000,
        ..Config::default()
    };
    Ok(Arc::new(AppStateInner {
        sources: DataSources::preloaded(seeded()?, seeded()?),
        metrics: Metrics::new(),
        config,
    }))
}
