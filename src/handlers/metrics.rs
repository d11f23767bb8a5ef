//! Counter snapshot plus which data sources have been opened.
//! Used by: server.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::query::request::DataSource;
use crate::state::AppState;
use crate::telemetry::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub connected_sources: Vec<DataSource>,
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    let connected_sources = [DataSource::Primary, DataSource::Secondary]
        .into_iter()
        .filter(|&source| state.sources.is_connected(source))
        .collect();
    Json(MetricsReport { counters: state.metrics.snapshot(), connected_sources })
}
