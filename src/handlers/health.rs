//! Health check endpoint.
//! Used by: server.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::query::request::DataSource;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SourceHealth {
    pub source: DataSource,
    pub path: String,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub sources: Vec<SourceHealth>,
}

/// Always 200; `connected` only reports whether a source has been opened yet.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let sources = [DataSource::Primary, DataSource::Secondary]
        .into_iter()
        .map(|source| SourceHealth {
            source,
            path: state.sources.path(source).to_owned(),
            connected: state.sources.is_connected(source),
        })
        .collect();
    Json(Health { status: "ok", sources })
}
