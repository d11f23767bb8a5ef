//! Summary counters for the current filter.
//! Used by: server.

use axum::extract::{RawQuery, State};
use axum::Json;

use crate::error::Result;
use crate::executor;
use crate::handlers::parse_request;
use crate::state::AppState;
use crate::store::sqlite::Stats;

pub async fn stats(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<Stats>> {
    let (request, _) = parse_request(&state, raw.as_deref());
    Ok(Json(executor::stats(&state, &request).await?))
}
