//! Distinct values for the multi-value filter pickers.
//! Used by: server.

use axum::extract::{RawQuery, State};
use axum::Json;

use crate::error::Result;
use crate::executor;
use crate::handlers::parse_request;
use crate::state::AppState;
use crate::store::sqlite::Facets;

pub async fn facets(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<Facets>> {
    let (request, _) = parse_request(&state, raw.as_deref());
    Ok(Json(executor::facets(&state, request.data_source).await?))
}
