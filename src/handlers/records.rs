//! Paged grid listing.
//! Used by: server.

use axum::extract::{RawQuery, State};
use axum::Json;

use crate::executor::{self, ResultEnvelope};
use crate::handlers::parse_request;
use crate::state::AppState;

pub async fn records(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Json<ResultEnvelope> {
    let (request, _) = parse_request(&state, raw.as_deref());
    Json(executor::list(&state, &request).await)
}
