//! Grid export as CSV or XLSX.
//! Used by: server.

use axum::extract::{RawQuery, State};
use axum::response::Response;

use crate::error::{Error, Result};
use crate::executor;
use crate::export::{export_filename, visible_columns, Format};
use crate::handlers::{attachment, parse_request};
use crate::state::AppState;

pub async fn export(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
    let (request, params) = parse_request(&state, raw.as_deref());
    let format = Format::parse(params.value("format"))?;
    let columns = visible_columns(params.value("visibleColumns").or_else(|| params.value("visibleCols")));

    let exported = executor::export(&state, &request).await?;
    let count = exported.rows.len();
    let body = tokio::task::spawn_blocking(move || format.render(&exported.rows, &columns))
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    tracing::info!(format = format.extension(), rows = count, bytes = body.len(), "export rendered");
    let filename = export_filename(format, chrono::Utc::now().naive_utc());
    Ok(attachment(format.content_type(), &filename, body, exported.truncated))
}
