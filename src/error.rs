//! Unified error types for Historian.
//! Used by: store, executor, export, handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("backing store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Database(_)
            | Error::Csv(_)
            | Error::Xlsx(_)
            | Error::Serialization(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Maps a poisoned lock into an internal error naming the guarded resource.
pub fn lock_err<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Internal(format!("{what} lock poisoned: {e}"))
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_returns_400() {
        let response = Error::Validation("device is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_unavailable_returns_503() {
        let response = Error::StoreUnavailable("timeout".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn database_error_returns_500() {
        let response = Error::Database(rusqlite::Error::QueryReturnedNoRows).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_error_returns_500() {
        let response = Error::Internal("join failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn lock_err_names_resource() {
        let err = lock_err("store")("poisoned");
        assert_eq!(err.to_string(), "internal error: store lock poisoned: poisoned");
    }

    #[test]
    fn error_messages_are_descriptive() {
        assert_eq!(
            Error::Validation("bad format".into()).to_string(),
            "invalid request: bad format"
        );
        assert_eq!(
            Error::StoreUnavailable("primary".into()).to_string(),
            "backing store unavailable: primary"
        );
    }
}
