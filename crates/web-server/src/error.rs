use attachment::AttachError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachError),
    #[error("Validation error: {0}")]
    Validation(#[from] core_types::CoreError),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Converts our custom `AppError` into an HTTP response. The mapping is
/// purely by error kind; handlers never inspect message text.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            AppError::Attachment(err) => status_for_attach(err),
            AppError::Database(err) => status_for_db(err),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

fn status_for_attach(err: AttachError) -> (StatusCode, String) {
    match err {
        AttachError::Db(db_err) => status_for_db(db_err),
        err @ (AttachError::DeviceNotFound(_) | AttachError::BatteryNotFound(_)) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        // The remaining variants are business-rule rejections.
        err => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn status_for_db(err: DbError) -> (StatusCode, String) {
    match err {
        DbError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
        DbError::ConstraintViolation(_) => (StatusCode::CONFLICT, err.to_string()),
        DbError::Transient(_) => {
            tracing::warn!(error = %err, "transient database failure surfaced to client");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        other => {
            tracing::error!(error = ?other, "Database error.");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal database error occurred".to_string(),
            )
        }
    }
}
