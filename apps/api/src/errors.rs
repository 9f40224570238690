use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::tracker::TrackerError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Tracker(e) => tracker_error_parts(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn tracker_error_parts(e: &TrackerError) -> (StatusCode, &'static str, String) {
    match e {
        TrackerError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        TrackerError::StoreMissing(_) => (StatusCode::NOT_FOUND, "TRACKER_NOT_FOUND", e.to_string()),
        TrackerError::StoreEmpty(_) => (StatusCode::NOT_FOUND, "TRACKER_EMPTY", e.to_string()),
        TrackerError::CandidateNotFound => {
            (StatusCode::NOT_FOUND, "CANDIDATE_NOT_FOUND", e.to_string())
        }
        TrackerError::StoreUnreadable { .. } => {
            tracing::error!("{e}");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TRACKER_UNREADABLE",
                e.to_string(),
            )
        }
        TrackerError::Io { .. } | TrackerError::Write { .. } | TrackerError::Lock { .. } => {
            tracing::error!("Tracker storage error: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "A storage error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_tracker_error_status_mapping() {
        let cases = [
            (TrackerError::CandidateNotFound, StatusCode::NOT_FOUND),
            (
                TrackerError::InvalidInput("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TrackerError::StoreUnreadable {
                    path: PathBuf::from("t.xlsx"),
                    reason: "zip".to_string(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                TrackerError::Write {
                    path: PathBuf::from("t.xlsx"),
                    reason: "disk full".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }
}
