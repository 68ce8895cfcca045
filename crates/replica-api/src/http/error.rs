//! Application error type mapping to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use replica_types::error::ArtifactError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Artifact store errors.
    Artifact(ArtifactError),
}

impl From<ArtifactError> for AppError {
    fn from(e: ArtifactError) -> Self {
        AppError::Artifact(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Artifact(ArtifactError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "FILE_NOT_FOUND", "File not found".to_string())
            }
            AppError::Artifact(ArtifactError::InvalidPath(path)) => {
                (StatusCode::BAD_REQUEST, "INVALID_PATH", format!("Invalid path '{path}'"))
            }
            AppError::Artifact(e) => {
                tracing::error!(error = %e, "artifact store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "ARTIFACT_ERROR", e.to_string())
            }
        };

        let body = json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError::from(ArtifactError::NotFound("x.html".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_path_maps_to_400() {
        let response = AppError::from(ArtifactError::InvalidPath("../x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_maps_to_500() {
        let io = std::io::Error::other("disk on fire");
        let response = AppError::from(ArtifactError::Io(io)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
