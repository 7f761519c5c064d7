//! Storyweave — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storyweave_core::error::EngineError;

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `EngineError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            EngineError::SceneNotFound(_) => (StatusCode::NOT_FOUND, "scene_not_found"),
            EngineError::InvalidChoice { .. } => (StatusCode::BAD_REQUEST, "invalid_choice"),
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EngineError::AlreadyActive(_) => (StatusCode::CONFLICT, "session_already_active"),
            EngineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use storyweave_core::types::{SceneId, SessionKind};

    fn status_of(err: EngineError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_scene_not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::SceneNotFound(SceneId::from("missing"))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_invalid_choice_maps_to_400() {
        assert_eq!(
            status_of(EngineError::InvalidChoice {
                index: 3,
                reason: "out of range".into(),
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(EngineError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_already_active_maps_to_409() {
        assert_eq!(
            status_of(EngineError::AlreadyActive(SessionKind::Battle)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_storage_maps_to_500() {
        assert_eq!(
            status_of(EngineError::Storage("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
