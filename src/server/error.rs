// Dispatch service error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::tools::{DispatchError, UnknownTool, ValidationError};

/// Error wrapper for dispatch handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    UnknownTool(#[from] UnknownTool),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(e) => ApiError::Validation(e),
            DispatchError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(e) => {
                tracing::warn!(error = %e, field = ?e.field(), "Rejected tool request");
                let body = json!({
                    "error": e.to_string(),
                    "field": e.field(),
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::UnknownTool(e) => {
                tracing::warn!(tool = %e.0, "Unknown tool requested");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
            }
            ApiError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                let body = json!({ "error": format!("Server error: {}", e) });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_names_field() {
        let response =
            ApiError::from(ValidationError::MissingParameter("target".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "target parameter is required");
        assert_eq!(body["field"], "target");
    }

    #[tokio::test]
    async fn test_internal_hides_details_behind_message() {
        let response = ApiError::from(anyhow::anyhow!("disk full")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Server error: disk full");
    }
}
