use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to HTTP clients. Every variant renders as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User already exists")]
    Conflict,

    /// Deliberately identical for unknown usernames and wrong passwords.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Token is missing!")]
    MissingToken,

    #[error("Invalid token!")]
    InvalidToken,

    #[error("Token has expired!")]
    ExpiredToken,

    #[error("Image not found!")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("File is too large")]
    PayloadTooLarge,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Persistence-layer failures shared by the user and image stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record violates a uniqueness constraint")]
    Conflict,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Other(anyhow::Error::new(e)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => ApiError::Conflict,
            StoreError::Other(inner) => ApiError::Internal(inner),
        }
    }
}

/// Malformed or incomplete JSON bodies stay inside the `{"message"}` envelope.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Conflict | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::MissingToken
            | ApiError::InvalidToken
            | ApiError::ExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            error!(error = ?err, "internal error");
        }
        let status = self.status();
        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_message(err: ApiError) -> (StatusCode, String) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, v["message"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn token_rejections_are_401_with_distinct_messages() {
        assert_eq!(
            body_message(ApiError::MissingToken).await,
            (StatusCode::UNAUTHORIZED, "Token is missing!".into())
        );
        assert_eq!(
            body_message(ApiError::InvalidToken).await,
            (StatusCode::UNAUTHORIZED, "Invalid token!".into())
        );
        assert_eq!(
            body_message(ApiError::ExpiredToken).await,
            (StatusCode::UNAUTHORIZED, "Token has expired!".into())
        );
    }

    #[tokio::test]
    async fn conflict_is_reported_as_bad_request() {
        assert_eq!(
            body_message(ApiError::Conflict).await,
            (StatusCode::BAD_REQUEST, "User already exists".into())
        );
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let (status, msg) = body_message(ApiError::Internal(anyhow::anyhow!("pool exhausted"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Internal server error");
    }

    #[tokio::test]
    async fn oversized_body_is_413() {
        assert_eq!(
            body_message(ApiError::PayloadTooLarge).await,
            (StatusCode::PAYLOAD_TOO_LARGE, "File is too large".into())
        );
    }

    #[test]
    fn store_conflict_maps_to_api_conflict() {
        let api: ApiError = StoreError::Conflict.into();
        assert!(matches!(api, ApiError::Conflict));
        let api: ApiError = StoreError::Other(anyhow::anyhow!("boom")).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
