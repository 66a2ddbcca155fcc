use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde_json::json;

use crate::{auth::jwt::TokenError, db::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("account already exists")]
    AccountExists,
    #[error("{0}")]
    Credentials(&'static str),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("upload failed: {0}")]
    Upload(anyhow::Error),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("identity missing when checking access")]
    AccessCheck,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AccountExists | AppError::Credentials(_) | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::DuplicateEmail) => StatusCode::UNAUTHORIZED,
            AppError::Store(_)
            | AppError::Upload(_)
            | AppError::Token(_)
            | AppError::AccessCheck
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::AccountExists | AppError::Store(StoreError::DuplicateEmail) => {
                "Process failed. User already exists.".into()
            }
            AppError::Credentials(msg) | AppError::NotFound(msg) => (*msg).into(),
            AppError::Unauthorized => "Unauthorized".into(),
            AppError::Forbidden => "Forbidden".into(),
            AppError::Store(_) => "Record store unavailable".into(),
            AppError::Upload(_) => "File upload failed".into(),
            AppError::AccessCheck => "Server error while checking access permissions.".into(),
            AppError::Token(_) | AppError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub(crate) async fn handle_middleware_errors(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
    if err.is::<tower::load_shed::error::Overloaded>() {
        tracing::warn!("rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": "Too many requests, please try again later." })),
        );
    }
    tracing::error!("Unhandled error: {:?}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AccountExists.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("User not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Store(StoreError::Unavailable(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::AccessCheck.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let res = AppError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Internal server error"));
        assert!(!text.contains("hunter2"));
    }

    #[tokio::test]
    async fn shed_requests_map_to_too_many_requests() {
        let err: BoxError = Box::new(tower::load_shed::error::Overloaded::new());
        let (status, Json(body)) = handle_middleware_errors(err).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["message"], "Too many requests, please try again later.");

        let (status, _) = handle_middleware_errors("boom".into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
