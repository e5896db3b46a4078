use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::interactions::InteractionError;
use crate::notice::Notice;
use crate::services::AuthError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Please sign in to continue")]
    LoginRequired,
    #[error("Please sign in to interact with companions")]
    SignInRequired,
    #[error("You do not have access to this resource")]
    Forbidden,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A collaborator rejected the operation. Carries only the user-facing
    /// action text; the cause has already been logged.
    #[error("{0}")]
    ActionFailed(&'static str),
    #[error("Sign-in provider error")]
    ProviderFailed,
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Maps a store failure for the named action. Validation and lookup
    /// failures keep their message; anything else is logged and reduced to
    /// the action text.
    pub fn failed(action: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |err| match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Invalid(msg) => AppError::InvalidInput(msg),
            other => {
                error!(error = %other, "{action}");
                AppError::ActionFailed(action)
            }
        }
    }

    fn notice(&self) -> Option<Notice> {
        match self {
            AppError::SignInRequired => Some(Notice::sign_in_required()),
            AppError::ActionFailed(action) => Some(Notice::failure(*action)),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let notice = self.notice();
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()),
            AppError::LoginRequired | AppError::SignInRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ActionFailed(action) => (StatusCode::INTERNAL_SERVER_ERROR, action.to_string()),
            AppError::ProviderFailed => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = match notice {
            Some(notice) => json!({ "error": error_message, "notice": notice }),
            None => json!({ "error": error_message }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => AppError::InvalidInput(msg),
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::EmailTaken => AppError::Conflict(err.to_string()),
            AuthError::InvalidResetToken => AppError::InvalidInput(err.to_string()),
            AuthError::UnknownProvider(name) => AppError::NotFound(format!("Sign-in provider '{name}'")),
            AuthError::Provider(msg) => {
                error!(error = %msg, "Sign-in provider request failed.");
                AppError::ProviderFailed
            }
            other => {
                error!(error = %other, "Authentication request failed.");
                AppError::InternalServerError("Authentication failed".to_string())
            }
        }
    }
}

impl From<InteractionError> for AppError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::SignInRequired => AppError::SignInRequired,
            InteractionError::Busy => AppError::Conflict(err.to_string()),
            // The controller already logged the cause.
            InteractionError::WriteFailed(_) => AppError::ActionFailed("Failed to update interaction"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn store_failures_hide_detail() {
        let err = AppError::failed("Failed to save companion")(StoreError::Unavailable(
            "pool timed out after 30s".to_string(),
        ));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to save companion");
        assert_eq!(body["notice"]["title"], "Error");
        assert!(!body.to_string().contains("pool timed out"));
    }

    #[tokio::test]
    async fn validation_errors_keep_their_message() {
        let err = AppError::failed("Failed to save companion")(StoreError::Invalid("Unknown tags: t9".to_string()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown tags: t9");
        assert!(body.get("notice").is_none());
    }

    #[tokio::test]
    async fn sign_in_required_carries_notice() {
        let (status, body) = body_json(AppError::from(InteractionError::SignInRequired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["notice"]["title"], "Sign in required");
    }
}
