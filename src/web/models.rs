use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::db::models::UserProfile;
use crate::session::Session;
use crate::web::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub user: UserProfile,
    /// Where the front end should navigate after signing in.
    pub landing_path: String,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            landing_path: session.user.role.landing_path().to_string(),
            token: session.access_token,
            expires_at: session.expires_at,
            user: session.user,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanionTagsRequest {
    pub tag_ids: Vec<String>,
}

/// The signed-in viewer. Rejects with 401 when the request carries no valid
/// session.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::LoginRequired)
    }
}

/// The viewer if signed in. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(Session::user_id)
    }
}

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<Session>().cloned()))
    }
}
