use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde_json::json;
use std::sync::Arc;

use crate::session::{Session, SessionContext};
use crate::web::{
    AppError, AppState,
    middleware::auth::TOKEN_COOKIE,
    models::{CredentialsRequest, CurrentSession, LoginResponse, PasswordResetConfirmRequest, PasswordResetRequest},
};

pub fn create_auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/session", get(session_handler))
        .route("/password-reset", post(request_reset_handler))
        .route("/password-reset/confirm", post(confirm_reset_handler))
}

/// Session cookie mirroring the bearer token so page navigations carry it.
pub(crate) fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build()
}

fn with_cookie(mut response: Response, cookie: &Cookie<'_>) -> Result<Response, AppError> {
    let value = cookie
        .to_string()
        .parse()
        .map_err(|_| AppError::InternalServerError("Invalid cookie value".to_string()))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}

pub(crate) fn signed_in_response(session: Session) -> Result<Response, AppError> {
    let cookie = session_cookie(session.access_token.clone());
    with_cookie(Json(LoginResponse::from(session)).into_response(), &cookie)
}

async fn signup_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let session = app_state
        .auth
        .sign_up_with_password(&payload.email, &payload.password)
        .await?;
    let mut response = signed_in_response(session)?;
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response, AppError> {
    let session = app_state
        .auth
        .sign_in_with_password(&payload.email, &payload.password)
        .await?;
    signed_in_response(session)
}

async fn logout_handler(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, AppError> {
    SessionContext::signed_in(session)
        .sign_out(app_state.auth.as_ref())
        .await?;
    let mut expired = session_cookie(String::new());
    expired.make_removal();
    with_cookie(StatusCode::NO_CONTENT.into_response(), &expired)
}

async fn session_handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
    Json(LoginResponse::from(session))
}

/// Always answers 202 so callers cannot tell which emails are registered.
async fn request_reset_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth.request_password_reset(&payload.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "If that email is registered, a reset link is on its way." })),
    ))
}

async fn confirm_reset_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .auth
        .confirm_password_reset(&payload.token, &payload.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
