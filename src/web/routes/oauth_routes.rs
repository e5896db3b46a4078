use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::auth_routes::session_cookie;
use crate::web::{AppError, AppState};

const STATE_COOKIE: &str = "oauth_state";

pub fn create_oauth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/providers", get(get_providers_handler))
        .route("/{provider}/login", get(login_handler))
        .route("/{provider}/callback", get(callback_handler))
}

#[derive(Deserialize, Debug)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

async fn get_providers_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(app_state.auth.social_providers())
}

fn state_cookie(value: String) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build()
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    if let Ok(value) = cookie.to_string().parse() {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Response, AppError> {
    let nonce = Uuid::new_v4().to_string();
    let auth_url = app_state.auth.social_authorize_url(&provider, &nonce)?;

    let mut response = Redirect::to(&auth_url).into_response();
    append_cookie(&mut response, &state_cookie(nonce));
    Ok(response)
}

async fn callback_handler(
    State(app_state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let frontend = app_state.config.frontend_url.trim_end_matches('/');
    let failure = || Redirect::to(&format!("{frontend}/login?error=oauth_failed")).into_response();

    if let Some(error) = &params.error {
        warn!(provider = %provider, error = %error, "Provider reported an authorization error.");
        return failure();
    }
    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let (Some(code), Some(state)) = (&params.code, &params.state) else {
        warn!(provider = %provider, "OAuth callback without code or state.");
        return failure();
    };
    if stored_state.as_deref() != Some(state.as_str()) {
        warn!(provider = %provider, "OAuth state mismatch.");
        return failure();
    }

    let session = match app_state.auth.sign_in_with_provider(&provider, code).await {
        Ok(session) => session,
        Err(e) => {
            warn!(provider = %provider, error = %e, "Social sign-in failed.");
            return failure();
        }
    };

    let landing = session.role().landing_path();
    let mut response = Redirect::to(&format!("{frontend}{landing}")).into_response();
    append_cookie(&mut response, &session_cookie(session.access_token));
    let mut cleared = state_cookie(String::new());
    cleared.make_removal();
    append_cookie(&mut response, &cleared);
    response
}
