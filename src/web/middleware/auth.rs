use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::web::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// Attaches the caller's [`Session`](crate::session::Session) to the request
/// when a valid token is presented. Never rejects: anonymous requests pass
/// through and the guard or the handler decides what they may see.
pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Response {
    // Authorization header first, then the cookie set at login.
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()));

    if let Some(token) = token {
        match state.auth.get_session(&token).await {
            Ok(Some(session)) => {
                req.extensions_mut().insert(session);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Session lookup failed; treating request as anonymous."),
        }
    }
    next.run(req).await
}
