use axum::{
    body::Body as AxumBody,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::routing::GuardDecision;
use crate::session::Session;
use crate::web::{AppState, error::AppError};

/// Consults the route table for every request. API paths answer 401 or 403,
/// page paths redirect to the login page or the caller's landing page.
pub async fn guard(State(state): State<Arc<AppState>>, req: Request<AxumBody>, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let decision = state.routes.decide(&path, req.extensions().get::<Session>());

    if decision == GuardDecision::Render {
        return next.run(req).await;
    }
    debug!(path = %path, ?decision, "Route guard refused request.");

    if path == "/api" || path.starts_with("/api/") {
        return match decision {
            GuardDecision::RedirectToLogin { .. } => AppError::LoginRequired.into_response(),
            _ => AppError::Forbidden.into_response(),
        };
    }
    match decision.location() {
        Some(location) => Redirect::to(&location).into_response(),
        None => next.run(req).await,
    }
}
