use axum::{
    Json, Router,
    extract::{Query, State},
    http::Method,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::routing::{GuardDecision, RouteTable};
use crate::server::config::ServerConfig;
use crate::services::AuthProvider;
use crate::store::CatalogStore;
use crate::web::{
    middleware::{auth::resolve_session, route_guard::guard},
    models::MaybeSession,
    routes::*,
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub routes: Arc<RouteTable>,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct RouteAccessQuery {
    path: String,
}

#[derive(Debug, Serialize)]
struct RouteAccessResponse {
    #[serde(flatten)]
    decision: GuardDecision,
    location: Option<String>,
}

/// Lets the front end ask what the guard would do with a page path before
/// navigating to it.
async fn route_access_handler(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeSession,
    Query(query): Query<RouteAccessQuery>,
) -> impl IntoResponse {
    let decision = app_state.routes.decide(&query.path, viewer.0.as_ref());
    Json(RouteAccessResponse {
        location: decision.location(),
        decision,
    })
}

pub fn create_axum_router(app_state: AppState) -> Router {
    let app_state = Arc::new(app_state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/route-access", get(route_access_handler))
        .nest("/api/auth", auth_routes::create_auth_router().merge(oauth_routes::create_oauth_router()))
        .nest("/api/catalog", catalog_routes::create_catalog_router())
        .nest("/api/me", me_routes::create_me_router())
        .nest("/api/admin/companions", admin_companion_routes::create_admin_companion_router())
        .nest("/api/admin/tags", tag_routes::create_tags_router())
        .nest("/api/admin/categories", tag_routes::create_categories_router())
        // Layers run bottom-up: the session is resolved before the guard reads it.
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), resolve_session))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
        .layer(cors)
}
