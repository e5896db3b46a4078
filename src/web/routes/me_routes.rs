use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;

use crate::interactions::{InteractionController, InteractionKind, InteractionState};
use crate::session::SessionContext;
use crate::web::{AppError, AppState, models::CurrentSession};

const INTERACTION_FAILED: &str = "Failed to update interaction";

pub fn create_me_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_profile))
        .route("/interactions/{companion_id}", get(get_interaction).put(put_interaction))
        .route("/interactions/{companion_id}/{kind}", post(toggle_interaction))
}

async fn get_profile(CurrentSession(session): CurrentSession) -> impl IntoResponse {
    Json(session.user)
}

/// The viewer's flags for one companion; all false when never interacted.
async fn get_interaction(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(companion_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let state = app_state
        .store
        .get_interaction(session.user_id(), &companion_id)
        .await
        .map_err(AppError::failed("Failed to fetch interaction"))?;
    Ok(Json(state.unwrap_or_default()))
}

/// Writes the full triple as given. Returns the companion's new counters.
async fn put_interaction(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(companion_id): Path<String>,
    Json(state): Json<InteractionState>,
) -> Result<impl IntoResponse, AppError> {
    let counts = app_state
        .store
        .upsert_interaction(session.user_id(), &companion_id, state)
        .await
        .map_err(AppError::failed(INTERACTION_FAILED))?;
    Ok(Json(counts))
}

/// Toggles one flag with like/dislike exclusivity, starting from the stored
/// flags. Returns the card as it should now be displayed.
async fn toggle_interaction(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path((companion_id, kind)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = kind.parse::<InteractionKind>().map_err(AppError::InvalidInput)?;
    let record = app_state
        .store
        .get_companion(&companion_id, Some(session.user_id()))
        .await
        .map_err(AppError::failed(INTERACTION_FAILED))?;

    let controller = InteractionController::new(&record, app_state.store.clone(), SessionContext::signed_in(session));
    let card = controller.toggle(kind).await?;
    Ok(Json(card))
}
