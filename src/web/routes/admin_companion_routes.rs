use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use std::sync::Arc;
use tracing::info;

use crate::db::models::{CompanionDraft, CompanionRecord};
use crate::web::{AppError, AppState, models::{CompanionTagsRequest, CurrentSession}};

const SAVE_FAILED: &str = "Failed to save companion";
const DELETE_FAILED: &str = "Failed to delete companion";

pub fn create_admin_companion_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_companions_handler).post(create_companion_handler))
        .route(
            "/{id}",
            get(get_companion_handler)
                .put(update_companion_handler)
                .delete(delete_companion_handler),
        )
        .route("/{id}/tags", put(replace_tags_handler))
}

async fn list_companions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<CompanionRecord>>, AppError> {
    let records = app_state
        .store
        .list_companions(None)
        .await
        .map_err(AppError::failed("Failed to fetch companions"))?;
    Ok(Json(records))
}

async fn get_companion_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompanionRecord>, AppError> {
    let record = app_state
        .store
        .get_companion(&id, None)
        .await
        .map_err(AppError::failed("Failed to fetch companions"))?;
    Ok(Json(record))
}

async fn create_companion_handler(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(admin): CurrentSession,
    Json(draft): Json<CompanionDraft>,
) -> Result<(StatusCode, Json<CompanionRecord>), AppError> {
    let record = app_state
        .store
        .insert_companion(&draft)
        .await
        .map_err(AppError::failed(SAVE_FAILED))?;
    info!(companion_id = %record.id(), admin_id = %admin.user_id(), "Companion created.");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_companion_handler(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(admin): CurrentSession,
    Path(id): Path<String>,
    Json(draft): Json<CompanionDraft>,
) -> Result<Json<CompanionRecord>, AppError> {
    let record = app_state
        .store
        .update_companion(&id, &draft)
        .await
        .map_err(AppError::failed(SAVE_FAILED))?;
    info!(companion_id = %id, admin_id = %admin.user_id(), "Companion updated.");
    Ok(Json(record))
}

async fn delete_companion_handler(
    State(app_state): State<Arc<AppState>>,
    CurrentSession(admin): CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state
        .store
        .delete_companion(&id)
        .await
        .map_err(AppError::failed(DELETE_FAILED))?;
    info!(companion_id = %id, admin_id = %admin.user_id(), "Companion deleted.");
    Ok(StatusCode::NO_CONTENT)
}

/// Replaces the companion's tag set. Returns the record as now stored.
async fn replace_tags_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CompanionTagsRequest>,
) -> Result<Json<CompanionRecord>, AppError> {
    app_state
        .store
        .replace_companion_tags(&id, &payload.tag_ids)
        .await
        .map_err(AppError::failed(SAVE_FAILED))?;
    let record = app_state
        .store
        .get_companion(&id, None)
        .await
        .map_err(AppError::failed(SAVE_FAILED))?;
    Ok(Json(record))
}
