use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use std::sync::Arc;

use crate::db::{entities::tag_category, models::{Tag, TagDraft}};
use crate::web::{AppError, AppState, models::CategoryRequest};

// --- Tags ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags_handler).post(create_tag_handler))
        .route("/{id}", put(update_tag_handler).delete(delete_tag_handler))
}

async fn list_tags_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, AppError> {
    let tags = app_state
        .store
        .list_tags()
        .await
        .map_err(AppError::failed("Failed to fetch tags"))?;
    Ok(Json(tags))
}

async fn create_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Json(draft): Json<TagDraft>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let tag = app_state
        .store
        .insert_tag(&draft)
        .await
        .map_err(AppError::failed("Failed to save tag"))?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<TagDraft>,
) -> Result<Json<Tag>, AppError> {
    let tag = app_state
        .store
        .update_tag(&id, &draft)
        .await
        .map_err(AppError::failed("Failed to save tag"))?;
    Ok(Json(tag))
}

async fn delete_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state
        .store
        .delete_tag(&id)
        .await
        .map_err(AppError::failed("Failed to delete tag"))?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Categories ---

pub fn create_categories_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories_handler).post(create_category_handler))
        .route("/{id}", put(rename_category_handler).delete(delete_category_handler))
}

async fn list_categories_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<tag_category::Model>>, AppError> {
    let categories = app_state
        .store
        .list_categories()
        .await
        .map_err(AppError::failed("Failed to fetch tag categories"))?;
    Ok(Json(categories))
}

async fn create_category_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<tag_category::Model>), AppError> {
    let category = app_state
        .store
        .insert_category(&payload.name)
        .await
        .map_err(AppError::failed("Failed to save tag category"))?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CategoryRequest>,
) -> Result<Json<tag_category::Model>, AppError> {
    let category = app_state
        .store
        .update_category(&id, &payload.name)
        .await
        .map_err(AppError::failed("Failed to save tag category"))?;
    Ok(Json(category))
}

/// Refused with 409 while tags still belong to the category.
async fn delete_category_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state
        .store
        .delete_category(&id)
        .await
        .map_err(AppError::failed("Failed to delete tag category"))?;
    Ok(StatusCode::NO_CONTENT)
}
