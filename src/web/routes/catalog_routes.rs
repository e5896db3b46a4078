use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::catalog::{CatalogQuery, Paginator, SortKey, ThemeFilter, featured_view, main_view, newest_view};
use crate::web::{AppError, AppState, models::MaybeSession};

const FETCH_FAILED: &str = "Failed to fetch companions";

pub fn create_catalog_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_catalog))
        .route("/featured", get(list_featured))
        .route("/newest", get(list_newest))
        .route("/tags", get(list_tags))
        .route("/categories", get(list_categories))
        .route("/{id}", get(get_companion))
}

/// Query string of the main gallery. `tags` is a comma-separated id list,
/// `shown` is the counter the client currently displays, `key` is the
/// `query_key` of the view it came from and `more` asks for the next page.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    #[serde(default)]
    pub q: String,
    pub theme: Option<String>,
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub shown: Option<usize>,
    pub key: Option<String>,
    #[serde(default)]
    pub more: bool,
}

impl CatalogParams {
    fn to_query(&self) -> Result<CatalogQuery, AppError> {
        let theme = match &self.theme {
            Some(raw) => raw.parse::<ThemeFilter>().map_err(AppError::InvalidInput)?,
            None => ThemeFilter::All,
        };
        let sort = match &self.sort {
            Some(raw) => raw.parse::<SortKey>().map_err(AppError::InvalidInput)?,
            None => SortKey::default(),
        };
        let tag_ids = self
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .collect();
        Ok(CatalogQuery {
            text: self.q.trim().to_string(),
            theme,
            tag_ids,
            sort,
        })
    }
}

async fn list_catalog(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeSession,
    Query(params): Query<CatalogParams>,
) -> Result<Response, AppError> {
    let query = params.to_query()?;
    let settings = &app_state.config.catalog;
    let records = app_state
        .store
        .list_companions(viewer.user_id())
        .await
        .map_err(AppError::failed(FETCH_FAILED))?;

    let mut paginator = Paginator::resume(
        settings.page_size,
        params.shown.unwrap_or(0),
        params.key.as_deref(),
        query,
    )
    .with_delay(settings.show_more_delay());
    if params.more {
        let total = records.iter().filter(|record| paginator.query().matches(record)).count();
        paginator.show_more(total).await;
    }

    Ok(Json(main_view(&records, &paginator)).into_response())
}

async fn list_featured(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeSession,
) -> Result<Response, AppError> {
    let records = app_state
        .store
        .list_companions(viewer.user_id())
        .await
        .map_err(AppError::failed(FETCH_FAILED))?;
    Ok(Json(featured_view(&records)).into_response())
}

async fn list_newest(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeSession,
) -> Result<Response, AppError> {
    let records = app_state
        .store
        .list_companions(viewer.user_id())
        .await
        .map_err(AppError::failed(FETCH_FAILED))?;
    Ok(Json(newest_view(&records, app_state.config.catalog.newest_count)).into_response())
}

async fn get_companion(
    State(app_state): State<Arc<AppState>>,
    viewer: MaybeSession,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = app_state
        .store
        .get_companion(&id, viewer.user_id())
        .await
        .map_err(AppError::failed(FETCH_FAILED))?;
    Ok(Json(record))
}

async fn list_tags(State(app_state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let tags = app_state
        .store
        .list_tags()
        .await
        .map_err(AppError::failed("Failed to fetch tags"))?;
    Ok(Json(tags))
}

async fn list_categories(State(app_state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let categories = app_state
        .store
        .list_categories()
        .await
        .map_err(AppError::failed("Failed to fetch tag categories"))?;
    Ok(Json(categories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::CompanionTheme;

    #[test]
    fn params_become_a_query() {
        let params = CatalogParams {
            q: "  guru ".to_string(),
            theme: Some("fantasy".to_string()),
            tags: Some("t1, t2,,".to_string()),
            sort: Some("rating".to_string()),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.text, "guru");
        assert_eq!(query.theme, ThemeFilter::Only(CompanionTheme::Fantasy));
        assert_eq!(query.tag_ids.iter().map(String::as_str).collect::<Vec<_>>(), ["t1", "t2"]);
        assert_eq!(query.sort, SortKey::Rating);
    }

    #[test]
    fn missing_params_mean_defaults() {
        assert_eq!(CatalogParams::default().to_query().unwrap(), CatalogQuery::default());
    }

    #[test]
    fn unknown_sort_is_rejected() {
        let params = CatalogParams { sort: Some("random".to_string()), ..Default::default() };
        assert!(matches!(params.to_query(), Err(AppError::InvalidInput(_))));
    }
}
