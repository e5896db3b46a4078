//! Data-access capability used by every other layer. Handlers, the
//! interaction controller and tests only see [`CatalogStore`]; the SeaORM
//! implementation is the single concrete backend.

use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::db::entities::tag_category;
use crate::db::models::{CompanionDraft, CompanionRecord, Tag, TagDraft};
use crate::interactions::{InteractionCounts, InteractionState};

mod sea_orm_store;

pub use sea_orm_store::SeaOrmCatalogStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Database error: {0}")]
    Database(DbErr),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => StoreError::Conflict(detail),
            _ => match err {
                DbErr::RecordNotFound(what) => StoreError::NotFound(what),
                other => StoreError::Database(other),
            },
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- companions ---

    /// Every companion with its tags, newest first. `viewer` joins that
    /// user's interaction flags.
    async fn list_companions(&self, viewer: Option<&str>) -> Result<Vec<CompanionRecord>, StoreError>;

    async fn get_companion(&self, id: &str, viewer: Option<&str>) -> Result<CompanionRecord, StoreError>;

    async fn insert_companion(&self, draft: &CompanionDraft) -> Result<CompanionRecord, StoreError>;

    /// Rewrites the editable fields and replaces the tag set.
    async fn update_companion(&self, id: &str, draft: &CompanionDraft) -> Result<CompanionRecord, StoreError>;

    /// Removes the companion together with its tag links and interactions.
    async fn delete_companion(&self, id: &str) -> Result<(), StoreError>;

    /// Atomically replaces the companion's tag links with `tag_ids`.
    async fn replace_companion_tags(&self, companion_id: &str, tag_ids: &[String]) -> Result<(), StoreError>;

    // --- tags and categories ---

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;

    async fn insert_tag(&self, draft: &TagDraft) -> Result<Tag, StoreError>;

    async fn update_tag(&self, id: &str, draft: &TagDraft) -> Result<Tag, StoreError>;

    async fn delete_tag(&self, id: &str) -> Result<(), StoreError>;

    async fn list_categories(&self) -> Result<Vec<tag_category::Model>, StoreError>;

    async fn insert_category(&self, name: &str) -> Result<tag_category::Model, StoreError>;

    async fn update_category(&self, id: &str, name: &str) -> Result<tag_category::Model, StoreError>;

    async fn delete_category(&self, id: &str) -> Result<(), StoreError>;

    // --- interactions ---

    async fn get_interaction(&self, user_id: &str, companion_id: &str) -> Result<Option<InteractionState>, StoreError>;

    /// Writes the full triple for (user, companion), overwriting any earlier
    /// row, and moves the companion's counters by the difference. Returns the
    /// companion's counters after the write.
    async fn upsert_interaction(
        &self,
        user_id: &str,
        companion_id: &str,
        state: InteractionState,
    ) -> Result<InteractionCounts, StoreError>;
}
