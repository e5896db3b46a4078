use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info};

use super::{CatalogStore, StoreError};
use crate::db::entities::tag_category;
use crate::db::models::{CompanionDraft, CompanionRecord, Tag, TagDraft};
use crate::db::services::{companion_service, interaction_service, tag_service};
use crate::interactions::{CountDelta, InteractionCounts, InteractionState};

/// [`CatalogStore`] backed by a SeaORM connection pool (Postgres in
/// production, SQLite in tests).
#[derive(Clone, Debug)]
pub struct SeaOrmCatalogStore {
    db: DatabaseConnection,
}

impl SeaOrmCatalogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn check_tag_ids(&self, tag_ids: &[String]) -> Result<(), StoreError> {
        let missing = tag_service::missing_tag_ids(&self.db, tag_ids).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Invalid(format!("Unknown tags: {}", missing.join(", "))))
        }
    }

    async fn check_category(&self, category_id: &str) -> Result<(), StoreError> {
        match tag_service::get_category(&self.db, category_id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::Invalid(format!("Unknown tag category: {category_id}"))),
        }
    }
}

#[async_trait]
impl CatalogStore for SeaOrmCatalogStore {
    async fn list_companions(&self, viewer: Option<&str>) -> Result<Vec<CompanionRecord>, StoreError> {
        let records = companion_service::load_records(&self.db, None, viewer).await?;
        debug!(count = records.len(), "Loaded companions.");
        Ok(records)
    }

    async fn get_companion(&self, id: &str, viewer: Option<&str>) -> Result<CompanionRecord, StoreError> {
        companion_service::load_records(&self.db, Some(id), viewer)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("Companion {id}")))
    }

    async fn insert_companion(&self, draft: &CompanionDraft) -> Result<CompanionRecord, StoreError> {
        draft.validate().map_err(StoreError::Invalid)?;
        self.check_tag_ids(&draft.tags).await?;

        let txn = self.db.begin().await?;
        let created = companion_service::create_companion(&txn, draft).await?;
        companion_service::replace_companion_tags(&txn, &created.id, &draft.tags).await?;
        txn.commit().await?;

        info!(companion_id = %created.id, name = %created.name, "Companion created.");
        self.get_companion(&created.id, None).await
    }

    async fn update_companion(&self, id: &str, draft: &CompanionDraft) -> Result<CompanionRecord, StoreError> {
        draft.validate().map_err(StoreError::Invalid)?;
        self.check_tag_ids(&draft.tags).await?;

        let txn = self.db.begin().await?;
        let updated = companion_service::update_companion(&txn, id, draft).await?;
        companion_service::replace_companion_tags(&txn, &updated.id, &draft.tags).await?;
        txn.commit().await?;

        info!(companion_id = %id, "Companion updated.");
        self.get_companion(id, None).await
    }

    async fn delete_companion(&self, id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let removed = companion_service::delete_companion(&txn, id).await?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("Companion {id}")));
        }
        txn.commit().await?;
        info!(companion_id = %id, "Companion deleted.");
        Ok(())
    }

    async fn replace_companion_tags(&self, companion_id: &str, tag_ids: &[String]) -> Result<(), StoreError> {
        if !companion_service::companion_exists(&self.db, companion_id).await? {
            return Err(StoreError::NotFound(format!("Companion {companion_id}")));
        }
        self.check_tag_ids(tag_ids).await?;

        let txn = self.db.begin().await?;
        companion_service::replace_companion_tags(&txn, companion_id, tag_ids).await?;
        txn.commit().await?;
        debug!(companion_id, tag_count = tag_ids.len(), "Companion tags replaced.");
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        Ok(tag_service::list_tags(&self.db).await?)
    }

    async fn insert_tag(&self, draft: &TagDraft) -> Result<Tag, StoreError> {
        draft.validate().map_err(StoreError::Invalid)?;
        self.check_category(&draft.category_id).await?;
        let created = tag_service::create_tag(&self.db, draft).await?;
        info!(tag_id = %created.id, name = %created.name, "Tag created.");
        tag_service::get_tag(&self.db, &created.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Tag {}", created.id)))
    }

    async fn update_tag(&self, id: &str, draft: &TagDraft) -> Result<Tag, StoreError> {
        draft.validate().map_err(StoreError::Invalid)?;
        self.check_category(&draft.category_id).await?;
        tag_service::update_tag(&self.db, id, draft).await?;
        tag_service::get_tag(&self.db, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Tag {id}")))
    }

    async fn delete_tag(&self, id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let removed = tag_service::delete_tag(&txn, id).await?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("Tag {id}")));
        }
        txn.commit().await?;
        info!(tag_id = %id, "Tag deleted.");
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<tag_category::Model>, StoreError> {
        Ok(tag_service::list_categories(&self.db).await?)
    }

    async fn insert_category(&self, name: &str) -> Result<tag_category::Model, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Invalid("Category name is required".to_string()));
        }
        let created = tag_service::create_category(&self.db, name).await?;
        info!(category_id = %created.id, name = %created.name, "Tag category created.");
        Ok(created)
    }

    async fn update_category(&self, id: &str, name: &str) -> Result<tag_category::Model, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Invalid("Category name is required".to_string()));
        }
        Ok(tag_service::rename_category(&self.db, id, name).await?)
    }

    async fn delete_category(&self, id: &str) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let tags_left = tag_service::count_tags_in_category(&txn, id).await?;
        if tags_left > 0 {
            return Err(StoreError::Conflict(format!(
                "Tag category {id} still has {tags_left} tag(s)"
            )));
        }
        let removed = tag_service::delete_category(&txn, id).await?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("Tag category {id}")));
        }
        txn.commit().await?;
        info!(category_id = %id, "Tag category deleted.");
        Ok(())
    }

    async fn get_interaction(&self, user_id: &str, companion_id: &str) -> Result<Option<InteractionState>, StoreError> {
        Ok(interaction_service::get_interaction(&self.db, user_id, companion_id).await?)
    }

    async fn upsert_interaction(
        &self,
        user_id: &str,
        companion_id: &str,
        state: InteractionState,
    ) -> Result<InteractionCounts, StoreError> {
        let state = state.normalized();

        let txn = self.db.begin().await?;
        // Held until commit: `before` and the counter delta must not interleave
        // with another writer on the same companion.
        if !companion_service::lock_companion(&txn, companion_id).await? {
            return Err(StoreError::NotFound(format!("Companion {companion_id}")));
        }
        let before = interaction_service::get_interaction(&txn, user_id, companion_id)
            .await?
            .unwrap_or_default();
        let delta = CountDelta::between(before, state);

        interaction_service::apply_count_delta(&txn, companion_id, delta).await?;
        interaction_service::upsert_interaction_row(&txn, user_id, companion_id, state).await?;
        let counts = interaction_service::counts_for(&txn, companion_id).await?;
        txn.commit().await?;

        debug!(user_id, companion_id, ?state, ?counts, "Interaction saved.");
        Ok(counts)
    }
}
