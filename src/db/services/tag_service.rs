use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::db::entities::{companion_tag, prelude::*, tag, tag_category};
use crate::db::models::{self, TagDraft};

// --- Tag Service Functions ---

/// All tags joined with their category, ordered by name.
pub async fn list_tags<C: ConnectionTrait>(db: &C) -> Result<Vec<models::Tag>, DbErr> {
    let rows = Tag::find()
        .find_also_related(TagCategory)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(models::Tag::from).collect())
}

pub async fn get_tag<C: ConnectionTrait>(db: &C, id: &str) -> Result<Option<models::Tag>, DbErr> {
    let row = Tag::find_by_id(id.to_owned())
        .find_also_related(TagCategory)
        .one(db)
        .await?;
    Ok(row.map(models::Tag::from))
}

/// Ids from `tag_ids` that do not name an existing tag.
pub async fn missing_tag_ids<C: ConnectionTrait>(
    db: &C,
    tag_ids: &[String],
) -> Result<Vec<String>, DbErr> {
    if tag_ids.is_empty() {
        return Ok(Vec::new());
    }
    let found: Vec<String> = Tag::find()
        .filter(tag::Column::Id.is_in(tag_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    let mut missing: Vec<String> = tag_ids
        .iter()
        .filter(|id| !found.contains(id))
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();
    Ok(missing)
}

pub async fn create_tag<C: ConnectionTrait>(db: &C, draft: &TagDraft) -> Result<tag::Model, DbErr> {
    let new_tag = tag::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(draft.name.trim().to_owned()),
        category_id: Set(draft.category_id.clone()),
        created_at: Set(Utc::now()),
    };
    new_tag.insert(db).await
}

pub async fn update_tag<C: ConnectionTrait>(
    db: &C,
    id: &str,
    draft: &TagDraft,
) -> Result<tag::Model, DbErr> {
    let existing = Tag::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Tag {id}")))?;
    let mut active = existing.into_active_model();
    active.name = Set(draft.name.trim().to_owned());
    active.category_id = Set(draft.category_id.clone());
    active.update(db).await
}

/// Deletes a tag and detaches it from every companion. Returns the number of
/// tag rows removed.
pub async fn delete_tag<C: ConnectionTrait>(db: &C, id: &str) -> Result<u64, DbErr> {
    CompanionTag::delete_many()
        .filter(companion_tag::Column::TagId.eq(id))
        .exec(db)
        .await?;
    let result = Tag::delete_by_id(id.to_owned()).exec(db).await?;
    Ok(result.rows_affected)
}

// --- Tag Category Service Functions ---

pub async fn list_categories<C: ConnectionTrait>(db: &C) -> Result<Vec<tag_category::Model>, DbErr> {
    TagCategory::find()
        .order_by_asc(tag_category::Column::Name)
        .all(db)
        .await
}

pub async fn get_category<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<Option<tag_category::Model>, DbErr> {
    TagCategory::find_by_id(id.to_owned()).one(db).await
}

pub async fn create_category<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<tag_category::Model, DbErr> {
    let category = tag_category::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name.trim().to_owned()),
        created_at: Set(Utc::now()),
    };
    category.insert(db).await
}

pub async fn rename_category<C: ConnectionTrait>(
    db: &C,
    id: &str,
    name: &str,
) -> Result<tag_category::Model, DbErr> {
    let existing = get_category(db, id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Tag category {id}")))?;
    let mut active = existing.into_active_model();
    active.name = Set(name.trim().to_owned());
    active.update(db).await
}

/// Number of tags still filed under the category.
pub async fn count_tags_in_category<C: ConnectionTrait>(db: &C, id: &str) -> Result<u64, DbErr> {
    Tag::find()
        .filter(tag::Column::CategoryId.eq(id))
        .count(db)
        .await
}

pub async fn delete_category<C: ConnectionTrait>(db: &C, id: &str) -> Result<u64, DbErr> {
    let result = TagCategory::delete_by_id(id.to_owned()).exec(db).await?;
    Ok(result.rows_affected)
}
