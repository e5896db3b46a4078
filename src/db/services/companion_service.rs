//! Companion rows and their tag links.
//!
//! Functions take any `ConnectionTrait` so callers can run them on the pool or
//! inside a transaction they own.

use chrono::Utc;
use futures::try_join;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::entities::{
    companion, companion_tag, prelude::*, tag, user_interaction,
};
use crate::db::models::{self, CompanionDraft, CompanionRecord};
use crate::interactions::InteractionState;

/// Loads companions (all of them, or the one with `only_id`) together with
/// their tags and the viewer's interaction flags, newest first.
pub async fn load_records<C: ConnectionTrait>(
    db: &C,
    only_id: Option<&str>,
    viewer: Option<&str>,
) -> Result<Vec<CompanionRecord>, DbErr> {
    let mut companions_query = Companion::find()
        .order_by_desc(companion::Column::CreatedAt)
        .order_by_asc(companion::Column::Name);
    if let Some(id) = only_id {
        companions_query = companions_query.filter(companion::Column::Id.eq(id));
    }
    let companions = companions_query.all(db).await?;
    if companions.is_empty() {
        return Ok(Vec::new());
    }

    let companion_ids: Vec<String> = companions.iter().map(|c| c.id.clone()).collect();

    let links_future = CompanionTag::find()
        .filter(companion_tag::Column::CompanionId.is_in(companion_ids.clone()))
        .all(db);
    let tags_future = Tag::find()
        .find_also_related(TagCategory)
        .order_by_asc(tag::Column::Name)
        .all(db);
    let (links, tags) = try_join!(links_future, tags_future)?;

    let interactions = match viewer {
        Some(user_id) => {
            UserInteraction::find()
                .filter(user_interaction::Column::UserId.eq(user_id))
                .filter(user_interaction::Column::CompanionId.is_in(companion_ids))
                .all(db)
                .await?
        }
        None => Vec::new(),
    };

    let tags_by_id: HashMap<String, models::Tag> = tags
        .into_iter()
        .map(|pair| {
            let tag = models::Tag::from(pair);
            (tag.id.clone(), tag)
        })
        .collect();

    let mut tag_map: HashMap<String, Vec<models::Tag>> = HashMap::new();
    for link in links {
        if let Some(tag) = tags_by_id.get(&link.tag_id) {
            tag_map.entry(link.companion_id).or_default().push(tag.clone());
        }
    }

    let interaction_map: HashMap<String, InteractionState> = interactions
        .iter()
        .map(|row| (row.companion_id.clone(), InteractionState::from(row).normalized()))
        .collect();

    let records = companions
        .into_iter()
        .map(|companion| {
            let mut tags = tag_map.remove(&companion.id).unwrap_or_default();
            tags.sort_by(|a, b| a.name.cmp(&b.name));
            let user_interaction = interaction_map.get(&companion.id).copied();
            CompanionRecord {
                companion,
                tags,
                user_interaction,
            }
        })
        .collect();

    Ok(records)
}

/// Inserts a companion with zeroed counters and rating.
pub async fn create_companion<C: ConnectionTrait>(
    db: &C,
    draft: &CompanionDraft,
) -> Result<companion::Model, DbErr> {
    let now = Utc::now();
    let new_companion = companion::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(draft.name.trim().to_owned()),
        avatar: Set(draft.avatar.trim().to_owned()),
        description: Set(draft.description.trim().to_owned()),
        theme: Set(draft.theme),
        rating: Set(0.0),
        companion_link: Set(draft.companion_link.trim().to_owned()),
        conversations: Set(0),
        likes: Set(0),
        dislikes: Set(0),
        stars: Set(0),
        featured: Set(draft.featured),
        created_at: Set(now),
        updated_at: Set(now),
    };
    new_companion.insert(db).await
}

/// Rewrites the editable fields. Counters, rating and timestamps of creation
/// are left alone.
pub async fn update_companion<C: ConnectionTrait>(
    db: &C,
    id: &str,
    draft: &CompanionDraft,
) -> Result<companion::Model, DbErr> {
    let existing = Companion::find_by_id(id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Companion {id}")))?;

    let mut active = existing.into_active_model();
    active.name = Set(draft.name.trim().to_owned());
    active.avatar = Set(draft.avatar.trim().to_owned());
    active.description = Set(draft.description.trim().to_owned());
    active.companion_link = Set(draft.companion_link.trim().to_owned());
    active.theme = Set(draft.theme);
    active.featured = Set(draft.featured);
    active.updated_at = Set(Utc::now());
    active.update(db).await
}

/// Deletes a companion, its tag links and every interaction row against it.
/// Returns the number of companion rows removed (0 or 1).
pub async fn delete_companion<C: ConnectionTrait>(db: &C, id: &str) -> Result<u64, DbErr> {
    CompanionTag::delete_many()
        .filter(companion_tag::Column::CompanionId.eq(id))
        .exec(db)
        .await?;
    UserInteraction::delete_many()
        .filter(user_interaction::Column::CompanionId.eq(id))
        .exec(db)
        .await?;
    let result = Companion::delete_by_id(id.to_owned()).exec(db).await?;
    Ok(result.rows_affected)
}

/// Replaces every tag link of the companion with `tag_ids`. Run inside a
/// transaction so readers never see the empty in-between state.
pub async fn replace_companion_tags<C: ConnectionTrait>(
    db: &C,
    companion_id: &str,
    tag_ids: &[String],
) -> Result<(), DbErr> {
    CompanionTag::delete_many()
        .filter(companion_tag::Column::CompanionId.eq(companion_id))
        .exec(db)
        .await?;

    let mut unique: Vec<&String> = tag_ids.iter().collect();
    unique.sort();
    unique.dedup();
    if unique.is_empty() {
        return Ok(());
    }

    let links = unique.into_iter().map(|tag_id| companion_tag::ActiveModel {
        companion_id: Set(companion_id.to_owned()),
        tag_id: Set(tag_id.clone()),
    });
    CompanionTag::insert_many(links)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub async fn companion_exists<C: ConnectionTrait>(db: &C, id: &str) -> Result<bool, DbErr> {
    Ok(Companion::find_by_id(id.to_owned()).one(db).await?.is_some())
}

/// Takes a row lock on the companion (`SELECT .. FOR UPDATE`) so concurrent
/// interaction writes for it run one after another. Returns `false` when the
/// row does not exist. SQLite has no row locks and already serializes writers.
pub async fn lock_companion<C: ConnectionTrait>(txn: &C, id: &str) -> Result<bool, DbErr> {
    Ok(locking_select(id).one(txn).await?.is_some())
}

fn locking_select(id: &str) -> Select<Companion> {
    Companion::find_by_id(id.to_owned()).lock_exclusive()
}
