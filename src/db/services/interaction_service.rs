use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::db::entities::{companion, prelude::*, user_interaction};
use crate::interactions::{CountDelta, InteractionCounts, InteractionState};

pub async fn get_interaction<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    companion_id: &str,
) -> Result<Option<InteractionState>, DbErr> {
    let row = UserInteraction::find_by_id((user_id.to_owned(), companion_id.to_owned()))
        .one(db)
        .await?;
    Ok(row.as_ref().map(InteractionState::from))
}

/// Inserts or overwrites the (user, companion) row with `state`.
pub async fn upsert_interaction_row<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    companion_id: &str,
    state: InteractionState,
) -> Result<(), DbErr> {
    let row = user_interaction::ActiveModel {
        user_id: Set(user_id.to_owned()),
        companion_id: Set(companion_id.to_owned()),
        liked: Set(state.liked),
        disliked: Set(state.disliked),
        starred: Set(state.starred),
        updated_at: Set(Utc::now()),
    };
    UserInteraction::insert(row)
        .on_conflict(
            OnConflict::columns([
                user_interaction::Column::UserId,
                user_interaction::Column::CompanionId,
            ])
            .update_columns([
                user_interaction::Column::Liked,
                user_interaction::Column::Disliked,
                user_interaction::Column::Starred,
                user_interaction::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Moves the companion's counters by `delta` in a single UPDATE so concurrent
/// writers never lose increments.
pub async fn apply_count_delta<C: ConnectionTrait>(
    db: &C,
    companion_id: &str,
    delta: CountDelta,
) -> Result<(), DbErr> {
    if delta.is_zero() {
        return Ok(());
    }
    let result = Companion::update_many()
        .col_expr(
            companion::Column::Likes,
            Expr::col(companion::Column::Likes).add(delta.likes),
        )
        .col_expr(
            companion::Column::Dislikes,
            Expr::col(companion::Column::Dislikes).add(delta.dislikes),
        )
        .col_expr(
            companion::Column::Stars,
            Expr::col(companion::Column::Stars).add(delta.stars),
        )
        .filter(companion::Column::Id.eq(companion_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DbErr::RecordNotFound(format!("Companion {companion_id}")));
    }
    Ok(())
}

pub async fn counts_for<C: ConnectionTrait>(
    db: &C,
    companion_id: &str,
) -> Result<InteractionCounts, DbErr> {
    let model = Companion::find_by_id(companion_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Companion {companion_id}")))?;
    Ok(InteractionCounts::from(&model))
}
