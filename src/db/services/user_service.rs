use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::db::entities::{password_reset, prelude::*, user, user_identity};
use crate::db::enums::UserRole;

// --- User Service Functions ---

/// Creates a new user. `password_hash` is `None` for accounts that only sign
/// in through a social provider.
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password_hash: Option<String>,
    role: UserRole,
) -> Result<user::Model, DbErr> {
    let now = Utc::now();
    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        email: Set(normalize_email(email)),
        password_hash: Set(password_hash),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
    };
    new_user.insert(db).await
}

pub async fn get_user_by_id<C: ConnectionTrait>(db: &C, id: &str) -> Result<Option<user::Model>, DbErr> {
    User::find_by_id(id.to_owned()).one(db).await
}

pub async fn get_user_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
}

pub async fn update_password_hash<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    password_hash: String,
) -> Result<user::Model, DbErr> {
    let existing = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("User {user_id}")))?;
    let mut active = existing.into_active_model();
    active.password_hash = Set(Some(password_hash));
    active.updated_at = Set(Utc::now());
    active.update(db).await
}

/// Emails are compared case-insensitively and without surrounding spaces.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// --- Social Identity Functions ---

pub async fn find_identity<C: ConnectionTrait>(
    db: &C,
    provider_name: &str,
    provider_user_id: &str,
) -> Result<Option<user_identity::Model>, DbErr> {
    UserIdentity::find_by_id((provider_name.to_owned(), provider_user_id.to_owned()))
        .one(db)
        .await
}

pub async fn link_identity<C: ConnectionTrait>(
    db: &C,
    provider_name: &str,
    provider_user_id: &str,
    user_id: &str,
) -> Result<user_identity::Model, DbErr> {
    let identity = user_identity::ActiveModel {
        provider_name: Set(provider_name.to_owned()),
        provider_user_id: Set(provider_user_id.to_owned()),
        user_id: Set(user_id.to_owned()),
        created_at: Set(Utc::now()),
    };
    identity.insert(db).await
}

// --- Password Reset Functions ---

pub async fn create_password_reset<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    secret_hash: String,
    expires_at: DateTime<Utc>,
) -> Result<password_reset::Model, DbErr> {
    let reset = password_reset::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_owned()),
        secret_hash: Set(secret_hash),
        expires_at: Set(expires_at),
        consumed: Set(false),
        created_at: Set(Utc::now()),
    };
    reset.insert(db).await
}

pub async fn get_password_reset<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> Result<Option<password_reset::Model>, DbErr> {
    PasswordReset::find_by_id(id.to_owned()).one(db).await
}

pub async fn consume_password_reset<C: ConnectionTrait>(
    db: &C,
    reset: password_reset::Model,
) -> Result<password_reset::Model, DbErr> {
    let mut active = reset.into_active_model();
    active.consumed = Set(true);
    active.update(db).await
}
