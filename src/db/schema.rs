use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::prelude::*;

/// Creates any missing table from the entity definitions. Safe to run on
/// every start; existing tables are left untouched.
pub async fn ensure_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    // Parents before children so foreign keys resolve.
    create_table(db, &schema, User).await?;
    create_table(db, &schema, UserIdentity).await?;
    create_table(db, &schema, PasswordReset).await?;
    create_table(db, &schema, TagCategory).await?;
    create_table(db, &schema, Tag).await?;
    create_table(db, &schema, Companion).await?;
    create_table(db, &schema, CompanionTag).await?;
    create_table(db, &schema, UserInteraction).await?;

    info!(backend = ?backend, "Database schema is ready.");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(db.get_database_backend().build(&statement)).await?;
    Ok(())
}
