use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::CompanionTheme;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub theme: CompanionTheme,
    pub rating: f64,
    pub companion_link: String,
    pub conversations: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub stars: i64,
    pub featured: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::companion_tag::Entity")]
    CompanionTags,

    #[sea_orm(has_many = "super::user_interaction::Entity")]
    Interactions,
}

impl Related<super::companion_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompanionTags.def()
    }
}

impl Related<super::user_interaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Interactions.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::companion_tag::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::companion_tag::Relation::Companion.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
