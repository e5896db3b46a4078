use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tag_category::Entity",
        from = "Column::CategoryId",
        to = "super::tag_category::Column::Id",
        on_delete = "Restrict",
        on_update = "Cascade"
    )]
    Category,

    #[sea_orm(has_many = "super::companion_tag::Entity")]
    CompanionTags,
}

impl Related<super::tag_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::companion_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompanionTags.def()
    }
}

impl Related<super::companion::Entity> for Entity {
    fn to() -> RelationDef {
        super::companion_tag::Relation::Companion.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::companion_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
