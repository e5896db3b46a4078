//! SeaORM entities for the catalog.
//!
//! Each table lives in its own module; `prelude` re-exports the entity,
//! model, active model and column types under table-specific names.

pub mod companion;
pub mod companion_tag;
pub mod password_reset;
pub mod tag;
pub mod tag_category;
pub mod user;
pub mod user_identity;
pub mod user_interaction;

pub mod prelude {
    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;
    pub use super::user::ActiveModel as UserActiveModel;
    pub use super::user::Column as UserColumn;

    pub use super::user_identity::Entity as UserIdentity;
    pub use super::user_identity::Model as UserIdentityModel;
    pub use super::user_identity::ActiveModel as UserIdentityActiveModel;
    pub use super::user_identity::Column as UserIdentityColumn;

    pub use super::password_reset::Entity as PasswordReset;
    pub use super::password_reset::Model as PasswordResetModel;
    pub use super::password_reset::ActiveModel as PasswordResetActiveModel;
    pub use super::password_reset::Column as PasswordResetColumn;

    pub use super::companion::Entity as Companion;
    pub use super::companion::Model as CompanionModel;
    pub use super::companion::ActiveModel as CompanionActiveModel;
    pub use super::companion::Column as CompanionColumn;

    pub use super::tag::Entity as Tag;
    pub use super::tag::Model as TagModel;
    pub use super::tag::ActiveModel as TagActiveModel;
    pub use super::tag::Column as TagColumn;

    pub use super::tag_category::Entity as TagCategory;
    pub use super::tag_category::Model as TagCategoryModel;
    pub use super::tag_category::ActiveModel as TagCategoryActiveModel;
    pub use super::tag_category::Column as TagCategoryColumn;

    pub use super::companion_tag::Entity as CompanionTag;
    pub use super::companion_tag::Model as CompanionTagModel;
    pub use super::companion_tag::ActiveModel as CompanionTagActiveModel;
    pub use super::companion_tag::Column as CompanionTagColumn;

    pub use super::user_interaction::Entity as UserInteraction;
    pub use super::user_interaction::Model as UserInteractionModel;
    pub use super::user_interaction::ActiveModel as UserInteractionActiveModel;
    pub use super::user_interaction::Column as UserInteractionColumn;
}
