use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::db::entities::{companion, tag, tag_category, user};
use crate::db::enums::{CompanionTheme, UserRole};
use crate::interactions::InteractionState;

/// A tag joined with the category it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub category: Option<tag_category::Model>,
}

impl From<(tag::Model, Option<tag_category::Model>)> for Tag {
    fn from((tag, category): (tag::Model, Option<tag_category::Model>)) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            category_id: tag.category_id,
            created_at: tag.created_at,
            category,
        }
    }
}

/// A companion as the gallery sees it: the stored row, its tags and the
/// current viewer's interaction flags (absent for anonymous viewers or when
/// the viewer never interacted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionRecord {
    #[serde(flatten)]
    pub companion: companion::Model,
    pub tags: Vec<Tag>,
    pub user_interaction: Option<InteractionState>,
}

impl CompanionRecord {
    pub fn id(&self) -> &str {
        &self.companion.id
    }
}

/// Identity projection handed out with every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// --- Admin form payloads ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionDraft {
    pub name: String,
    pub avatar: String,
    pub description: String,
    pub companion_link: String,
    pub theme: CompanionTheme,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CompanionDraft {
    /// Checks the mandatory free-text and URI fields. Tag ids are checked
    /// against the store separately.
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.avatar.trim().is_empty() {
            missing.push("avatar");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.companion_link.trim().is_empty() {
            missing.push("companion_link");
        }
        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }
        validate_http_url("avatar", &self.avatar)?;
        validate_http_url("companion_link", &self.companion_link)?;
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value.trim()).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("{field} must use http or https, not '{scheme}'")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagDraft {
    pub name: String,
    pub category_id: String,
}

impl TagDraft {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Tag name is required".to_string());
        }
        if self.category_id.trim().is_empty() {
            return Err("Tag category is required".to_string());
        }
        Ok(())
    }
}
