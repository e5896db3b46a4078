use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Style classification shown as a badge on every companion card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "companion_theme_enum")]
#[serde(rename_all = "lowercase")]
pub enum CompanionTheme {
    #[sea_orm(string_value = "professional")]
    Professional,
    #[sea_orm(string_value = "casual")]
    Casual,
    #[sea_orm(string_value = "fantasy")]
    Fantasy,
}

impl CompanionTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanionTheme::Professional => "professional",
            CompanionTheme::Casual => "casual",
            CompanionTheme::Fantasy => "fantasy",
        }
    }
}

impl fmt::Display for CompanionTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompanionTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(CompanionTheme::Professional),
            "casual" => Ok(CompanionTheme::Casual),
            "fantasy" => Ok(CompanionTheme::Fantasy),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "user_role_enum")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "user")]
    User,
}

impl UserRole {
    /// Where a signed-in user lands when a route does not admit their role.
    pub fn landing_path(&self) -> &'static str {
        match self {
            UserRole::Admin => "/admin",
            UserRole::User => "/dashboard",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => f.write_str("admin"),
            UserRole::User => f.write_str("user"),
        }
    }
}
