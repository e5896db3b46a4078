use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// Transient, dismissable message for the user. Never carries low-level
/// diagnostic detail; that goes to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    /// `action` names what failed, e.g. "Failed to save companion".
    pub fn failure(action: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: action.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    pub fn sign_in_required() -> Self {
        Self {
            title: "Sign in required".to_string(),
            description: "Please sign in to interact with companions".to_string(),
            variant: NoticeVariant::Destructive,
        }
    }
}
