//! The current-session context: one observable value shared by whoever needs
//! to know who is signed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::db::enums::UserRole;
use crate::db::models::UserProfile;
use crate::services::auth_service::{AuthError, AuthProvider};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.user.role
    }
}

/// Cloneable handle over a `watch` channel. Clones observe the same session.
#[derive(Clone, Debug)]
pub struct SessionContext {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn signed_in(session: Session) -> Self {
        let context = Self::new();
        context.set(Some(session));
        context
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn role(&self) -> Option<UserRole> {
        self.tx.borrow().as_ref().map(Session::role)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub fn set(&self, session: Option<Session>) {
        self.tx.send_replace(session);
    }

    /// Ends the current session with the provider, then clears the context.
    /// Subscribers see `None` afterwards.
    pub async fn sign_out(&self, auth: &dyn AuthProvider) -> Result<(), AuthError> {
        if let Some(session) = self.current() {
            auth.sign_out(&session).await?;
            debug!(user_id = %session.user.id, "Session context cleared.");
        }
        self.set(None);
        Ok(())
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn session_for(user_id: &str, role: UserRole) -> Session {
        let now = Utc::now();
        Session {
            access_token: format!("token-{user_id}"),
            expires_at: now + chrono::Duration::hours(1),
            user: UserProfile {
                id: user_id.to_string(),
                email: format!("{user_id}@example.com"),
                role,
                created_at: now,
                updated_at: now,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::session_for;
    use super::*;

    #[tokio::test]
    async fn subscribers_see_session_changes() {
        let context = SessionContext::new();
        let mut rx = context.subscribe();
        assert!(rx.borrow().is_none());

        context.set(Some(session_for("u1", UserRole::User)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|s| s.user.id.clone()), Some("u1".to_string()));

        context.set(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn clones_share_state() {
        let context = SessionContext::new();
        let clone = context.clone();
        context.set(Some(session_for("admin-1", UserRole::Admin)));
        assert_eq!(clone.role(), Some(UserRole::Admin));
    }
}
