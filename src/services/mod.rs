pub mod auth_service;
pub mod mailer;
pub mod oauth_service;

pub use auth_service::{AuthError, AuthProvider, LocalAuthProvider};
pub use mailer::{ResetMailer, WebhookMailer};
