use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use reqwest::Client;
use sea_orm::{DatabaseConnection, DbErr, SqlErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::mailer::{ResetMailer, ResetMessage};
use super::oauth_service::{self, ProviderIdentity, PublicProviderInfo};
use crate::db::entities::user;
use crate::db::enums::UserRole;
use crate::db::services::user_service;
use crate::server::config::ServerConfig;
use crate::session::Session;

pub const MIN_PASSWORD_LENGTH: usize = 8;

const UNVERIFIED_EMAIL_TAKEN: &str =
    "This email belongs to an existing account. Sign in with your password instead.";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Reset token is invalid or has expired")]
    InvalidResetToken,
    #[error("Unknown sign-in provider '{0}'")]
    UnknownProvider(String),
    #[error("Sign-in provider error: {0}")]
    Provider(String),
    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// JWT payload. `sub` is the user id.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

/// Everything the service needs from an identity backend.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Sends a reset link when the email belongs to an account. Unknown
    /// emails succeed silently.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), AuthError>;

    fn social_providers(&self) -> Vec<PublicProviderInfo>;

    fn social_authorize_url(&self, provider: &str, state: &str) -> Result<String, AuthError>;

    async fn sign_in_with_provider(&self, provider: &str, code: &str) -> Result<Session, AuthError>;

    /// `Ok(None)` for expired, forged or orphaned tokens.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Email/password accounts with bcrypt hashes and HS256 JWTs, stored in the
/// catalog database, plus the configured OAuth2 providers.
pub struct LocalAuthProvider {
    db: DatabaseConnection,
    config: Arc<ServerConfig>,
    mailer: Arc<dyn ResetMailer>,
    http: Client,
    hash_cost: u32,
}

impl LocalAuthProvider {
    pub fn new(db: DatabaseConnection, config: Arc<ServerConfig>, mailer: Arc<dyn ResetMailer>) -> Self {
        Self {
            db,
            config,
            mailer,
            http: Client::new(),
            hash_cost: DEFAULT_COST,
        }
    }

    /// Overrides the bcrypt cost. Tests use `4 /* bcrypt minimum cost; bcrypt::MIN_COST is private */`.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    fn issue_session(&self, user: user::Model) -> Result<Session, AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.token_ttl_hours);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?;

        Ok(Session {
            access_token: token,
            expires_at,
            user: user.into(),
        })
    }

    fn role_for(&self, email: &str) -> UserRole {
        if self.config.is_admin_email(email) {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    /// Signs in the owner of a provider identity. An unknown identity is
    /// linked to the account with the same email when the provider verified
    /// that email, or to a new account.
    pub async fn sign_in_with_identity(
        &self,
        provider: &str,
        identity: ProviderIdentity,
    ) -> Result<Session, AuthError> {
        if let Some(link) =
            user_service::find_identity(&self.db, provider, &identity.provider_user_id).await?
        {
            let user = user_service::get_user_by_id(&self.db, &link.user_id)
                .await?
                .ok_or(AuthError::InvalidCredentials)?;
            info!(user_id = %user.id, provider, "Signed in with provider.");
            return self.issue_session(user);
        }

        let email = identity
            .email
            .ok_or_else(|| AuthError::Provider("The provider did not share an email address.".to_string()))?;

        let txn = self.db.begin().await?;
        let user = match user_service::get_user_by_email(&txn, &email).await? {
            Some(existing) if identity.email_verified => existing,
            Some(existing) => {
                warn!(user_id = %existing.id, provider, "Refused to link an unverified provider email.");
                return Err(AuthError::Provider(UNVERIFIED_EMAIL_TAKEN.to_string()));
            }
            None => {
                let created = user_service::create_user(&txn, &email, None, self.role_for(&email)).await?;
                info!(user_id = %created.id, provider, "Created account from provider sign-in.");
                created
            }
        };
        user_service::link_identity(&txn, provider, &identity.provider_user_id, &user.id).await?;
        txn.commit().await?;

        info!(user_id = %user.id, provider, "Linked provider identity.");
        self.issue_session(user)
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::InvalidInput("A valid email address is required.".to_string())),
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    Ok(())
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("Email and password are required.".to_string()));
        }

        let user = user_service::get_user_by_email(&self.db, email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = user.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;

        if !verify(password, password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "Signed in with password.");
        self.issue_session(user)
    }

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_email(email)?;
        validate_password(password)?;

        if user_service::get_user_by_email(&self.db, email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash(password, self.hash_cost)?;
        let user = user_service::create_user(&self.db, email, Some(password_hash), self.role_for(email))
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AuthError::EmailTaken,
                _ => AuthError::Database(e),
            })?;

        info!(user_id = %user.id, role = %user.role, "Account created.");
        self.issue_session(user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;

        let Some(user) = user_service::get_user_by_email(&self.db, email).await? else {
            debug!("Password reset requested for an unknown email.");
            return Ok(());
        };

        let secret = random_secret();
        let expires_at = Utc::now() + Duration::minutes(self.config.password_reset.ttl_minutes);
        let reset = user_service::create_password_reset(
            &self.db,
            &user.id,
            hash(&secret, self.hash_cost)?,
            expires_at,
        )
        .await?;

        let token = format!("{}.{}", reset.id, secret);
        let message = ResetMessage {
            email: user.email.clone(),
            reset_url: format!(
                "{}/reset-password?token={}",
                self.config.frontend_url.trim_end_matches('/'),
                urlencoding::encode(&token)
            ),
            token,
            expires_at,
        };
        // The caller sees the same answer as for an unknown email either way.
        match self.mailer.send_reset(&message).await {
            Ok(()) => info!(user_id = %user.id, "Password reset issued."),
            Err(e) => error!(user_id = %user.id, error = %e, "Failed to deliver password reset."),
        }
        Ok(())
    }

    async fn confirm_password_reset(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let (reset_id, secret) = token.split_once('.').ok_or(AuthError::InvalidResetToken)?;
        let reset = user_service::get_password_reset(&self.db, reset_id)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        if reset.consumed || reset.expires_at < Utc::now() {
            return Err(AuthError::InvalidResetToken);
        }
        if !verify(secret, &reset.secret_hash)? {
            warn!(reset_id, "Password reset attempted with a wrong secret.");
            return Err(AuthError::InvalidResetToken);
        }

        let password_hash = hash(new_password, self.hash_cost)?;
        let user_id = reset.user_id.clone();

        let txn = self.db.begin().await?;
        user_service::update_password_hash(&txn, &user_id, password_hash).await?;
        user_service::consume_password_reset(&txn, reset).await?;
        txn.commit().await?;

        info!(user_id = %user_id, "Password reset completed.");
        Ok(())
    }

    fn social_providers(&self) -> Vec<PublicProviderInfo> {
        self.config.oauth_providers.iter().map(oauth_service::public_info).collect()
    }

    fn social_authorize_url(&self, provider: &str, state: &str) -> Result<String, AuthError> {
        let provider_config = self
            .config
            .oauth_provider(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;
        let redirect_uri = oauth_service::redirect_uri(&self.config.frontend_url, provider);
        Ok(oauth_service::authorize_url(provider_config, &redirect_uri, state))
    }

    async fn sign_in_with_provider(&self, provider: &str, code: &str) -> Result<Session, AuthError> {
        let provider_config = self
            .config
            .oauth_provider(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;
        let redirect_uri = oauth_service::redirect_uri(&self.config.frontend_url, provider);

        let token_response =
            oauth_service::exchange_code_for_token(&self.http, provider_config, code, &redirect_uri).await?;
        let user_info =
            oauth_service::get_user_info(&self.http, provider_config, &token_response.access_token).await?;
        let identity = oauth_service::extract_identity(provider_config, &user_info)?;

        self.sign_in_with_identity(provider, identity).await
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_ref()),
            &Validation::default(),
        ) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "Rejected session token.");
                return Ok(None);
            }
        };

        let Some(user) = user_service::get_user_by_id(&self.db, &data.claims.sub).await? else {
            return Ok(None);
        };
        let expires_at = DateTime::from_timestamp(data.claims.exp as i64, 0).unwrap_or_else(Utc::now);

        Ok(Some(Session {
            access_token: token.to_string(),
            expires_at,
            user: user.into(),
        }))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        // Tokens are stateless; the client drops its copy.
        info!(user_id = %session.user.id, "Session ended.");
        Ok(())
    }
}
