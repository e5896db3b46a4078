use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{DEFAULT_NEWEST_COUNT, DEFAULT_PAGE_SIZE, DEFAULT_SHOW_MORE_DELAY};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub page_size: usize,
    pub newest_count: usize,
    pub show_more_delay_ms: u64,
}

impl CatalogSettings {
    pub fn show_more_delay(&self) -> Duration {
        Duration::from_millis(self.show_more_delay_ms)
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            newest_count: DEFAULT_NEWEST_COUNT,
            show_more_delay_ms: DEFAULT_SHOW_MORE_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetSettings {
    pub ttl_minutes: i64,
    /// Where reset mails are POSTed. Without it requests are accepted and
    /// nothing is delivered.
    pub webhook_url: Option<String>,
    /// Tera template for the message body. Sees `email`, `token`, `reset_url`
    /// and `expires_at`.
    pub body_template: Option<String>,
}

impl Default for PasswordResetSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            webhook_url: None,
            body_template: None,
        }
    }
}

/// One OAuth2 authorization-code provider.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OAuthProviderConfig {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub user_info_url: String,
    #[serde(default)]
    pub scopes: Option<String>,
    /// Field of the user-info document holding the provider's user id.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_email_field")]
    pub email_field: String,
    /// Boolean field telling whether the provider verified the email. Without
    /// it, provider emails are never used to link an existing account.
    #[serde(default)]
    pub email_verified_field: Option<String>,
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_email_field() -> String {
    "email".to_string()
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub log_dir: String,
    pub token_ttl_hours: i64,
    /// Sign-ups with these emails get the admin role.
    pub admin_emails: Vec<String>,
    pub catalog: CatalogSettings,
    pub password_reset: PasswordResetSettings,
    pub oauth_providers: Vec<OAuthProviderConfig>,
}

// Partial configs for layering. The file may nest sections; the environment
// is flat.
#[derive(Deserialize, Default, Debug)]
struct PartialFileConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    frontend_url: Option<String>,
    log_dir: Option<String>,
    token_ttl_hours: Option<i64>,
    admin_emails: Option<Vec<String>>,
    #[serde(default)]
    catalog: PartialCatalog,
    #[serde(default)]
    password_reset: PartialPasswordReset,
    #[serde(default)]
    oauth_providers: Vec<OAuthProviderConfig>,
}

#[derive(Deserialize, Default, Debug)]
struct PartialCatalog {
    page_size: Option<usize>,
    newest_count: Option<usize>,
    show_more_delay_ms: Option<u64>,
}

#[derive(Deserialize, Default, Debug)]
struct PartialPasswordReset {
    ttl_minutes: Option<i64>,
    webhook_url: Option<String>,
    body_template: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
struct PartialEnvConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    frontend_url: Option<String>,
    log_dir: Option<String>,
    token_ttl_hours: Option<i64>,
    admin_emails: Option<Vec<String>>,
    catalog_page_size: Option<usize>,
    catalog_newest_count: Option<usize>,
    catalog_show_more_delay_ms: Option<u64>,
    password_reset_ttl_minutes: Option<i64>,
    password_reset_webhook_url: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl ServerConfig {
    /// Minimal configuration with defaults for everything optional.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            frontend_url: default_frontend_url(),
            log_dir: default_log_dir(),
            token_ttl_hours: 24,
            admin_emails: Vec::new(),
            catalog: CatalogSettings::default(),
            password_reset: PasswordResetSettings::default(),
            oauth_providers: Vec::new(),
        }
    }

    /// Reads the optional TOML file, then the environment (after `.env`).
    /// Environment values override the file.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_contents = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                Some((path_str.to_string(), contents))
            }
            _ => None,
        };

        Self::from_sources(
            file_contents.as_ref().map(|(path, contents)| (path.as_str(), contents.as_str())),
            std::env::vars(),
        )
    }

    /// Builds the configuration from a `(path, contents)` TOML source and
    /// environment pairs.
    pub fn from_sources<I>(file: Option<(&str, &str)>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. File
        let file_config: PartialFileConfig = match file {
            Some((path, contents)) => toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?,
            None => PartialFileConfig::default(),
        };

        // 2. Environment
        let env_config: PartialEnvConfig = envy::from_iter(env)?;

        // 3. Merge: environment overrides file
        let catalog_defaults = CatalogSettings::default();
        let reset_defaults = PasswordResetSettings::default();

        let config = ServerConfig {
            listen_addr: env_config
                .listen_addr
                .or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: env_config
                .jwt_secret
                .or(file_config.jwt_secret)
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            frontend_url: env_config
                .frontend_url
                .or(file_config.frontend_url)
                .unwrap_or_else(default_frontend_url),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            token_ttl_hours: env_config
                .token_ttl_hours
                .or(file_config.token_ttl_hours)
                .unwrap_or(24),
            admin_emails: env_config
                .admin_emails
                .or(file_config.admin_emails)
                .unwrap_or_default()
                .into_iter()
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
            catalog: CatalogSettings {
                page_size: env_config
                    .catalog_page_size
                    .or(file_config.catalog.page_size)
                    .unwrap_or(catalog_defaults.page_size),
                newest_count: env_config
                    .catalog_newest_count
                    .or(file_config.catalog.newest_count)
                    .unwrap_or(catalog_defaults.newest_count),
                show_more_delay_ms: env_config
                    .catalog_show_more_delay_ms
                    .or(file_config.catalog.show_more_delay_ms)
                    .unwrap_or(catalog_defaults.show_more_delay_ms),
            },
            password_reset: PasswordResetSettings {
                ttl_minutes: env_config
                    .password_reset_ttl_minutes
                    .or(file_config.password_reset.ttl_minutes)
                    .unwrap_or(reset_defaults.ttl_minutes),
                webhook_url: env_config
                    .password_reset_webhook_url
                    .or(file_config.password_reset.webhook_url),
                body_template: file_config.password_reset.body_template,
            },
            oauth_providers: file_config.oauth_providers,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::Invalid("catalog.page_size must be at least 1".to_string()));
        }
        if self.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("token_ttl_hours must be positive".to_string()));
        }
        let mut names: Vec<&str> = self.oauth_providers.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::Invalid("oauth provider names must be unique".to_string()));
        }
        Ok(())
    }

    pub fn oauth_provider(&self, name: &str) -> Option<&OAuthProviderConfig> {
        self.oauth_providers.iter().find(|p| p.name == name)
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    const FILE: &str = r#"
database_url = "postgres://file/db"
jwt_secret = "file-secret"
admin_emails = ["Owner@Example.com"]

[catalog]
page_size = 12

[password_reset]
webhook_url = "https://hooks.example.com/reset"

[[oauth_providers]]
name = "github"
client_id = "cid"
client_secret = "csecret"
auth_url = "https://github.com/login/oauth/authorize"
token_url = "https://github.com/login/oauth/access_token"
user_info_url = "https://api.github.com/user"
scopes = "read:user user:email"
"#;

    #[test]
    fn environment_overrides_file() {
        let config = ServerConfig::from_sources(
            Some(("server.toml", FILE)),
            env(&[("JWT_SECRET", "env-secret"), ("CATALOG_NEWEST_COUNT", "3")]),
        )
        .unwrap();
        assert_eq!(config.database_url, "postgres://file/db");
        assert_eq!(config.jwt_secret, "env-secret");
        assert_eq!(config.catalog.page_size, 12);
        assert_eq!(config.catalog.newest_count, 3);
        assert_eq!(config.catalog.show_more_delay_ms, 500);
        assert!(config.is_admin_email("owner@example.com"));
        assert_eq!(config.oauth_provider("github").unwrap().id_field, "id");
        assert_eq!(
            config.password_reset.webhook_url.as_deref(),
            Some("https://hooks.example.com/reset")
        );
    }

    #[test]
    fn database_url_and_secret_are_required() {
        let err = ServerConfig::from_sources(None, env(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let err = ServerConfig::from_sources(None, env(&[("DATABASE_URL", "sqlite::memory:")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn defaults_apply() {
        let config = ServerConfig::from_sources(
            None,
            env(&[("DATABASE_URL", "sqlite::memory:"), ("JWT_SECRET", "s")]),
        )
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.catalog, CatalogSettings::default());
        assert_eq!(config.password_reset.ttl_minutes, 60);
        assert!(config.oauth_providers.is_empty());
    }

    #[test]
    fn bad_toml_is_reported_with_path() {
        let err = ServerConfig::from_sources(Some(("broken.toml", "jwt_secret = ")), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = ServerConfig::from_sources(
            None,
            env(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("JWT_SECRET", "s"),
                ("CATALOG_PAGE_SIZE", "0"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
