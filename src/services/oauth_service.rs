//! OAuth2 authorization-code plumbing for the social sign-in providers named
//! in the server configuration.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::auth_service::AuthError;
use crate::server::config::OAuthProviderConfig;

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

/// What the front end needs to render a provider button.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicProviderInfo {
    pub name: String,
    pub login_url: String,
}

/// Identity reported by a provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub provider_user_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

pub fn public_info(provider: &OAuthProviderConfig) -> PublicProviderInfo {
    PublicProviderInfo {
        name: provider.name.clone(),
        login_url: format!("/api/auth/{}/login", provider.name),
    }
}

pub fn redirect_uri(frontend_url: &str, provider_name: &str) -> String {
    format!(
        "{}/api/auth/{}/callback",
        frontend_url.trim_end_matches('/'),
        provider_name
    )
}

pub fn authorize_url(provider: &OAuthProviderConfig, redirect_uri: &str, state: &str) -> String {
    let mut auth_url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&state={}",
        provider.auth_url,
        urlencoding::encode(&provider.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state)
    );
    if let Some(scopes) = &provider.scopes {
        auth_url.push_str(&format!("&scope={}", urlencoding::encode(scopes)));
    }
    auth_url
}

pub async fn exchange_code_for_token(
    client: &Client,
    provider: &OAuthProviderConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse, AuthError> {
    let params = [
        ("client_id", provider.client_id.as_str()),
        ("client_secret", provider.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
    ];

    let response = client
        .post(&provider.token_url)
        .form(&params)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("Failed to send token request: {e}")))?;

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AuthError::Provider(format!("Failed to get token: {error_text}")));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| AuthError::Provider(format!("Failed to parse token response: {e}")))
}

pub async fn get_user_info(
    client: &Client,
    provider: &OAuthProviderConfig,
    access_token: &str,
) -> Result<Value, AuthError> {
    client
        .get(&provider.user_info_url)
        .bearer_auth(access_token)
        .header("User-Agent", "companion-hub") // Some providers require a User-Agent
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("Failed to send user info request: {e}")))?
        .json::<Value>()
        .await
        .map_err(|e| AuthError::Provider(format!("Failed to parse user info response: {e}")))
}

/// Pulls the configured id and email fields out of a user-info document.
/// Numeric ids are accepted and rendered as strings.
pub fn extract_identity(provider: &OAuthProviderConfig, user_info: &Value) -> Result<ProviderIdentity, AuthError> {
    let provider_user_id = user_info
        .get(&provider.id_field)
        .and_then(|v| v.as_str().map(ToString::to_string).or_else(|| v.as_i64().map(|n| n.to_string())))
        .ok_or_else(|| AuthError::Provider("Could not extract provider user ID.".to_string()))?;

    let email = user_info
        .get(&provider.email_field)
        .and_then(Value::as_str)
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty());

    let email_verified = provider
        .email_verified_field
        .as_ref()
        .and_then(|field| user_info.get(field))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(ProviderIdentity { provider_user_id, email, email_verified })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn github() -> OAuthProviderConfig {
        OAuthProviderConfig {
            name: "github".to_string(),
            client_id: "cid".to_string(),
            client_secret: "secret".to_string(),
            auth_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            user_info_url: "https://api.github.com/user".to_string(),
            scopes: Some("read:user user:email".to_string()),
            id_field: "id".to_string(),
            email_field: "email".to_string(),
            email_verified_field: None,
        }
    }

    #[test]
    fn authorize_url_carries_encoded_parameters() {
        let redirect = redirect_uri("http://localhost:5173/", "github");
        assert_eq!(redirect, "http://localhost:5173/api/auth/github/callback");

        let url = authorize_url(&github(), &redirect, "n0nce");
        assert!(url.starts_with("https://github.com/login/oauth/authorize?client_id=cid"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5173%2Fapi%2Fauth%2Fgithub%2Fcallback"));
        assert!(url.contains("state=n0nce"));
        assert!(url.ends_with("scope=read%3Auser%20user%3Aemail"));
    }

    #[test]
    fn numeric_ids_and_missing_email_are_handled() {
        let identity = extract_identity(&github(), &json!({"id": 42, "login": "octo"})).unwrap();
        assert_eq!(identity.provider_user_id, "42");
        assert_eq!(identity.email, None);

        let identity = extract_identity(&github(), &json!({"id": "abc", "email": " Octo@Example.com "})).unwrap();
        assert_eq!(identity.email.as_deref(), Some("octo@example.com"));

        assert!(!identity.email_verified);

        assert!(extract_identity(&github(), &json!({"login": "octo"})).is_err());
    }

    #[test]
    fn verified_flag_comes_from_the_configured_field() {
        let google = OAuthProviderConfig {
            email_verified_field: Some("email_verified".to_string()),
            id_field: "sub".to_string(),
            ..github()
        };
        let verified = json!({"sub": "g1", "email": "ada@example.com", "email_verified": true});
        assert!(extract_identity(&google, &verified).unwrap().email_verified);

        let unverified = json!({"sub": "g1", "email": "ada@example.com", "email_verified": "true"});
        assert!(!extract_identity(&google, &unverified).unwrap().email_verified);
        let unconfigured = json!({"id": 1, "email": "ada@example.com", "email_verified": true});
        assert!(!extract_identity(&github(), &unconfigured).unwrap().email_verified);
    }
}
