//! Role-gated navigation: one declarative table of path prefixes and the
//! roles allowed behind them, consulted by a single guard.

use serde::Serialize;

use crate::db::enums::UserRole;
use crate::session::Session;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub prefix: String,
    pub allowed: Vec<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Render,
    /// No session. `return_to` is the path the viewer asked for.
    RedirectToLogin { return_to: String },
    /// Signed in, but the role is not admitted. Holds the role's landing page.
    RedirectTo { location: String },
}

impl GuardDecision {
    /// Login URL carrying the original path, or the landing page.
    pub fn location(&self) -> Option<String> {
        match self {
            GuardDecision::Render => None,
            GuardDecision::RedirectToLogin { return_to } => Some(format!(
                "{LOGIN_PATH}?next={}",
                urlencoding::encode(return_to)
            )),
            GuardDecision::RedirectTo { location } => Some(location.clone()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(mut self, prefix: &str, allowed: &[UserRole]) -> Self {
        self.rules.push(RouteRule {
            prefix: prefix.trim_end_matches('/').to_string(),
            allowed: allowed.to_vec(),
        });
        self
    }

    /// Admin area for admins, dashboard and the viewer's own API for any
    /// signed-in user. Everything else is public.
    pub fn standard() -> Self {
        Self::new()
            .protect("/admin", &[UserRole::Admin])
            .protect("/api/admin", &[UserRole::Admin])
            .protect("/dashboard", &[UserRole::User, UserRole::Admin])
            .protect("/api/me", &[UserRole::User, UserRole::Admin])
    }

    /// The most specific rule covering `path`, if any. A prefix covers a path
    /// only on a segment boundary: `/admin` covers `/admin/tags` but not
    /// `/administrator`.
    pub fn rule_for(&self, path: &str) -> Option<&RouteRule> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.rules
            .iter()
            .filter(|rule| covers(&rule.prefix, path))
            .max_by_key(|rule| rule.prefix.len())
    }

    pub fn decide(&self, path: &str, session: Option<&Session>) -> GuardDecision {
        let Some(rule) = self.rule_for(path) else {
            return GuardDecision::Render;
        };
        match session {
            None => GuardDecision::RedirectToLogin {
                return_to: path.to_string(),
            },
            Some(session) if rule.allowed.contains(&session.role()) => GuardDecision::Render,
            Some(session) => GuardDecision::RedirectTo {
                location: session.role().landing_path().to_string(),
            },
        }
    }
}

fn covers(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
