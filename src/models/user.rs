//! Signed-in user models.

use serde::{Deserialize, Serialize};

/// Who the current session belongs to.
///
/// Derived once at login and stored in the session. Admin and client are
/// disjoint: an admin cannot use client routes and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Principal {
    #[default]
    Anonymous,
    Client {
        email: String,
    },
    Admin {
        email: String,
    },
}

impl Principal {
    /// Build the principal for a user who completed the login flow.
    pub fn signed_in(email: String, is_admin: bool) -> Self {
        if is_admin {
            Self::Admin { email }
        } else {
            Self::Client { email }
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Client { email } | Self::Admin { email } => Some(email),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin { .. })
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// Landing page after login.
    pub fn home_path(&self) -> &'static str {
        match self {
            Self::Anonymous => "/",
            Self::Client { .. } => "/client",
            Self::Admin { .. } => "/admin",
        }
    }
}

/// Profile claims returned by the identity provider's user-info endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl UserInfo {
    /// Best human-readable label for page headers.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.given_name.as_deref())
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// Everything the session keeps about a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub principal: Principal,
    pub profile: UserInfo,
}

/// Check whether a group claim lists `group`, ignoring case.
///
/// The claim may be a JSON array of strings or a single string; anything
/// else counts as no membership.
pub fn has_group(
    claims: &serde_json::Map<String, serde_json::Value>,
    claim: &str,
    group: &str,
) -> bool {
    match claims.get(claim) {
        Some(serde_json::Value::Array(groups)) => groups
            .iter()
            .filter_map(|g| g.as_str())
            .any(|g| g.eq_ignore_ascii_case(group)),
        Some(serde_json::Value::String(single)) => single.eq_ignore_ascii_case(group),
        _ => false,
    }
}
