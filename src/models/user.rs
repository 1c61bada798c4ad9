//! User model and authenticated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role claim attached to the user by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Employee,
}

/// User profile returned at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity provider user ID
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: UserRole,
}

/// How long the session should survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Survives an app restart ("remember me")
    Persistent,
    /// Cleared when the process ends
    Temporary,
}

impl SessionType {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            SessionType::Persistent
        } else {
            SessionType::Temporary
        }
    }
}

/// Authenticated session state, persisted under `keys::AUTH_SESSION`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Bearer credential
    pub token: String,
    /// Credential used to obtain a new bearer token
    pub refresh_token: String,
    /// When `token` stops being accepted
    pub token_expiration: DateTime<Utc>,
    pub user: User,
    pub session_type: SessionType,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_expiration", &self.token_expiration)
            .field("user", &self.user)
            .field("session_type", &self.session_type)
            .finish()
    }
}

/// Login credentials.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
