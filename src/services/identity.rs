// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider port and its HTTP client.
//!
//! Handles:
//! - Password sign-in (token, refresh token, expiry, profile)
//! - Token refresh
//! - Remote sign-out
//! - Mapping provider error codes to user-facing categories

use crate::error::{AppError, AuthErrorKind, Result};
use crate::models::{Credentials, User, UserRole};
use crate::services::claims::decode_unverified;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignInGrant {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Result of a successful token refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: String,
    /// Present when the provider rotates refresh tokens
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Remote identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInGrant>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;

    async fn sign_out(&self, token: &str) -> Result<()>;
}

/// Identity provider reached over HTTP/JSON.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Check response status and map provider errors.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();

            if status.as_u16() == 429 {
                tracing::warn!("Identity provider rate limit hit (429)");
                return Err(AppError::Auth(AuthErrorKind::TooManyAttempts));
            }

            let body: ErrorBody = response.json().await.unwrap_or_default();
            let kind = AuthErrorKind::from_code(&body.error);
            tracing::warn!(status = %status, code = %body.error, ?kind, "Identity provider rejected request");
            return Err(AppError::Auth(kind));
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Identity provider returned malformed JSON");
            AppError::Auth(AuthErrorKind::Unexpected)
        })
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    tracing::warn!(error = %e, "Identity provider request failed");
    AppError::Auth(AuthErrorKind::Unexpected)
}

/// Resolve expiry from the response, else from the token's `exp` claim.
fn resolve_expiry(token: &str, expires_at: Option<i64>) -> Result<DateTime<Utc>> {
    if let Some(ts) = expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        return Ok(ts);
    }
    decode_unverified(token)?
        .expires_at()
        .ok_or(AppError::Auth(AuthErrorKind::Unexpected))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInGrant> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(credentials)
            .send()
            .await
            .map_err(transport_error)?;

        let body: SignInResponse = self.check_response_json(response).await?;
        let expires_at = resolve_expiry(&body.token, body.expires_at)?;

        // Fill profile gaps from the ID token claims
        let user = match body.user {
            Some(user) => User {
                id: user.id,
                email: user.email,
                display_name: user.display_name,
                role: match user.role {
                    Some(role) => role,
                    None => decode_unverified(&body.token)?.resolved_role(),
                },
            },
            None => {
                let claims = decode_unverified(&body.token)?;
                User {
                    role: claims.resolved_role(),
                    email: claims.email.unwrap_or_else(|| credentials.email.clone()),
                    display_name: claims.name,
                    id: claims.sub,
                }
            }
        };

        tracing::info!(user_id = %user.id, role = ?user.role, "Signed in");

        Ok(SignInGrant {
            token: body.token,
            refresh_token: body.refresh_token,
            expires_at,
            user,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let response = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(transport_error)?;

        let body: RefreshResponse = self.check_response_json(response).await?;
        let expires_at = resolve_expiry(&body.token, body.expires_at)?;

        Ok(TokenGrant {
            token: body.token,
            refresh_token: body.refresh_token,
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/auth/logout", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(AppError::Auth(AuthErrorKind::Unexpected));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    token: String,
    refresh_token: String,
    /// Unix timestamp
    expires_at: Option<i64>,
    user: Option<ProfileResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    id: String,
    email: String,
    display_name: Option<String>,
    role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
}
