// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unverified ID-token claim extraction.
//!
//! The identity provider already authenticated the token it handed us; the
//! client only reads expiry and role hints from it, so the signature is not
//! checked here. Never use these claims for authorization decisions.

use crate::error::{AppError, AuthErrorKind};
use crate::models::UserRole;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Claims read from an ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Custom role claim
    #[serde(default)]
    pub role: Option<UserRole>,
    /// Legacy boolean admin claim
    #[serde(default)]
    pub admin: Option<bool>,
}

impl IdTokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Role from the custom claim, falling back to the admin flag.
    pub fn resolved_role(&self) -> UserRole {
        match (self.role, self.admin) {
            (Some(role), _) => role,
            (None, Some(true)) => UserRole::Admin,
            _ => UserRole::Employee,
        }
    }
}

/// Decode the payload of a JWT without verifying its signature.
pub fn decode_unverified(token: &str) -> Result<IdTokenClaims, AppError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to read ID token claims");
            AppError::Auth(AuthErrorKind::Unexpected)
        })
}
