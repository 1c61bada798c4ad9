// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

use serde::Serialize;

/// Categories of identity provider failures shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    InvalidCredentials,
    TooManyAttempts,
    AccountDisabled,
    Unexpected,
}

impl AuthErrorKind {
    /// Map a Firebase-style identity error code to a category.
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/invalid-credential"
            | "auth/invalid-email"
            | "auth/user-not-found"
            | "auth/wrong-password"
            | "auth/invalid-login-credentials" => AuthErrorKind::InvalidCredentials,
            "auth/too-many-requests" => AuthErrorKind::TooManyAttempts,
            "auth/user-disabled" => AuthErrorKind::AccountDisabled,
            _ => AuthErrorKind::Unexpected,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCredentials => "Invalid email or password.",
            AuthErrorKind::TooManyAttempts => {
                "Too many failed login attempts. Please try again later."
            }
            AuthErrorKind::AccountDisabled => {
                "This account has been disabled. Please contact an administrator."
            }
            AuthErrorKind::Unexpected => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot move from {from} to {to}: {from} is incomplete")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Ticket API error: {0}")]
    TicketApi(String),

    #[error("Authentication failed: {0:?}")]
    Auth(AuthErrorKind),

    #[error("Session expired")]
    SessionExpired,

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker for a remote rejection caused by a stale bearer token.
    pub const TICKET_API_UNAUTHORIZED: &'static str = "Unauthorized (401)";

    /// Message suitable for an inline alert or toast.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::InvalidTransition { from, .. } => {
                format!("Please complete {} before continuing.", from)
            }
            AppError::TicketApi(_) => {
                "Failed to save your ticket. Please check your connection and try again."
                    .to_string()
            }
            AppError::Auth(kind) => kind.message().to_string(),
            AppError::SessionExpired => {
                "Your session has expired. Please log in again.".to_string()
            }
            AppError::NotAuthenticated => "Please log in to continue.".to_string(),
            AppError::Internal(_) => AuthErrorKind::Unexpected.message().to_string(),
        }
    }

    /// True if the ticket API rejected the request for an auth reason.
    pub fn is_ticket_api_auth_error(&self) -> bool {
        matches!(self, AppError::TicketApi(msg) if msg == Self::TICKET_API_UNAUTHORIZED)
    }
}

/// Result type alias for fallible operations.
pub type Result<T> = std::result::Result<T, AppError>;
