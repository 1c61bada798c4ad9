// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for the HTTP identity and ticket adapters against local mock servers.

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use simple_tracker::config::RefreshSettings;
use simple_tracker::error::{AppError, AuthErrorKind};
use simple_tracker::models::{
    BasicInfo, StepPayload, TicketPayload, UserRole, WizardStep,
};
use simple_tracker::services::{
    AuthTokenCoordinator, HttpIdentityProvider, HttpTicketApi, IdentityProvider, TicketApi,
    TicketClient,
};
use simple_tracker::storage::MemoryStore;
use simple_tracker::time_utils::{Clock, SystemClock};
use std::collections::BTreeMap;
use std::sync::Arc;

mod common;
use common::{credentials, yesterday, MockIdentity};

/// Serve `app` on an ephemeral port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn id_token(exp: i64, admin: bool) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": "uid-9",
            "exp": exp,
            "email": "lead@example.com",
            "name": "Lead",
            "admin": admin,
        }),
        &EncodingKey::from_secret(b"provider-secret"),
    )
    .unwrap()
}

fn error_route(status: StatusCode, code: &'static str) -> Router {
    Router::new().route(
        "/auth/login",
        post(move || async move { (status, Json(json!({ "error": code }))) }),
    )
}

// ─── Identity provider ───────────────────────────────────────

#[tokio::test]
async fn test_sign_in_uses_response_fields() {
    let app = Router::new().route(
        "/auth/login",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["email"], "crew@example.com");
            Json(json!({
                "token": "opaque-token",
                "refreshToken": "r-1",
                "expiresAt": 1_900_000_000,
                "user": {
                    "id": "user-1",
                    "email": "crew@example.com",
                    "displayName": "Crew",
                    "role": "admin"
                }
            }))
        }),
    );
    let provider = HttpIdentityProvider::new(serve(app).await).unwrap();

    let grant = provider.sign_in(&credentials()).await.unwrap();

    assert_eq!(grant.token, "opaque-token");
    assert_eq!(grant.refresh_token, "r-1");
    assert_eq!(grant.expires_at.timestamp(), 1_900_000_000);
    assert_eq!(grant.user.id, "user-1");
    assert_eq!(grant.user.role, UserRole::Admin);
}

#[tokio::test]
async fn test_sign_in_falls_back_to_token_claims() {
    let exp = Utc::now().timestamp() + 3600;
    let token = id_token(exp, true);
    let body = json!({ "token": token, "refreshToken": "r-2" });
    let app = Router::new().route("/auth/login", post(move || async move { Json(body) }));
    let provider = HttpIdentityProvider::new(serve(app).await).unwrap();

    let grant = provider.sign_in(&credentials()).await.unwrap();

    assert_eq!(grant.expires_at.timestamp(), exp);
    assert_eq!(grant.user.id, "uid-9");
    assert_eq!(grant.user.email, "lead@example.com");
    assert_eq!(grant.user.display_name.as_deref(), Some("Lead"));
    assert_eq!(grant.user.role, UserRole::Admin);
}

#[tokio::test]
async fn test_sign_in_error_codes() {
    let cases = [
        (
            StatusCode::BAD_REQUEST,
            "auth/wrong-password",
            AuthErrorKind::InvalidCredentials,
        ),
        (
            StatusCode::BAD_REQUEST,
            "auth/user-not-found",
            AuthErrorKind::InvalidCredentials,
        ),
        (
            StatusCode::FORBIDDEN,
            "auth/user-disabled",
            AuthErrorKind::AccountDisabled,
        ),
        (
            StatusCode::BAD_REQUEST,
            "auth/too-many-requests",
            AuthErrorKind::TooManyAttempts,
        ),
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "auth/internal-error",
            AuthErrorKind::Unexpected,
        ),
    ];

    for (status, code, expected) in cases {
        let provider = HttpIdentityProvider::new(serve(error_route(status, code)).await).unwrap();
        let err = provider.sign_in(&credentials()).await.unwrap_err();
        assert!(
            matches!(err, AppError::Auth(kind) if kind == expected),
            "{} should map to {:?}, got {:?}",
            code,
            expected,
            err
        );
    }
}

#[tokio::test]
async fn test_rate_limit_status_maps_to_too_many_attempts() {
    let app = Router::new().route(
        "/auth/login",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let provider = HttpIdentityProvider::new(serve(app).await).unwrap();

    let err = provider.sign_in(&credentials()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Auth(AuthErrorKind::TooManyAttempts)
    ));
    assert_eq!(
        err.user_message(),
        AuthErrorKind::TooManyAttempts.message()
    );
}

#[tokio::test]
async fn test_refresh_sends_refresh_token() {
    let app = Router::new().route(
        "/auth/refresh",
        post(|Json(body): Json<Value>| async move {
            if body["refreshToken"] != "r-1" {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": "auth/invalid-refresh-token" })));
            }
            (
                StatusCode::OK,
                Json(json!({ "token": "t-2", "refreshToken": "r-2", "expiresAt": 1_900_000_000 })),
            )
        }),
    );
    let provider = HttpIdentityProvider::new(serve(app).await).unwrap();

    let grant = provider.refresh("r-1").await.unwrap();
    assert_eq!(grant.token, "t-2");
    assert_eq!(grant.refresh_token.as_deref(), Some("r-2"));

    assert!(provider.refresh("stale").await.is_err());
}

#[tokio::test]
async fn test_unreachable_provider_is_unexpected() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = HttpIdentityProvider::new(format!("http://{}", addr)).unwrap();
    assert!(matches!(
        provider.sign_in(&credentials()).await,
        Err(AppError::Auth(AuthErrorKind::Unexpected))
    ));
}

// ─── Ticket API ──────────────────────────────────────────────

fn payload() -> TicketPayload {
    TicketPayload {
        date: yesterday(),
        jobsite_id: "jobsite-7".to_string(),
        truck_id: "truck-12".to_string(),
        categories: BTreeMap::new(),
        images: Vec::new(),
    }
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_save_step_posts_to_step_path() {
    let app = Router::new().route(
        "/api/tickets/wizard/{step}",
        post(
            |Path(step): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(bearer(&headers), "Bearer t-1");
                if step == "basic-info" && body["jobsiteId"] == "jobsite-7" {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
        ),
    );
    let client = TicketClient::new(serve(app).await).unwrap();
    let info = BasicInfo {
        date: Some(yesterday()),
        jobsite_id: Some("jobsite-7".to_string()),
        truck_id: Some("truck-12".to_string()),
    };

    client
        .save_step("t-1", WizardStep::BasicInfo, &StepPayload::BasicInfo(info))
        .await
        .unwrap();

    let err = client
        .save_step(
            "t-1",
            WizardStep::Categories,
            &StepPayload::Categories(BTreeMap::new()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TicketApi(ref msg) if msg.starts_with("HTTP 422")));
}

#[tokio::test]
async fn test_create_ticket_returns_id() {
    let app = Router::new().route(
        "/api/tickets",
        post(|| async { (StatusCode::CREATED, Json(json!({ "id": "t-42" }))) }),
    );
    let client = TicketClient::new(serve(app).await).unwrap();

    let id = client.create_ticket("t-1", &payload()).await.unwrap();
    assert_eq!(id.0, "t-42");
}

#[tokio::test]
async fn test_unauthorized_is_flagged() {
    let app = Router::new().route("/api/tickets", post(|| async { StatusCode::UNAUTHORIZED }));
    let client = TicketClient::new(serve(app).await).unwrap();

    let err = client.create_ticket("t-1", &payload()).await.unwrap_err();
    assert!(err.is_ticket_api_auth_error());
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_once() {
    let app = Router::new().route(
        "/api/tickets",
        post(|headers: HeaderMap| async move {
            if bearer(&headers) == "Bearer token-1" {
                (StatusCode::CREATED, Json(json!({ "id": "t-7" })))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({})))
            }
        }),
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let identity = Arc::new(MockIdentity::new(clock.clone(), chrono::Duration::hours(1)));
    let auth = AuthTokenCoordinator::new(
        identity.clone(),
        Arc::new(MemoryStore::new(clock.clone())),
        Arc::new(MemoryStore::new(clock.clone())),
        clock,
        RefreshSettings::default(),
    );
    auth.login(&credentials(), false).await.unwrap();

    let api = HttpTicketApi::new(TicketClient::new(serve(app).await).unwrap(), auth.clone());
    let id = api.finalize(&payload()).await.unwrap();

    assert_eq!(id.0, "t-7");
    assert_eq!(identity.refreshes(), 1);
    assert_eq!(auth.valid_token().await.unwrap(), "token-1");
    auth.shutdown().await;
}

#[tokio::test]
async fn test_finalize_requires_login() {
    let app = Router::new().route("/api/tickets", post(|| async { StatusCode::CREATED }));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let auth = AuthTokenCoordinator::new(
        Arc::new(MockIdentity::new(clock.clone(), chrono::Duration::hours(1))),
        Arc::new(MemoryStore::new(clock.clone())),
        Arc::new(MemoryStore::new(clock.clone())),
        clock,
        RefreshSettings::default(),
    );

    let api = HttpTicketApi::new(TicketClient::new(serve(app).await).unwrap(), auth);
    assert!(matches!(
        api.finalize(&payload()).await,
        Err(AppError::NotAuthenticated)
    ));
}
