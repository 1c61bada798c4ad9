// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use simple_tracker::config::RefreshSettings;
use simple_tracker::error::{AppError, AuthErrorKind, Result};
use simple_tracker::models::{
    BasicInfoField, Category, Credentials, StepPayload, TicketId, TicketPayload, User, UserRole,
    WizardStep,
};
use simple_tracker::services::{
    AuthTokenCoordinator, IdentityProvider, SignInGrant, TicketApi, TokenGrant,
    WizardSessionStore,
};
use simple_tracker::storage::MemoryStore;
use simple_tracker::time_utils::{Clock, TokioClock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed start of wall-clock time for tests.
#[allow(dead_code)]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn yesterday() -> NaiveDate {
    epoch().date_naive().pred_opt().unwrap()
}

/// Identity provider double that counts calls.
#[allow(dead_code)]
pub struct MockIdentity {
    clock: Arc<dyn Clock>,
    /// Lifetime of every issued token
    pub token_lifetime: chrono::Duration,
    /// Simulated network latency of a refresh call
    pub latency: Duration,
    pub fail_refresh: AtomicBool,
    pub sign_in_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockIdentity {
    pub fn new(clock: Arc<dyn Clock>, token_lifetime: chrono::Duration) -> Self {
        Self {
            clock,
            token_lifetime,
            latency: Duration::from_millis(200),
            fail_refresh: AtomicBool::new(false),
            sign_in_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInGrant> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if credentials.password != "correct-horse" {
            return Err(AppError::Auth(AuthErrorKind::InvalidCredentials));
        }
        Ok(SignInGrant {
            token: "token-0".to_string(),
            refresh_token: "refresh-0".to_string(),
            expires_at: self.clock.now() + self.token_lifetime,
            user: User {
                id: "user-1".to_string(),
                email: credentials.email.clone(),
                display_name: Some("Crew Lead".to_string()),
                role: UserRole::Employee,
            },
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.latency).await;

        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(AppError::Auth(AuthErrorKind::Unexpected));
        }
        Ok(TokenGrant {
            token: format!("token-{}", n),
            refresh_token: None,
            expires_at: self.clock.now() + self.token_lifetime,
        })
    }

    async fn sign_out(&self, _token: &str) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Everything an auth coordinator test needs.
#[allow(dead_code)]
pub struct AuthHarness {
    pub clock: Arc<dyn Clock>,
    pub identity: Arc<MockIdentity>,
    pub persistent: Arc<MemoryStore>,
    pub temporary: Arc<MemoryStore>,
    pub auth: AuthTokenCoordinator,
}

/// Build a coordinator on tokio time. Call from a `start_paused` test.
#[allow(dead_code)]
pub fn auth_harness(token_lifetime: chrono::Duration) -> AuthHarness {
    let clock: Arc<dyn Clock> = Arc::new(TokioClock::starting_at(epoch()));
    let identity = Arc::new(MockIdentity::new(clock.clone(), token_lifetime));
    let persistent = Arc::new(MemoryStore::new(clock.clone()));
    let temporary = Arc::new(MemoryStore::new(clock.clone()));
    let auth = AuthTokenCoordinator::new(
        identity.clone(),
        persistent.clone(),
        temporary.clone(),
        clock.clone(),
        RefreshSettings::default(),
    );
    AuthHarness {
        clock,
        identity,
        persistent,
        temporary,
        auth,
    }
}

#[allow(dead_code)]
pub fn credentials() -> Credentials {
    Credentials::new("crew@example.com", "correct-horse")
}

/// Ticket API double that records what it was sent.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockTicketApi {
    pub saved: Mutex<Vec<(WizardStep, StepPayload)>>,
    pub finalized: Mutex<Vec<TicketPayload>>,
    pub fail: AtomicBool,
}

#[allow(dead_code)]
impl MockTicketApi {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn saved_steps(&self) -> Vec<WizardStep> {
        self.saved.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }
}

#[async_trait]
impl TicketApi for MockTicketApi {
    async fn save_step(&self, step: WizardStep, payload: &StepPayload) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::TicketApi("HTTP 503: unavailable".to_string()));
        }
        self.saved.lock().unwrap().push((step, payload.clone()));
        Ok(())
    }

    async fn finalize(&self, payload: &TicketPayload) -> Result<TicketId> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::TicketApi("HTTP 503: unavailable".to_string()));
        }
        let mut finalized = self.finalized.lock().unwrap();
        finalized.push(payload.clone());
        Ok(TicketId(format!("ticket-{}", finalized.len())))
    }
}

/// Fill in a complete step 1 for `date`.
#[allow(dead_code)]
pub fn fill_basic_info(wizard: &mut WizardSessionStore, date: NaiveDate) {
    wizard.update_basic_info(BasicInfoField::Date(date));
    wizard.update_basic_info(BasicInfoField::JobsiteId("jobsite-7".to_string()));
    wizard.update_basic_info(BasicInfoField::TruckId("truck-12".to_string()));
}

/// Set every category to zero.
#[allow(dead_code)]
pub fn zero_categories(wizard: &mut WizardSessionStore) {
    for category in Category::ALL {
        wizard.update_category(category, 0);
    }
}
