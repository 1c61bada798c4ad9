// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth token coordinator.
//!
//! Owns the authenticated session and keeps its bearer token fresh. Three
//! independent triggers can ask for a refresh:
//! - Scheduled: one-shot timer at 75% of the token's remaining lifetime
//! - Activity: debounced user activity when expiry is near
//! - Background: periodic check when expiry is near
//!
//! All of them go through [`AuthTokenCoordinator::refresh_now`], which
//! serializes on a single lock and uses a session generation counter so
//! that callers queued behind a successful refresh reuse its result
//! instead of issuing another network call.

use crate::config::RefreshSettings;
use crate::error::{AppError, Result};
use crate::models::{AuthSession, Credentials, SessionType, User};
use crate::services::identity::IdentityProvider;
use crate::storage::{get_json, keys, set_json, KeyValueStore};
use crate::time_utils::Clock;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// How long a remembered session stays on disk without being refreshed.
const PERSISTENT_SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const ACTIVITY_CHANNEL_CAPACITY: usize = 32;
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// What asked for a refresh (for logging and threshold selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Scheduled,
    Activity,
    Background,
    /// An outgoing request found the token near expiry or rejected
    Request,
    /// Start-up restore found an expired token
    Restore,
}

impl RefreshTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshTrigger::Scheduled => "scheduled",
            RefreshTrigger::Activity => "activity",
            RefreshTrigger::Background => "background",
            RefreshTrigger::Request => "request",
            RefreshTrigger::Restore => "restore",
        }
    }
}

/// Session lifecycle notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn { user_id: String },
    Refreshed { expires_at: DateTime<Utc> },
    LoggedOut,
    /// Shown to the user before the redirect
    SessionExpired { message: String },
    /// Sent `expired_redirect_delay` after `SessionExpired`
    RedirectToLogin,
}

/// Delay until the proactive refresh: `max(0, remaining * fraction)`.
pub fn proactive_refresh_delay(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    fraction: f64,
) -> Duration {
    let remaining = (expires_at - now).to_std().unwrap_or(Duration::ZERO);
    remaining.mul_f64(fraction)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

/// The pending proactive refresh timer.
struct ScheduledRefresh {
    id: u64,
    handle: JoinHandle<()>,
}

/// Empty the timer slot only if it still holds timer `id`.
fn detach_scheduled(slot: &Mutex<Option<ScheduledRefresh>>, id: u64) -> bool {
    let mut slot = lock(slot);
    if slot.as_ref().is_some_and(|s| s.id == id) {
        slot.take();
        true
    } else {
        false
    }
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    /// Backing store for remembered sessions
    persistent: Arc<dyn KeyValueStore>,
    /// Backing store for process-lifetime sessions
    temporary: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    settings: RefreshSettings,
    session: RwLock<Option<AuthSession>>,
    /// Bumped on every login, refresh, logout and expiry.
    generation: AtomicU64,
    /// Serializes refresh calls.
    refresh_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<AuthEvent>,
    activity_tx: Mutex<Option<mpsc::Sender<()>>>,
    scheduled: Mutex<Option<ScheduledRefresh>>,
    next_schedule_id: AtomicU64,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

/// Shared handle to the auth state. Cheap to clone.
#[derive(Clone)]
pub struct AuthTokenCoordinator {
    inner: Arc<Inner>,
}

impl AuthTokenCoordinator {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        persistent: Arc<dyn KeyValueStore>,
        temporary: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                identity,
                persistent,
                temporary,
                clock,
                settings,
                session: RwLock::new(None),
                generation: AtomicU64::new(0),
                refresh_lock: tokio::sync::Mutex::new(()),
                events,
                activity_tx: Mutex::new(None),
                scheduled: Mutex::new(None),
                next_schedule_id: AtomicU64::new(0),
                loops: Mutex::new(Vec::new()),
            }),
        }
    }

    fn from_weak(inner: &Weak<Inner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    // ─── State Accessors ─────────────────────────────────────────────────────

    pub async fn session(&self) -> Option<AuthSession> {
        self.inner.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.session.read().await.is_some()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.inner.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn token_expiration(&self) -> Option<DateTime<Utc>> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.token_expiration)
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    // ─── Login / Logout ──────────────────────────────────────────────────────

    /// Authenticate and start a session.
    ///
    /// `remember_me` selects a persistent (restart-surviving) session.
    pub async fn login(&self, credentials: &Credentials, remember_me: bool) -> Result<User> {
        let grant = match self.inner.identity.sign_in(credentials).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(email = %credentials.email, error = %e, "Login failed");
                return Err(e);
            }
        };

        let session = AuthSession {
            token: grant.token,
            refresh_token: grant.refresh_token,
            token_expiration: grant.expires_at,
            user: grant.user,
            session_type: SessionType::from_remember_me(remember_me),
        };

        let user = session.user.clone();
        let expires_at = session.token_expiration;
        self.install(None, session).await;
        self.schedule_refresh(expires_at);

        tracing::info!(
            user_id = %user.id,
            remember_me,
            expires_at = %expires_at,
            "Login successful"
        );
        self.emit(AuthEvent::LoggedIn {
            user_id: user.id.clone(),
        });
        Ok(user)
    }

    /// End the session. Remote sign-out is best-effort.
    pub async fn logout(&self) {
        if let Some(session) = self.session().await {
            if let Err(e) = self.inner.identity.sign_out(&session.token).await {
                tracing::warn!(
                    user_id = %session.user.id,
                    error = %e,
                    "Remote sign-out failed, clearing local session anyway"
                );
            }
        }

        self.clear_local(None).await;
        tracing::info!("Logged out");
        self.emit(AuthEvent::LoggedOut);
    }

    /// Reload a stored session at start-up.
    ///
    /// Remembered sessions are checked first. A token already inside the
    /// request margin is refreshed before returning.
    pub async fn restore(&self) -> Option<User> {
        let session = get_json::<AuthSession>(self.inner.persistent.as_ref(), keys::AUTH_SESSION)
            .or_else(|| get_json(self.inner.temporary.as_ref(), keys::AUTH_SESSION))?;

        let user = session.user.clone();
        let expires_at = session.token_expiration;
        tracing::info!(user_id = %user.id, session_type = ?session.session_type, "Restoring session");
        self.install(None, session).await;

        let margin = to_chrono(self.inner.settings.request_margin);
        if self.inner.clock.now() + margin >= expires_at {
            self.refresh_now(RefreshTrigger::Restore).await.ok()?;
        } else {
            self.schedule_refresh(expires_at);
        }

        Some(user)
    }

    // ─── Token Access ────────────────────────────────────────────────────────

    /// Get a bearer token that is not about to expire.
    pub async fn valid_token(&self) -> Result<String> {
        let session = self.session().await.ok_or(AppError::NotAuthenticated)?;

        let margin = to_chrono(self.inner.settings.request_margin);
        if self.inner.clock.now() + margin < session.token_expiration {
            return Ok(session.token);
        }

        self.refresh_now(RefreshTrigger::Request).await
    }

    /// Refresh unconditionally, coalescing with any refresh already running.
    pub async fn refresh_now(&self, trigger: RefreshTrigger) -> Result<String> {
        let observed = self.inner.generation.load(Ordering::SeqCst);
        self.refresh_from(observed, trigger).await
    }

    /// Refresh if less than the trigger's threshold remains.
    ///
    /// Returns `Ok(None)` when no refresh was needed or nobody is logged in.
    pub async fn refresh_if_expiring(&self, trigger: RefreshTrigger) -> Result<Option<String>> {
        let threshold = match trigger {
            RefreshTrigger::Activity => self.inner.settings.activity_threshold,
            RefreshTrigger::Background => self.inner.settings.background_threshold,
            _ => self.inner.settings.request_margin,
        };

        let observed = self.inner.generation.load(Ordering::SeqCst);
        let Some(expires_at) = self.token_expiration().await else {
            return Ok(None);
        };

        if expires_at - self.inner.clock.now() >= to_chrono(threshold) {
            return Ok(None);
        }

        self.refresh_from(observed, trigger).await.map(Some)
    }

    async fn refresh_from(&self, observed: u64, trigger: RefreshTrigger) -> Result<String> {
        let _guard = self.inner.refresh_lock.lock().await;

        // Another refresh, login or logout finished while we waited
        if self.inner.generation.load(Ordering::SeqCst) != observed {
            tracing::debug!(trigger = trigger.as_str(), "Refresh already handled");
            return self
                .session()
                .await
                .map(|s| s.token)
                .ok_or(AppError::NotAuthenticated);
        }

        let session = self.session().await.ok_or(AppError::NotAuthenticated)?;

        tracing::info!(
            trigger = trigger.as_str(),
            user_id = %session.user.id,
            "Refreshing auth token"
        );

        match self.inner.identity.refresh(&session.refresh_token).await {
            Ok(grant) => {
                let expires_at = grant.expires_at;
                let refreshed = AuthSession {
                    token: grant.token,
                    refresh_token: grant.refresh_token.unwrap_or(session.refresh_token),
                    token_expiration: expires_at,
                    ..session
                };
                let token = refreshed.token.clone();

                if !self.install(Some(observed), refreshed).await {
                    // Logged out while the request was in flight
                    return Err(AppError::NotAuthenticated);
                }
                self.schedule_refresh(expires_at);

                tracing::info!(
                    trigger = trigger.as_str(),
                    expires_at = %expires_at,
                    "Auth token refreshed"
                );
                self.emit(AuthEvent::Refreshed { expires_at });
                Ok(token)
            }
            Err(e) => {
                if !self.expire_session(observed).await {
                    // A login or logout replaced the session this refresh was for
                    tracing::debug!(
                        trigger = trigger.as_str(),
                        error = %e,
                        "Stale token refresh failed, keeping current session"
                    );
                    return self
                        .session()
                        .await
                        .map(|s| s.token)
                        .ok_or(AppError::NotAuthenticated);
                }

                tracing::warn!(
                    trigger = trigger.as_str(),
                    error = %e,
                    "Token refresh failed, ending session"
                );
                Err(AppError::SessionExpired)
            }
        }
    }

    // ─── Session State ───────────────────────────────────────────────────────

    /// Replace the session and persist it.
    ///
    /// With `expected`, only installs if the generation still matches.
    async fn install(&self, expected: Option<u64>, session: AuthSession) -> bool {
        let mut slot = self.inner.session.write().await;
        if let Some(expected) = expected {
            if self.inner.generation.load(Ordering::SeqCst) != expected {
                return false;
            }
        }

        let (target, other, ttl) = match session.session_type {
            SessionType::Persistent => (
                &self.inner.persistent,
                &self.inner.temporary,
                Some(PERSISTENT_SESSION_TTL),
            ),
            SessionType::Temporary => (&self.inner.temporary, &self.inner.persistent, None),
        };

        if let Err(e) = set_json(target.as_ref(), keys::AUTH_SESSION, &session, ttl) {
            tracing::warn!(error = %e, "Failed to persist auth session");
        }
        if let Err(e) = other.remove(keys::AUTH_SESSION) {
            tracing::warn!(error = %e, "Failed to remove stale auth session");
        }

        *slot = Some(session);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Drop the session from memory and both stores.
    ///
    /// With `expected`, only clears if the generation still matches.
    async fn clear_local(&self, expected: Option<u64>) -> bool {
        let mut slot = self.inner.session.write().await;
        if let Some(expected) = expected {
            if self.inner.generation.load(Ordering::SeqCst) != expected {
                return false;
            }
        }
        *slot = None;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let scheduled = lock(&self.inner.scheduled).take();
        if let Some(scheduled) = scheduled {
            scheduled.handle.abort();
        }

        for store in [&self.inner.persistent, &self.inner.temporary] {
            if let Err(e) = store.remove(keys::AUTH_SESSION) {
                tracing::warn!(error = %e, "Failed to remove stored auth session");
            }
        }
        true
    }

    /// Session-fatal path: clear everything, notify, then redirect.
    ///
    /// Does nothing and returns false if generation `expected` is no longer
    /// current.
    async fn expire_session(&self, expected: u64) -> bool {
        if !self.clear_local(Some(expected)).await {
            return false;
        }
        self.emit(AuthEvent::SessionExpired {
            message: AppError::SessionExpired.user_message(),
        });

        let events = self.inner.events.clone();
        let delay = self.inner.settings.expired_redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AuthEvent::RedirectToLogin);
        });
        true
    }

    // ─── Triggers ────────────────────────────────────────────────────────────

    fn schedule_refresh(&self, expires_at: DateTime<Utc>) {
        let delay = proactive_refresh_delay(
            expires_at,
            self.inner.clock.now(),
            self.inner.settings.proactive_fraction,
        );
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let id = self.inner.next_schedule_id.fetch_add(1, Ordering::SeqCst);
        let weak = Arc::downgrade(&self.inner);

        // Hold the slot until the new timer is in it
        let mut slot = lock(&self.inner.scheduled);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(coordinator) = Self::from_weak(&weak) else {
                return;
            };
            // Detach ourselves so the refresh can schedule the next timer
            if !detach_scheduled(&coordinator.inner.scheduled, id) {
                return;
            }

            if let Err(e) = coordinator
                .refresh_from(generation, RefreshTrigger::Scheduled)
                .await
            {
                tracing::debug!(error = %e, "Scheduled refresh did not complete");
            }
        });

        if let Some(previous) = slot.replace(ScheduledRefresh { id, handle }) {
            previous.handle.abort();
        }
        drop(slot);
        tracing::debug!(delay_secs = delay.as_secs(), "Scheduled proactive token refresh");
    }

    /// Note user interaction (pointer, keyboard, touch).
    ///
    /// Has no effect until [`start`](Self::start) has been called.
    pub fn record_activity(&self) {
        if let Some(tx) = lock(&self.inner.activity_tx).as_ref() {
            // A full channel already guarantees a pending check
            let _ = tx.try_send(());
        }
    }

    /// Start the activity and background refresh loops.
    pub fn start(&self) {
        let mut loops = lock(&self.inner.loops);
        if !loops.is_empty() {
            return;
        }

        let (tx, rx) = mpsc::channel(ACTIVITY_CHANNEL_CAPACITY);
        *lock(&self.inner.activity_tx) = Some(tx);

        let settings = self.inner.settings;
        loops.push(tokio::spawn(activity_loop(
            Arc::downgrade(&self.inner),
            rx,
            settings.activity_debounce,
        )));
        loops.push(tokio::spawn(background_loop(
            Arc::downgrade(&self.inner),
            settings.background_interval,
        )));

        tracing::debug!("Token refresh loops started");
    }

    /// Stop all timers and loops.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = lock(&self.inner.loops).drain(..).collect();
        lock(&self.inner.activity_tx).take();
        let scheduled = lock(&self.inner.scheduled).take();
        if let Some(scheduled) = scheduled {
            scheduled.handle.abort();
        }

        for handle in &handles {
            handle.abort();
        }
        // Aborted tasks resolve to a cancellation error
        let _ = futures_util::future::join_all(handles).await;
        tracing::debug!("Token refresh loops stopped");
    }
}

/// Wait for a quiet period after activity, then check expiry.
async fn activity_loop(inner: Weak<Inner>, mut rx: mpsc::Receiver<()>, debounce: Duration) {
    while rx.recv().await.is_some() {
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let Some(coordinator) = AuthTokenCoordinator::from_weak(&inner) else {
            return;
        };
        if let Err(e) = coordinator
            .refresh_if_expiring(RefreshTrigger::Activity)
            .await
        {
            tracing::debug!(error = %e, "Activity refresh did not complete");
        }
    }
}

async fn background_loop(inner: Weak<Inner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(coordinator) = AuthTokenCoordinator::from_weak(&inner) else {
            return;
        };
        if let Err(e) = coordinator
            .refresh_if_expiring(RefreshTrigger::Background)
            .await
        {
            tracing::debug!(error = %e, "Background refresh did not complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_proactive_delay_is_three_quarters_of_remaining() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let delay = proactive_refresh_delay(now + chrono::Duration::seconds(100), now, 0.75);
        assert_eq!(delay, Duration::from_secs(75));
    }

    #[test]
    fn test_proactive_delay_never_negative() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let delay = proactive_refresh_delay(now - chrono::Duration::seconds(10), now, 0.75);
        assert_eq!(delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_detach_scheduled_only_takes_own_timer() {
        let slot = Mutex::new(Some(ScheduledRefresh {
            id: 2,
            handle: tokio::spawn(std::future::pending()),
        }));

        assert!(!detach_scheduled(&slot, 1));
        assert!(lock(&slot).as_ref().is_some_and(|s| s.id == 2));

        assert!(detach_scheduled(&slot, 2));
        assert!(lock(&slot).is_none());
        assert!(!detach_scheduled(&slot, 2));
    }

    #[test]
    fn test_trigger_names() {
        assert_eq!(RefreshTrigger::Scheduled.as_str(), "scheduled");
        assert_eq!(RefreshTrigger::Background.as_str(), "background");
    }
}
