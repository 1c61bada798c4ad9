// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Start-up detection of an abandoned wizard session.

use crate::models::{WizardSession, WizardStep};
use crate::services::wizard::WizardSessionStore;
use crate::storage::{keys, KeyValueStore};
use crate::time_utils::{format_relative, format_utc_rfc3339, Clock};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Summary shown to the user when an unfinished ticket is found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPrompt {
    pub current_step: WizardStep,
    /// Last completed step, or the current step if none is complete yet
    pub completed_step: WizardStep,
    pub step_label: &'static str,
    pub has_basic_info: bool,
    pub has_categories: bool,
    pub image_count: usize,
    /// e.g. "with category counts"
    pub progress: String,
    pub last_updated: DateTime<Utc>,
    pub last_updated_rfc3339: String,
    pub last_updated_relative: String,
}

impl RecoveryPrompt {
    pub fn from_session(session: &WizardSession, now: DateTime<Utc>) -> Self {
        let completed_step = session
            .current_step
            .previous()
            .unwrap_or(session.current_step);
        let has_basic_info = !session.basic_info.is_empty();
        let has_categories = !session.categories.is_empty();
        let image_count = session.image_upload.len();

        let progress = match image_count {
            0 if has_categories => "with category counts".to_string(),
            0 if has_basic_info => "with basic info".to_string(),
            0 => "just started".to_string(),
            1 => "with 1 image".to_string(),
            n => format!("with {} images", n),
        };

        Self {
            current_step: session.current_step,
            completed_step,
            step_label: completed_step.label(),
            has_basic_info,
            has_categories,
            image_count,
            progress,
            last_updated: session.last_updated,
            last_updated_rfc3339: format_utc_rfc3339(session.last_updated),
            last_updated_relative: format_relative(session.last_updated, now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryState {
    Pending,
    Offered,
    Resolved,
}

/// Offers to resume or discard a persisted wizard session, at most once.
pub struct SessionRecoveryCoordinator {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    settle_delay: Duration,
    state: RecoveryState,
}

impl SessionRecoveryCoordinator {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            ttl,
            settle_delay,
            state: RecoveryState::Pending,
        }
    }

    /// Wait for start-up to settle, then look for a live session.
    ///
    /// Returns a prompt the first time a session is found; `None` on every
    /// later call.
    pub async fn check(&mut self) -> Option<RecoveryPrompt> {
        if self.state != RecoveryState::Pending {
            return None;
        }

        tokio::time::sleep(self.settle_delay).await;

        let Some(session) = WizardSessionStore::load_persisted(self.storage.as_ref()) else {
            tracing::debug!("No wizard session to recover");
            return None;
        };

        self.state = RecoveryState::Offered;
        let prompt = RecoveryPrompt::from_session(&session, self.clock.now());
        tracing::info!(
            step = %prompt.current_step,
            progress = %prompt.progress,
            last_updated = %prompt.last_updated_rfc3339,
            "Found unfinished ticket"
        );
        Some(prompt)
    }

    /// Continue with the persisted session as it was left.
    pub fn resume(&mut self) -> WizardSessionStore {
        self.state = RecoveryState::Resolved;
        let store =
            WizardSessionStore::hydrate(self.storage.clone(), self.clock.clone(), self.ttl);
        tracing::info!(step = %store.current_step(), "Resumed wizard session");
        store
    }

    /// Throw the persisted session away and start fresh.
    pub fn discard(&mut self) -> WizardSessionStore {
        self.state = RecoveryState::Resolved;
        if let Err(e) = self.storage.remove(keys::WIZARD_SESSION) {
            tracing::warn!(error = %e, "Failed to remove discarded wizard session");
        }
        tracing::info!("Discarded wizard session");
        WizardSessionStore::new(self.storage.clone(), self.clock.clone(), self.ttl)
    }
}
