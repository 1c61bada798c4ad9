// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ticket wizard session store.
//!
//! Single owner of the in-progress submission. Every mutation refreshes
//! `last_updated` and rewrites the persisted copy with a fresh TTL, so the
//! stored session expires a fixed time after the *last* edit.

use crate::error::{AppError, Result};
use crate::models::{
    BasicInfoField, Category, ImageReference, StepPayload, TicketId, TicketImage, TicketPayload,
    WizardSession, WizardStep,
};
use crate::services::ticket_api::TicketApi;
use crate::services::validation;
use crate::storage::{get_json, keys, set_json, KeyValueStore};
use crate::time_utils::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Default wizard session lifetime (24 hours).
pub const DEFAULT_WIZARD_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// In-progress ticket plus its persistence port.
pub struct WizardSessionStore {
    session: WizardSession,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl WizardSessionStore {
    /// Start an empty session. Nothing is written until the first mutation.
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let session = WizardSession::new(clock.now());
        Self {
            session,
            storage,
            clock,
            ttl,
        }
    }

    /// Resume the persisted session if there is a live one, else start empty.
    pub fn hydrate(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        match Self::load_persisted(storage.as_ref()) {
            Some(session) => {
                tracing::debug!(step = %session.current_step, "Hydrated wizard session");
                Self {
                    session,
                    storage,
                    clock,
                    ttl,
                }
            }
            None => Self::new(storage, clock, ttl),
        }
    }

    /// Read the persisted session. Expired or corrupt records read as `None`.
    pub fn load_persisted(storage: &dyn KeyValueStore) -> Option<WizardSession> {
        get_json(storage, keys::WIZARD_SESSION)
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn current_step(&self) -> WizardStep {
        self.session.current_step
    }

    pub fn is_submitting(&self) -> bool {
        self.session.is_submitting
    }

    // ─── Mutators ────────────────────────────────────────────────

    pub fn update_basic_info(&mut self, field: BasicInfoField) {
        let info = &mut self.session.basic_info;
        match field {
            BasicInfoField::Date(date) => info.date = Some(date),
            BasicInfoField::JobsiteId(id) => info.jobsite_id = Some(id),
            BasicInfoField::TruckId(id) => info.truck_id = Some(id),
        }
        self.touch_and_persist();
    }

    /// Set a category count. Values are stored as given; range checks
    /// belong to `validation::validate_category_count`.
    pub fn update_category(&mut self, category: Category, value: i32) {
        self.session.categories.insert(category, value);
        self.touch_and_persist();
    }

    pub fn set_image_upload(&mut self, images: Vec<ImageReference>) {
        self.session.image_upload = images;
        self.touch_and_persist();
    }

    /// Move to `step` without checking validity.
    ///
    /// Navigation code must check [`can_proceed_to_next_step`] first, or use
    /// [`try_set_current_step`] instead.
    ///
    /// [`can_proceed_to_next_step`]: Self::can_proceed_to_next_step
    /// [`try_set_current_step`]: Self::try_set_current_step
    pub fn set_current_step(&mut self, step: WizardStep) {
        self.session.current_step = step;
        self.touch_and_persist();
    }

    /// Move to `step`, rejecting forward moves past an incomplete step.
    pub fn try_set_current_step(&mut self, step: WizardStep) -> Result<()> {
        if let Some(blocking) = WizardStep::ALL
            .into_iter()
            .filter(|s| *s >= self.session.current_step && *s < step)
            .find(|s| !self.is_step_valid(*s))
        {
            tracing::debug!(from = %blocking, to = %step, "Rejected wizard transition");
            return Err(AppError::InvalidTransition {
                from: blocking.label(),
                to: step.label(),
            });
        }

        self.set_current_step(step);
        Ok(())
    }

    /// Reset to an empty session and drop the persisted copy.
    pub fn clear_wizard(&mut self) {
        self.session = WizardSession::new(self.clock.now());
        if let Err(e) = self.storage.remove(keys::WIZARD_SESSION) {
            tracing::warn!(error = %e, "Failed to remove persisted wizard session");
        }
    }

    fn touch_and_persist(&mut self) {
        self.session.last_updated = self.clock.now();
        if let Err(e) = set_json(
            self.storage.as_ref(),
            keys::WIZARD_SESSION,
            &self.session,
            Some(self.ttl),
        ) {
            tracing::warn!(error = %e, "Failed to persist wizard session");
        }
    }

    // ─── Predicates ──────────────────────────────────────────────

    pub fn is_step_valid(&self, step: WizardStep) -> bool {
        let today = self.clock.today();
        match step {
            WizardStep::BasicInfo => {
                validation::basic_info_complete(&self.session.basic_info, today)
            }
            WizardStep::Categories => validation::categories_complete(&self.session.categories),
            WizardStep::ImageUpload => true,
            WizardStep::Confirmation => {
                self.is_step_valid(WizardStep::BasicInfo)
                    && self.is_step_valid(WizardStep::Categories)
            }
        }
    }

    pub fn can_proceed_to_next_step(&self) -> bool {
        self.is_step_valid(self.session.current_step)
    }

    // ─── Payloads ────────────────────────────────────────────────

    /// Checkpoint payload for `step`.
    pub fn step_payload(&self, step: WizardStep) -> Result<StepPayload> {
        Ok(match step {
            WizardStep::BasicInfo => StepPayload::BasicInfo(self.session.basic_info.clone()),
            WizardStep::Categories => StepPayload::Categories(self.session.categories.clone()),
            WizardStep::ImageUpload => StepPayload::Images(
                self.session.image_upload.iter().map(TicketImage::from).collect(),
            ),
            WizardStep::Confirmation => StepPayload::Ticket(self.ticket_payload()?),
        })
    }

    /// Aggregate the session into a submission, validating every field.
    pub fn ticket_payload(&self) -> Result<TicketPayload> {
        let info = &self.session.basic_info;
        validation::validate_basic_info(info, self.clock.today())?;
        validation::validate_categories(&self.session.categories)?;
        validation::validate_images(&self.session.image_upload)?;

        let (Some(date), Some(jobsite_id), Some(truck_id)) =
            (info.date, info.jobsite_id.clone(), info.truck_id.clone())
        else {
            return Err(AppError::Validation(
                "Please complete Basic Info.".to_string(),
            ));
        };

        Ok(TicketPayload {
            date,
            jobsite_id: jobsite_id.trim().to_string(),
            truck_id: truck_id.trim().to_string(),
            categories: self.session.categories.clone(),
            images: self
                .session
                .image_upload
                .iter()
                .map(TicketImage::from)
                .collect(),
        })
    }

    // ─── Submission ──────────────────────────────────────────────

    /// Send the finished ticket.
    ///
    /// On success the wizard is cleared. On failure the session is left as
    /// it was so the user can retry.
    pub async fn submit_ticket(&mut self, api: &dyn TicketApi) -> Result<TicketId> {
        let payload = self.ticket_payload()?;

        self.session.is_submitting = true;
        let result = api.finalize(&payload).await;
        self.session.is_submitting = false;

        match result {
            Ok(id) => {
                tracing::info!(ticket_id = %id, jobsite = %payload.jobsite_id, "Ticket submitted");
                self.clear_wizard();
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ticket submission failed, keeping wizard data");
                Err(e)
            }
        }
    }
}
