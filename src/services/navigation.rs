// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wizard step navigation with remote checkpoints.

use crate::error::{AppError, Result};
use crate::models::{TicketId, WizardStep};
use crate::services::ticket_api::TicketApi;
use crate::services::wizard::WizardSessionStore;
use std::sync::Arc;

/// Drives the wizard forward and back, saving each step before leaving it.
#[derive(Clone)]
pub struct WizardNavigator {
    api: Arc<dyn TicketApi>,
}

impl WizardNavigator {
    pub fn new(api: Arc<dyn TicketApi>) -> Self {
        Self { api }
    }

    /// Save the current step and advance.
    ///
    /// Nothing moves unless the step is valid and the checkpoint save
    /// succeeds.
    pub async fn next(&self, wizard: &mut WizardSessionStore) -> Result<WizardStep> {
        let step = wizard.current_step();

        if !wizard.can_proceed_to_next_step() {
            return Err(AppError::Validation(format!(
                "Please complete {} before continuing.",
                step.label()
            )));
        }

        let Some(target) = step.next() else {
            return Err(AppError::Validation(
                "Already on the last step; submit the ticket instead.".to_string(),
            ));
        };

        let payload = wizard.step_payload(step)?;
        if let Err(e) = self.api.save_step(step, &payload).await {
            tracing::warn!(step = %step, error = %e, "Step checkpoint failed, staying put");
            return Err(e);
        }

        wizard.try_set_current_step(target)?;
        tracing::debug!(from = %step, to = %target, "Wizard advanced");
        Ok(target)
    }

    /// Step back without saving. Stays put on the first step.
    pub fn back(&self, wizard: &mut WizardSessionStore) -> WizardStep {
        if let Some(previous) = wizard.current_step().previous() {
            wizard.set_current_step(previous);
        }
        wizard.current_step()
    }

    pub async fn submit(&self, wizard: &mut WizardSessionStore) -> Result<TicketId> {
        wizard.submit_ticket(self.api.as_ref()).await
    }
}
