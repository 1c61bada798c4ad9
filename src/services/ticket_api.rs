// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ticket API client for wizard checkpoints and final submission.

use crate::error::{AppError, Result};
use crate::models::{StepPayload, TicketId, TicketPayload, WizardStep};
use crate::services::auth::{AuthTokenCoordinator, RefreshTrigger};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote endpoints the wizard talks to.
#[async_trait]
pub trait TicketApi: Send + Sync {
    /// Checkpoint one step's data.
    async fn save_step(&self, step: WizardStep, payload: &StepPayload) -> Result<()>;

    /// Create the ticket from the full wizard payload.
    async fn finalize(&self, payload: &TicketPayload) -> Result<TicketId>;
}

/// Low-level ticket API client. Callers supply the bearer token.
#[derive(Clone)]
pub struct TicketClient {
    http: reqwest::Client,
    base_url: String,
}

impl TicketClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// POST {base}/api/tickets/wizard/{step}
    pub async fn save_step(
        &self,
        access_token: &str,
        step: WizardStep,
        payload: &StepPayload,
    ) -> Result<()> {
        let url = format!("{}/api/tickets/wizard/{}", self.base_url, step.slug());

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::TicketApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// POST {base}/api/tickets
    pub async fn create_ticket(
        &self,
        access_token: &str,
        payload: &TicketPayload,
    ) -> Result<TicketId> {
        let url = format!("{}/api/tickets", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::TicketApi(e.to_string()))?;

        let created: CreatedTicket = self.check_response_json(response).await?;
        Ok(created.id)
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 401 {
            return Err(AppError::TicketApi(
                AppError::TICKET_API_UNAUTHORIZED.to_string(),
            ));
        }

        Err(AppError::TicketApi(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(AppError::TicketApi(
                    AppError::TICKET_API_UNAUTHORIZED.to_string(),
                ));
            }

            return Err(AppError::TicketApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::TicketApi(format!("JSON parse error: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct CreatedTicket {
    id: TicketId,
}

/// Ticket API that authenticates through the token coordinator.
///
/// A 401 triggers one forced refresh and a single retry.
#[derive(Clone)]
pub struct HttpTicketApi {
    client: TicketClient,
    auth: AuthTokenCoordinator,
}

impl HttpTicketApi {
    pub fn new(client: TicketClient, auth: AuthTokenCoordinator) -> Self {
        Self { client, auth }
    }
}

#[async_trait]
impl TicketApi for HttpTicketApi {
    async fn save_step(&self, step: WizardStep, payload: &StepPayload) -> Result<()> {
        let token = self.auth.valid_token().await?;
        match self.client.save_step(&token, step, payload).await {
            Err(e) if e.is_ticket_api_auth_error() => {
                tracing::info!(step = %step, "Checkpoint rejected token, refreshing");
                let token = self.auth.refresh_now(RefreshTrigger::Request).await?;
                self.client.save_step(&token, step, payload).await
            }
            other => other,
        }
    }

    async fn finalize(&self, payload: &TicketPayload) -> Result<TicketId> {
        let token = self.auth.valid_token().await?;
        match self.client.create_ticket(&token, payload).await {
            Err(e) if e.is_ticket_api_auth_error() => {
                tracing::info!("Finalize rejected token, refreshing");
                let token = self.auth.refresh_now(RefreshTrigger::Request).await?;
                self.client.create_ticket(&token, payload).await
            }
            other => other,
        }
    }
}
