// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Simple Tracker: client core for field-crew ticket submission
//!
//! This crate provides the multi-step ticket wizard with durable local
//! session storage and recovery, plus the auth token coordinator that keeps
//! the bearer token fresh while the wizard talks to the ticket API.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

use config::Config;
use services::{
    AuthTokenCoordinator, HttpIdentityProvider, HttpTicketApi, IdentityProvider,
    SessionRecoveryCoordinator, TicketApi, TicketClient, WizardNavigator, WizardSessionStore,
};
use std::sync::Arc;
use storage::{FileStore, KeyValueStore, MemoryStore};
use time_utils::{Clock, SystemClock};

/// Shared application context.
pub struct TrackerContext {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    /// Survives restarts: wizard sessions and remembered logins
    pub storage: Arc<dyn KeyValueStore>,
    /// Process lifetime only: logins without "remember me"
    pub session_storage: Arc<dyn KeyValueStore>,
    pub auth: AuthTokenCoordinator,
    pub ticket_api: Arc<dyn TicketApi>,
}

impl TrackerContext {
    /// Build the context with file storage and HTTP adapters.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let storage: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::open(&config.storage_dir, clock.clone())?);
        let session_storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new(clock.clone()));
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(HttpIdentityProvider::new(&config.identity_url)?);

        let auth = AuthTokenCoordinator::new(
            identity,
            storage.clone(),
            session_storage.clone(),
            clock.clone(),
            config.refresh,
        );
        let ticket_api: Arc<dyn TicketApi> = Arc::new(HttpTicketApi::new(
            TicketClient::new(&config.api_url)?,
            auth.clone(),
        ));

        Ok(Self {
            config,
            clock,
            storage,
            session_storage,
            auth,
            ticket_api,
        })
    }

    /// Build the context from caller-supplied ports.
    pub fn from_parts(
        config: Config,
        clock: Arc<dyn Clock>,
        storage: Arc<dyn KeyValueStore>,
        session_storage: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityProvider>,
        ticket_api: Arc<dyn TicketApi>,
    ) -> Self {
        let auth = AuthTokenCoordinator::new(
            identity,
            storage.clone(),
            session_storage.clone(),
            clock.clone(),
            config.refresh,
        );
        Self {
            config,
            clock,
            storage,
            session_storage,
            auth,
            ticket_api,
        }
    }

    /// Wizard store over the persisted session, if any.
    pub fn wizard(&self) -> WizardSessionStore {
        WizardSessionStore::hydrate(self.storage.clone(), self.clock.clone(), self.config.wizard_ttl)
    }

    pub fn recovery(&self) -> SessionRecoveryCoordinator {
        SessionRecoveryCoordinator::new(
            self.storage.clone(),
            self.clock.clone(),
            self.config.wizard_ttl,
            self.config.recovery_settle_delay,
        )
    }

    pub fn navigator(&self) -> WizardNavigator {
        WizardNavigator::new(self.ticket_api.clone())
    }
}
