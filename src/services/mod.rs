// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - wizard, recovery and auth logic.

pub mod auth;
pub mod claims;
pub mod identity;
pub mod navigation;
pub mod recovery;
pub mod ticket_api;
pub mod validation;
pub mod wizard;

pub use auth::{AuthEvent, AuthTokenCoordinator, RefreshTrigger};
pub use identity::{HttpIdentityProvider, IdentityProvider, SignInGrant, TokenGrant};
pub use navigation::WizardNavigator;
pub use recovery::{RecoveryPrompt, SessionRecoveryCoordinator};
pub use ticket_api::{HttpTicketApi, TicketApi, TicketClient};
pub use wizard::WizardSessionStore;
