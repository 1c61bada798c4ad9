// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod ticket;
pub mod user;
pub mod wizard;

pub use ticket::{StepPayload, TicketId, TicketImage, TicketPayload};
pub use user::{AuthSession, Credentials, SessionType, User, UserRole};
pub use wizard::{BasicInfo, BasicInfoField, Category, ImageReference, WizardSession, WizardStep};
