// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Payloads sent to the ticket API.

use crate::models::wizard::{BasicInfo, Category, ImageReference};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a created ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub String);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image as submitted (no local preview data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketImage {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub url: Option<String>,
}

impl From<&ImageReference> for TicketImage {
    fn from(image: &ImageReference) -> Self {
        Self {
            id: image.id.clone(),
            file_name: image.file_name.clone(),
            size: image.size,
            url: image.remote_url.clone(),
        }
    }
}

/// Aggregated wizard payload sent to the finalize endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    pub date: NaiveDate,
    pub jobsite_id: String,
    pub truck_id: String,
    pub categories: BTreeMap<Category, i32>,
    pub images: Vec<TicketImage>,
}

/// Checkpoint payload for a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepPayload {
    BasicInfo(BasicInfo),
    Categories(BTreeMap<Category, i32>),
    Images(Vec<TicketImage>),
    Ticket(TicketPayload),
}
