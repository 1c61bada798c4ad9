// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ticket wizard session model.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum WizardStep {
    BasicInfo,
    Categories,
    ImageUpload,
    Confirmation,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::BasicInfo,
        WizardStep::Categories,
        WizardStep::ImageUpload,
        WizardStep::Confirmation,
    ];

    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::BasicInfo => Some(WizardStep::Categories),
            WizardStep::Categories => Some(WizardStep::ImageUpload),
            WizardStep::ImageUpload => Some(WizardStep::Confirmation),
            WizardStep::Confirmation => None,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::BasicInfo => None,
            WizardStep::Categories => Some(WizardStep::BasicInfo),
            WizardStep::ImageUpload => Some(WizardStep::Categories),
            WizardStep::Confirmation => Some(WizardStep::ImageUpload),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Basic Info",
            WizardStep::Categories => "Categories",
            WizardStep::ImageUpload => "Image Upload",
            WizardStep::Confirmation => "Confirmation",
        }
    }

    /// Path segment used by the checkpoint endpoint.
    pub fn slug(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "basic-info",
            WizardStep::Categories => "categories",
            WizardStep::ImageUpload => "image-upload",
            WizardStep::Confirmation => "confirmation",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The six ticket categories counted on step 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Category {
    Hangers,
    Leaners,
    Flats,
    Barricades,
    Cones,
    Signs,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Hangers,
        Category::Leaners,
        Category::Flats,
        Category::Barricades,
        Category::Cones,
        Category::Signs,
    ];
}

/// Inclusive bounds for a category count.
pub const CATEGORY_MIN: i32 = 0;
pub const CATEGORY_MAX: i32 = 150;

/// Maximum number of images attached to one ticket.
pub const MAX_IMAGES: usize = 10;

/// Step 1 fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub date: Option<NaiveDate>,
    pub jobsite_id: Option<String>,
    pub truck_id: Option<String>,
}

impl BasicInfo {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.jobsite_id.as_deref().unwrap_or("").is_empty()
            && self.truck_id.as_deref().unwrap_or("").is_empty()
    }
}

/// A single field update on step 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicInfoField {
    Date(NaiveDate),
    JobsiteId(String),
    TruckId(String),
}

/// An image attached on step 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImageReference {
    /// Hex SHA-256 of the image content
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    /// Size in bytes
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub size: u64,
    /// `data:` URL for local preview
    pub preview_url: String,
    /// Location after upload, if uploaded
    pub remote_url: Option<String>,
}

impl ImageReference {
    /// Build a reference from raw image bytes.
    pub fn from_bytes(file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        Self {
            id: hex::encode(Sha256::digest(bytes)),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            preview_url: format!("data:{};base64,{}", content_type, BASE64.encode(bytes)),
            remote_url: None,
        }
    }

    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }
}

/// In-progress ticket submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSession {
    pub current_step: WizardStep,
    #[serde(default)]
    pub basic_info: BasicInfo,
    /// Counts per category. A key is present once the user has set it.
    #[serde(default)]
    pub categories: BTreeMap<Category, i32>,
    #[serde(default)]
    pub image_upload: Vec<ImageReference>,
    pub last_updated: DateTime<Utc>,
    /// True only while the finalize request is in flight
    #[serde(skip)]
    pub is_submitting: bool,
}

impl WizardSession {
    /// An empty session on step 1.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_step: WizardStep::BasicInfo,
            basic_info: BasicInfo::default(),
            categories: BTreeMap::new(),
            image_upload: Vec::new(),
            last_updated: now,
            is_submitting: false,
        }
    }

    /// True if no field has been filled in.
    pub fn is_blank(&self) -> bool {
        self.basic_info.is_empty() && self.categories.is_empty() && self.image_upload.is_empty()
    }
}
