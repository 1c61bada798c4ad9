// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Step validity predicates and field validators.
//!
//! The predicates (`*_complete`) only decide whether a step may be left.
//! The validators (`validate_*`) check individual inputs before they reach
//! the store and produce `AppError::Validation` with a user-facing message.

use crate::error::{AppError, Result};
use crate::models::wizard::{BasicInfo, Category, ImageReference};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

/// Largest accepted image, in bytes (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Validate)]
struct BasicInfoInput<'a> {
    #[validate(length(min = 1, message = "Please select a jobsite."))]
    jobsite_id: &'a str,
    #[validate(length(min = 1, message = "Please select a truck."))]
    truck_id: &'a str,
}

#[derive(Debug, Validate)]
struct CategoryInput {
    #[validate(range(min = 0, max = 150, message = "Counts must be between 0 and 150."))]
    count: i32,
}

#[derive(Debug, Validate)]
struct ImageSetInput {
    #[validate(range(max = 10, message = "A ticket can have at most 10 images."))]
    count: usize,
}

#[derive(Debug, Validate)]
struct ImageInput<'a> {
    #[validate(length(min = 1, max = 255, message = "Image file name is invalid."))]
    file_name: &'a str,
    #[validate(range(max = 10485760, message = "Images must be 10 MB or smaller."))]
    size: u64,
}

fn to_app_error(errors: ValidationErrors) -> AppError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    messages.dedup();
    AppError::Validation(messages.join(" "))
}

fn present(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

// ─── Step Predicates ─────────────────────────────────────────

/// Step 1: date, jobsite and truck present; date not after `today`.
pub fn basic_info_complete(info: &BasicInfo, today: NaiveDate) -> bool {
    match info.date {
        Some(date) => {
            date <= today
                && !present(&info.jobsite_id).is_empty()
                && !present(&info.truck_id).is_empty()
        }
        None => false,
    }
}

/// Step 2: every category has been set (zero counts as set).
pub fn categories_complete(categories: &BTreeMap<Category, i32>) -> bool {
    Category::ALL.iter().all(|c| categories.contains_key(c))
}

// ─── Field Validators ────────────────────────────────────────

/// Reject dates after `today`.
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(AppError::Validation(
            "Date cannot be in the future.".to_string(),
        ));
    }
    Ok(())
}

/// Full check of step 1 with messages.
pub fn validate_basic_info(info: &BasicInfo, today: NaiveDate) -> Result<()> {
    let date = info
        .date
        .ok_or_else(|| AppError::Validation("Please select a date.".to_string()))?;
    validate_date(date, today)?;

    BasicInfoInput {
        jobsite_id: present(&info.jobsite_id),
        truck_id: present(&info.truck_id),
    }
    .validate()
    .map_err(to_app_error)
}

/// A single counter value must be in [0, 150].
pub fn validate_category_count(count: i32) -> Result<()> {
    CategoryInput { count }.validate().map_err(to_app_error)
}

/// Full check of step 2 with messages.
pub fn validate_categories(categories: &BTreeMap<Category, i32>) -> Result<()> {
    if !categories_complete(categories) {
        return Err(AppError::Validation(
            "Please enter a count for every category.".to_string(),
        ));
    }
    categories
        .values()
        .try_for_each(|count| validate_category_count(*count))
}

/// Image list: at most 10, each a bounded-size image.
pub fn validate_images(images: &[ImageReference]) -> Result<()> {
    ImageSetInput {
        count: images.len(),
    }
    .validate()
    .map_err(to_app_error)?;

    for image in images {
        ImageInput {
            file_name: &image.file_name,
            size: image.size,
        }
        .validate()
        .map_err(to_app_error)?;

        if !image.content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "{} is not an image.",
                image.file_name
            )));
        }
    }

    Ok(())
}
