// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Simple Tracker agent
//!
//! Restores the signed-in session, keeps its token fresh, and reports any
//! unfinished ticket left in local storage.

use simple_tracker::{config::Config, services::AuthEvent, TrackerContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        api_url = %config.api_url,
        storage_dir = %config.storage_dir.display(),
        "Starting Simple Tracker agent"
    );

    let ctx = TrackerContext::new(config)?;

    // Log session lifecycle events
    let mut events = ctx.auth.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                AuthEvent::SessionExpired { message } => {
                    tracing::warn!(%message, "Session expired")
                }
                AuthEvent::RedirectToLogin => tracing::info!("Sign-in required"),
                other => tracing::debug!(event = ?other, "Auth event"),
            }
        }
    });

    match ctx.auth.restore().await {
        Some(user) => tracing::info!(user_id = %user.id, "Session restored"),
        None => tracing::info!("No stored session, sign-in required"),
    }
    ctx.auth.start();

    let mut recovery = ctx.recovery();
    if let Some(prompt) = recovery.check().await {
        tracing::info!(
            step = prompt.step_label,
            progress = %prompt.progress,
            last_updated = %prompt.last_updated_relative,
            "Unfinished ticket available to resume"
        );
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    ctx.auth.shutdown().await;
    event_log.abort();
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simple_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
