// ABOUTME: Best-effort change-event publication
// ABOUTME: DataChangeMessage fan-out over a broadcast channel; failures never fail the request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

//! # Change Events
//!
//! Mutating handlers announce what happened so downstream consumers
//! (notifiers, search indexers) can react. Publication is strictly
//! best-effort: a publish failure is logged and the request succeeds
//! anyway.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChangeEventType {
    UserSignedUp,
    UserLoggedIn,
    UserLoggedOut,
    UserArchived,
    TwoFactorSecretVerified,
    TwoFactorSecretChanged,
    PasswordChanged,
    AvatarUpdated,
    OAuth2ClientCreated,
    OAuth2ClientArchived,
}

/// A change announcement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChangeMessage {
    pub event_type: DataChangeEventType,
    pub user_id: Option<String>,
    pub household_id: Option<String>,
    /// Free-form details; never carries secret material
    #[serde(default)]
    pub context: HashMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl DataChangeMessage {
    #[must_use]
    pub fn new(event_type: DataChangeEventType) -> Self {
        Self {
            event_type,
            user_id: None,
            household_id: None,
            context: HashMap::new(),
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn with_household(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = Some(household_id.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Sink for change announcements.
pub trait DataChangesPublisher: Send + Sync {
    /// Publish a message. Must not fail the caller; implementations swallow
    /// and log their own errors.
    fn publish(&self, message: DataChangeMessage);
}

/// Publisher backed by a tokio broadcast channel.
pub struct ChannelPublisher {
    sender: broadcast::Sender<DataChangeMessage>,
}

impl ChannelPublisher {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a consumer.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DataChangeMessage> {
        self.sender.subscribe()
    }
}

impl DataChangesPublisher for ChannelPublisher {
    fn publish(&self, message: DataChangeMessage) {
        tracing::debug!(event_type = ?message.event_type, "publishing data change");
        if let Err(e) = self.sender.send(message) {
            tracing::debug!(error = %e, "data change had no consumers");
        }
    }
}

/// Publisher that discards everything; used by tests.
#[derive(Default)]
pub struct NoopPublisher;

impl DataChangesPublisher for NoopPublisher {
    fn publish(&self, _message: DataChangeMessage) {}
}
