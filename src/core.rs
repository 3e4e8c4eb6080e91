//! Core domain types and service traits for AlertRelay
//!
//! This module defines the data structures that flow through a single
//! dispatch call and the trait contract the dispatcher uses to reach the
//! push provider.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The five alert kinds accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Emergency,
    SafetyCheck,
    LocationUpdate,
    LowBattery,
    Test,
}

impl AlertKind {
    /// The tag placed under `data.type` so clients can route the notification.
    pub fn data_tag(self) -> &'static str {
        match self {
            AlertKind::Emergency => "emergency",
            AlertKind::SafetyCheck => "safety_check",
            AlertKind::LocationUpdate => "location_update",
            AlertKind::LowBattery => "low_battery",
            AlertKind::Test => "test",
        }
    }

    /// Human-readable label used in response messages.
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Emergency => "Emergency alert",
            AlertKind::SafetyCheck => "Safety check",
            AlertKind::LocationUpdate => "Location update",
            AlertKind::LowBattery => "Low battery alert",
            AlertKind::Test => "Test notification",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data_tag())
    }
}

/// A candidate recipient taken from the request's contact list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contact {
    /// Push-capable installation identifier. `None` when the input entry
    /// was missing it or carried something unusable.
    pub recipient_id: Option<String>,
}

impl Contact {
    pub fn new(recipient_id: impl Into<String>) -> Self {
        Self {
            recipient_id: Some(recipient_id.into()),
        }
    }
}

/// A non-empty, duplicate-free, insertion-ordered set of recipient identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Derives the recipient set from a contact list, dropping contacts
    /// without an identifier. Returns `None` if nothing usable remains.
    pub fn from_contacts(contacts: &[Contact]) -> Option<Self> {
        Self::from_ids(contacts.iter().filter_map(|c| c.recipient_id.clone()))
    }

    /// Builds a set from raw identifiers. Empty identifiers are skipped.
    pub fn from_ids<I>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut set: Vec<String> = Vec::new();
        for id in ids {
            if !id.is_empty() && !set.contains(&id) {
                set.push(id);
            }
        }
        if set.is_empty() {
            None
        } else {
            Some(Self(set))
        }
    }

    /// A set holding exactly one identifier.
    pub fn single(id: impl Into<String>) -> Option<Self> {
        Self::from_ids(std::iter::once(id.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|r| r == id)
    }
}

/// The provider-agnostic unit of work handed to a `NotificationSender`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub recipients: Recipients,
    pub title: String,
    pub body: String,
    /// Kind tag plus echoed request fields for client-side routing.
    pub data: Map<String, Value>,
}

/// The normalized result of a single outbound delivery call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DispatchOutcome {
    pub delivered: bool,
    pub recipient_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn delivered(recipient_count: usize, provider_response: Option<Value>) -> Self {
        Self {
            delivered: true,
            recipient_count,
            provider_response,
            error: None,
        }
    }

    pub fn failed(
        recipient_count: usize,
        provider_response: Option<Value>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            delivered: false,
            recipient_count,
            provider_response,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers a notification to the push provider.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// A short name for logs and metrics (e.g., "onesignal", "dry-run").
    fn name(&self) -> &str;

    /// Performs exactly one delivery attempt for `payload`.
    ///
    /// # Returns
    /// * `Ok(DispatchOutcome)` for every expected result, including provider
    ///   rejections and transport failures (`delivered == false`)
    /// * `Err` only for conditions the sender could not classify
    async fn send(&self, payload: &NotificationPayload) -> Result<DispatchOutcome>;
}
