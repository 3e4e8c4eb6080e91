// src/formatting.rs

use crate::core::AlertKind;
use crate::request::AlertRequest;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

const DEFAULT_NAME: &str = "Someone";

/// Title, body and routing data for one notification, before recipients are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub data: Map<String, Value>,
}

/// Renders the per-kind notification text.
#[derive(Debug, Clone)]
pub struct ContentFormatter {
    emoji_titles: bool,
}

impl Default for ContentFormatter {
    fn default() -> Self {
        Self { emoji_titles: true }
    }
}

impl ContentFormatter {
    pub fn new(emoji_titles: bool) -> Self {
        Self { emoji_titles }
    }

    fn title(&self, emoji: &str, text: &str) -> String {
        if self.emoji_titles {
            format!("{} {}", emoji, text)
        } else {
            text.to_string()
        }
    }

    /// Builds the primary notification for a validated request.
    pub fn render(&self, request: &AlertRequest, timestamp: DateTime<Utc>) -> NotificationContent {
        let timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut data = DataBuilder::new(request.kind());

        match request {
            AlertRequest::Emergency(r) => {
                let name = r.display_name.as_deref().unwrap_or(DEFAULT_NAME);
                let body = r.message.clone().unwrap_or_else(|| {
                    format!(
                        "{} has activated an emergency alert. Please check on them immediately!",
                        name
                    )
                });
                data.set("userPlayerId", Some(r.sender_id.as_str()))
                    .set(
                        "location",
                        Some(r.location.as_deref().unwrap_or("Location not available")),
                    )
                    .set("timestamp", Some(timestamp.as_str()))
                    .set(
                        "userName",
                        Some(r.display_name.as_deref().unwrap_or("Unknown User")),
                    );
                NotificationContent {
                    title: self.title("🚨", "EMERGENCY ALERT"),
                    body,
                    data: data.build(),
                }
            }
            AlertRequest::SafetyCheck(r) => {
                let body = format!(
                    "{} has checked in safely. Status: {}. Location: {}",
                    r.display_name.as_deref().unwrap_or(DEFAULT_NAME),
                    r.status.as_deref().unwrap_or("unknown"),
                    r.location.as_deref().unwrap_or("Not provided"),
                );
                data.set("userPlayerId", r.sender_id.as_deref())
                    .set("status", r.status.as_deref())
                    .set("location", r.location.as_deref())
                    .set("timestamp", Some(timestamp.as_str()));
                NotificationContent {
                    title: self.title("🛡️", "Safety Check-In"),
                    body,
                    data: data.build(),
                }
            }
            AlertRequest::LocationUpdate(r) => {
                let shared = r
                    .location_name
                    .as_deref()
                    .or(r.location.as_deref())
                    .unwrap_or("Location shared");
                let body = format!(
                    "{} has shared their location: {}",
                    r.display_name.as_deref().unwrap_or(DEFAULT_NAME),
                    shared
                );
                data.set("userPlayerId", r.sender_id.as_deref())
                    .set("location", r.location.as_deref())
                    .set("locationName", r.location_name.as_deref())
                    .set("timestamp", Some(timestamp.as_str()));
                NotificationContent {
                    title: self.title("📍", "Location Update"),
                    body,
                    data: data.build(),
                }
            }
            AlertRequest::LowBattery(r) => {
                let level = r
                    .battery_level
                    .as_ref()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let body = format!(
                    "{}'s device battery is at {}%. Last known location: {}",
                    r.display_name.as_deref().unwrap_or(DEFAULT_NAME),
                    level,
                    r.location.as_deref().unwrap_or("Unknown"),
                );
                data.set("userPlayerId", r.sender_id.as_deref());
                if let Some(level) = &r.battery_level {
                    data.insert("batteryLevel", Value::Number(level.clone()));
                }
                data.set("location", r.location.as_deref())
                    .set("timestamp", Some(timestamp.as_str()));
                NotificationContent {
                    title: self.title("🔋", "Low Battery Alert"),
                    body,
                    data: data.build(),
                }
            }
            AlertRequest::Test(_) => NotificationContent {
                title: self.title("🧪", "Test Notification"),
                body: "Your alert relay is working! Push provider integration successful."
                    .to_string(),
                data: data.build(),
            },
        }
    }

    /// The acknowledgement echoed back to the sender of an emergency alert.
    pub fn confirmation(&self, contacts_notified: usize) -> NotificationContent {
        let mut data = Map::new();
        data.insert(
            "type".to_string(),
            Value::String("emergency_confirmation".to_string()),
        );
        NotificationContent {
            title: self.title("🆘", "Emergency Alert Sent"),
            body: format!(
                "Your emergency alert has been sent to {} emergency contacts.",
                contacts_notified
            ),
            data,
        }
    }
}

/// Collects `data` entries, skipping absent values.
struct DataBuilder(Map<String, Value>);

impl DataBuilder {
    fn new(kind: AlertKind) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(kind.data_tag().to_string()));
        Self(map)
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.insert(key, Value::String(value.to_string()));
        }
        self
    }

    fn insert(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    fn build(self) -> Map<String, Value> {
        self.0
    }
}
