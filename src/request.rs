//! Parsing and validation of inbound alert bodies.
//!
//! Clients post loosely-shaped JSON. This module turns a body into one
//! `AlertRequest` variant per alert kind, coercing what can be coerced and
//! rejecting only what the kind actually requires. The dispatcher never
//! looks at raw JSON.

use crate::core::{AlertKind, Contact};
use serde::Deserialize;
use serde_json::{Number, Value};
use thiserror::Error;

/// Client-side problems with a request. All map to HTTP 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Missing required fields: {0}")]
    MissingFields(&'static str),

    #[error("No valid player IDs found in emergency contacts")]
    NoRecipients,

    #[error("Missing playerId")]
    MissingPlayerId,
}

/// The wire shape shared by every endpoint. Every field is optional here;
/// which ones matter is decided per kind in `AlertRequest::parse`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAlertBody {
    user_player_id: Option<Value>,
    emergency_contacts: Option<Value>,
    player_id: Option<Value>,
    message: Option<Value>,
    status: Option<Value>,
    location: Option<Value>,
    location_name: Option<Value>,
    user_name: Option<Value>,
    battery_level: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyAlert {
    pub sender_id: String,
    pub contacts: Vec<Contact>,
    pub location: Option<String>,
    pub message: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SafetyCheckAlert {
    pub sender_id: Option<String>,
    pub contacts: Vec<Contact>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationUpdateAlert {
    pub sender_id: Option<String>,
    pub contacts: Vec<Contact>,
    pub location: Option<String>,
    pub location_name: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LowBatteryAlert {
    pub sender_id: Option<String>,
    pub contacts: Vec<Contact>,
    /// Percent, 0-100 expected. Not range-checked.
    pub battery_level: Option<Number>,
    pub location: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestAlert {
    pub recipient_id: String,
}

/// A validated request, one variant per alert kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertRequest {
    Emergency(EmergencyAlert),
    SafetyCheck(SafetyCheckAlert),
    LocationUpdate(LocationUpdateAlert),
    LowBattery(LowBatteryAlert),
    Test(TestAlert),
}

impl AlertRequest {
    /// Validates `body` as a request of the given kind.
    pub fn parse(kind: AlertKind, body: Value) -> Result<Self, ValidationError> {
        if !body.is_object() {
            return Err(ValidationError::MalformedBody(
                "expected a JSON object".to_string(),
            ));
        }
        let raw: RawAlertBody = serde_json::from_value(body)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;

        let request = match kind {
            AlertKind::Emergency => {
                let sender_id = identifier(raw.user_player_id);
                let contacts = contact_list(raw.emergency_contacts);
                let (Some(sender_id), Some(contacts)) = (sender_id, contacts) else {
                    return Err(ValidationError::MissingFields(
                        "userPlayerId, emergencyContacts",
                    ));
                };
                AlertRequest::Emergency(EmergencyAlert {
                    sender_id,
                    contacts,
                    location: text(raw.location),
                    message: text(raw.message),
                    display_name: text(raw.user_name),
                })
            }
            AlertKind::SafetyCheck => AlertRequest::SafetyCheck(SafetyCheckAlert {
                sender_id: identifier(raw.user_player_id),
                contacts: contact_list(raw.emergency_contacts).unwrap_or_default(),
                status: text(raw.status),
                location: text(raw.location),
                display_name: text(raw.user_name),
            }),
            AlertKind::LocationUpdate => AlertRequest::LocationUpdate(LocationUpdateAlert {
                sender_id: identifier(raw.user_player_id),
                contacts: contact_list(raw.emergency_contacts).unwrap_or_default(),
                location: text(raw.location),
                location_name: text(raw.location_name),
                display_name: text(raw.user_name),
            }),
            AlertKind::LowBattery => AlertRequest::LowBattery(LowBatteryAlert {
                sender_id: identifier(raw.user_player_id),
                contacts: contact_list(raw.emergency_contacts).unwrap_or_default(),
                battery_level: number(raw.battery_level),
                location: text(raw.location),
                display_name: text(raw.user_name),
            }),
            AlertKind::Test => {
                let recipient_id =
                    identifier(raw.player_id).ok_or(ValidationError::MissingPlayerId)?;
                AlertRequest::Test(TestAlert { recipient_id })
            }
        };
        Ok(request)
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            AlertRequest::Emergency(_) => AlertKind::Emergency,
            AlertRequest::SafetyCheck(_) => AlertKind::SafetyCheck,
            AlertRequest::LocationUpdate(_) => AlertKind::LocationUpdate,
            AlertRequest::LowBattery(_) => AlertKind::LowBattery,
            AlertRequest::Test(_) => AlertKind::Test,
        }
    }

    /// The contact list, empty for the test kind.
    pub fn contacts(&self) -> &[Contact] {
        match self {
            AlertRequest::Emergency(r) => &r.contacts,
            AlertRequest::SafetyCheck(r) => &r.contacts,
            AlertRequest::LocationUpdate(r) => &r.contacts,
            AlertRequest::LowBattery(r) => &r.contacts,
            AlertRequest::Test(_) => &[],
        }
    }
}

/// Recipient identifiers are opaque strings; anything else is unusable.
fn identifier(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Free text. Scalars are rendered, containers and blanks count as absent.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(value: Option<Value>) -> Option<Number> {
    match value? {
        Value::Number(n) => Some(n),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(Number::from(i))
            } else {
                s.parse::<f64>().ok().and_then(Number::from_f64)
            }
        }
        _ => None,
    }
}

/// `None` when the field is missing or not an array. Entries that are not
/// objects or lack a usable `playerId` become contacts without an id.
fn contact_list(value: Option<Value>) -> Option<Vec<Contact>> {
    let Value::Array(items) = value? else {
        return None;
    };
    let contacts = items
        .into_iter()
        .map(|item| match item {
            Value::Object(mut fields) => Contact {
                recipient_id: identifier(fields.remove("playerId")),
            },
            _ => Contact::default(),
        })
        .collect();
    Some(contacts)
}
