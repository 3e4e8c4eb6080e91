//! Dispatcher behaviour against a scripted sender, without the HTTP layer.

#[path = "../helpers/mod.rs"]
mod helpers;

use alertrelay::{
    core::AlertKind, formatting::ContentFormatter, internal_metrics::Metrics, AlertDispatcher,
    AlertRequest, DispatchError, ValidationError,
};
use helpers::mock_sender::{MockSender, Scripted};
use serde_json::{json, Value};
use std::sync::Arc;

fn dispatcher(sender: &MockSender) -> AlertDispatcher {
    AlertDispatcher::new(
        Arc::new(sender.clone()),
        ContentFormatter::new(false),
        Metrics::disabled(),
    )
    .with_clock(helpers::fixed_time)
}

fn request(kind: AlertKind, body: Value) -> AlertRequest {
    AlertRequest::parse(kind, body).expect("request should validate")
}

fn emergency_body() -> Value {
    json!({
        "userPlayerId": "U1",
        "emergencyContacts": [{ "playerId": "C1" }, { "playerId": "C2" }, {}],
        "message": "help"
    })
}

#[tokio::test]
async fn emergency_fans_out_and_echoes_confirmation() {
    let sender = MockSender::new();

    let report = dispatcher(&sender)
        .handle(request(AlertKind::Emergency, emergency_body()))
        .await
        .unwrap();

    let sent = sender.sent();
    assert_eq!(sent.len(), 2, "primary alert plus confirmation");

    let primary = &sent[0];
    assert_eq!(primary.recipients.as_slice(), ["C1", "C2"]);
    assert_eq!(primary.title, "EMERGENCY ALERT");
    assert_eq!(primary.body, "help");
    assert_eq!(primary.data["type"], json!("emergency"));
    assert_eq!(primary.data["userPlayerId"], json!("U1"));
    assert_eq!(primary.data["timestamp"], json!(helpers::FIXED_TIMESTAMP));

    let confirmation = &sent[1];
    assert_eq!(confirmation.recipients.as_slice(), ["U1"]);
    assert_eq!(confirmation.title, "Emergency Alert Sent");
    assert_eq!(
        confirmation.body,
        "Your emergency alert has been sent to 2 emergency contacts."
    );
    assert_eq!(
        Value::Object(confirmation.data.clone()),
        json!({ "type": "emergency_confirmation" })
    );

    assert!(report.success);
    assert_eq!(report.recipient_count, 2);
    assert_eq!(report.message(), "Emergency alert sent to 2 contacts");
    assert!(report.confirmation.as_ref().unwrap().delivered);
}

#[tokio::test]
async fn emergency_success_reflects_only_the_primary_send() {
    // Primary rejected, confirmation delivered.
    let sender = MockSender::with_script(vec![Scripted::Reject("not subscribed"), Scripted::Deliver]);
    let report = dispatcher(&sender)
        .handle(request(AlertKind::Emergency, emergency_body()))
        .await
        .unwrap();
    assert!(!report.success);
    assert_eq!(report.error(), Some("not subscribed"));
    assert!(report.confirmation.unwrap().delivered);
    assert_eq!(sender.call_count(), 2, "confirmation is sent even if the primary failed");

    // Primary delivered, confirmation rejected.
    let sender = MockSender::with_script(vec![Scripted::Deliver, Scripted::Reject("bad sender id")]);
    let report = dispatcher(&sender)
        .handle(request(AlertKind::Emergency, emergency_body()))
        .await
        .unwrap();
    assert!(report.success);
    assert!(report.error().is_none());
    let confirmation = report.confirmation.unwrap();
    assert!(!confirmation.delivered);
    assert_eq!(confirmation.error.as_deref(), Some("bad sender id"));
}

#[tokio::test]
async fn confirmation_sender_error_is_captured_not_raised() {
    let sender = MockSender::with_script(vec![Scripted::Deliver, Scripted::Fail("socket closed")]);

    let report = dispatcher(&sender)
        .handle(request(AlertKind::Emergency, emergency_body()))
        .await
        .unwrap();

    assert!(report.success);
    let confirmation = report.confirmation.unwrap();
    assert!(!confirmation.delivered);
    assert_eq!(confirmation.error.as_deref(), Some("socket closed"));
}

#[tokio::test]
async fn primary_sender_error_collapses_the_call() {
    let sender = MockSender::with_script(vec![Scripted::Fail("stack exploded")]);

    let err = dispatcher(&sender)
        .handle(request(AlertKind::Emergency, emergency_body()))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Internal(_)));
    assert_eq!(err.to_string(), "stack exploded");
    assert_eq!(sender.call_count(), 1);
}

#[tokio::test]
async fn emergency_without_any_player_id_is_rejected_before_sending() {
    let sender = MockSender::new();
    let body = json!({
        "userPlayerId": "U1",
        "emergencyContacts": [{}, { "name": "Bob" }, { "playerId": "" }]
    });

    let err = dispatcher(&sender)
        .handle(request(AlertKind::Emergency, body))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Validation(ValidationError::NoRecipients)
    ));
    assert_eq!(sender.call_count(), 0);
}

#[tokio::test]
async fn low_battery_sends_once_with_percent_in_body() {
    let sender = MockSender::new();
    let body = json!({
        "userPlayerId": "U1",
        "emergencyContacts": [{ "playerId": "C1" }],
        "batteryLevel": 5
    });

    let report = dispatcher(&sender)
        .handle(request(AlertKind::LowBattery, body))
        .await
        .unwrap();

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients.as_slice(), ["C1"]);
    assert!(sent[0].body.contains("5%"), "body was: {}", sent[0].body);
    assert_eq!(sent[0].title, "Low Battery Alert");
    assert!(report.success);
    assert!(report.confirmation.is_none());
    assert_eq!(report.message(), "Low battery alert sent to 1 contacts");
}

#[tokio::test]
async fn informational_kinds_degrade_to_no_send_without_recipients() {
    for kind in [
        AlertKind::SafetyCheck,
        AlertKind::LocationUpdate,
        AlertKind::LowBattery,
    ] {
        let sender = MockSender::new();
        let body = json!({ "userPlayerId": "U1", "emergencyContacts": [{}] });

        let report = dispatcher(&sender).handle(request(kind, body)).await.unwrap();

        assert!(!report.success, "{kind} should not report success");
        assert_eq!(report.recipient_count, 0);
        assert!(report.primary.is_none());
        assert!(report.error().is_some());
        assert_eq!(sender.call_count(), 0, "{kind} must not send to nobody");
    }
}

#[tokio::test]
async fn malformed_contacts_are_dropped_for_informational_kinds() {
    let sender = MockSender::new();
    let body = json!({
        "emergencyContacts": [{ "playerId": "C1" }, null, "C9", { "playerId": ["x"] }, { "playerId": "C2" }],
        "status": "OK",
        "location": "Park",
        "userName": "Ana"
    });

    let report = dispatcher(&sender)
        .handle(request(AlertKind::SafetyCheck, body))
        .await
        .unwrap();

    let sent = sender.sent();
    assert_eq!(sent[0].recipients.as_slice(), ["C1", "C2"]);
    assert_eq!(
        sent[0].body,
        "Ana has checked in safely. Status: OK. Location: Park"
    );
    assert_eq!(report.recipient_count, 2);
}

#[tokio::test]
async fn test_kind_targets_only_the_given_player() {
    let sender = MockSender::new();

    let report = dispatcher(&sender)
        .handle(request(AlertKind::Test, json!({ "playerId": "P1" })))
        .await
        .unwrap();

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients.as_slice(), ["P1"]);
    assert_eq!(sent[0].title, "Test Notification");
    assert_eq!(Value::Object(sent[0].data.clone()), json!({ "type": "test" }));
    assert_eq!(report.message(), "Test notification sent");
}

#[tokio::test]
async fn no_kind_makes_more_than_two_calls() {
    let bodies = [
        (AlertKind::Emergency, emergency_body()),
        (AlertKind::SafetyCheck, emergency_body()),
        (AlertKind::LocationUpdate, emergency_body()),
        (AlertKind::LowBattery, emergency_body()),
        (AlertKind::Test, json!({ "playerId": "P1" })),
    ];
    for (kind, body) in bodies {
        let sender = MockSender::new();
        dispatcher(&sender).handle(request(kind, body)).await.unwrap();
        let expected = if kind == AlertKind::Emergency { 2 } else { 1 };
        assert_eq!(sender.call_count(), expected, "{kind}");
    }
}
