//! The dispatch engine.
//!
//! `AlertDispatcher::handle` takes one validated request, resolves its
//! recipients, builds the notification, performs the outbound call(s) and
//! reduces them into a `DispatchReport`. It holds no per-request state, so a
//! single instance is shared across all concurrent requests.

use crate::core::{AlertKind, DispatchOutcome, NotificationPayload, NotificationSender, Recipients};
use crate::formatting::{ContentFormatter, NotificationContent};
use crate::internal_metrics::Metrics;
use crate::request::{AlertRequest, ValidationError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The sender failed in a way it could not express as an outcome.
    #[error(transparent)]
    Internal(anyhow::Error),
}

/// The reduced result of one dispatch call.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub kind: AlertKind,
    /// Mirrors `primary.delivered`.
    pub success: bool,
    pub recipient_count: usize,
    /// `None` when there was nobody to send to.
    pub primary: Option<DispatchOutcome>,
    /// Only present for emergency alerts.
    pub confirmation: Option<DispatchOutcome>,
}

impl DispatchReport {
    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::Test => "Test notification sent".to_string(),
            kind => format!("{} sent to {} contacts", kind.label(), self.recipient_count),
        }
    }

    pub fn provider_response(&self) -> Option<&Value> {
        self.primary.as_ref()?.provider_response.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.primary {
            Some(outcome) => outcome.error.as_deref(),
            None => Some("No valid player IDs found in contacts; nothing was sent"),
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Fans validated alerts out to the notification sender.
#[derive(Clone)]
pub struct AlertDispatcher {
    sender: Arc<dyn NotificationSender>,
    formatter: ContentFormatter,
    metrics: Metrics,
    clock: Clock,
}

impl AlertDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, formatter: ContentFormatter, metrics: Metrics) -> Self {
        Self {
            sender,
            formatter,
            metrics,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the timestamp source used for `data.timestamp`.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Dispatches a validated request.
    ///
    /// At most two sender calls are made: the primary alert and, for
    /// emergencies, the confirmation echo to the originator. Nothing is
    /// retried.
    #[instrument(skip_all, fields(kind = %request.kind()))]
    pub async fn handle(&self, request: AlertRequest) -> Result<DispatchReport, DispatchError> {
        let kind = request.kind();
        self.metrics.increment_alerts_received(kind);

        let recipients = match &request {
            AlertRequest::Test(t) => Recipients::single(t.recipient_id.clone()),
            other => Recipients::from_contacts(other.contacts()),
        };

        let Some(recipients) = recipients else {
            if kind == AlertKind::Emergency {
                self.metrics.increment_alerts_rejected(kind);
                return Err(ValidationError::NoRecipients.into());
            }
            warn!(
                contacts = request.contacts().len(),
                "No valid player IDs in contacts; skipping delivery"
            );
            return Ok(DispatchReport {
                kind,
                success: false,
                recipient_count: 0,
                primary: None,
                confirmation: None,
            });
        };

        let content = self.formatter.render(&request, (self.clock)());
        let recipient_count = recipients.len();
        info!(
            recipients = ?recipients.as_slice(),
            "Sending {} to {} recipients", kind, recipient_count
        );

        let primary = self
            .send(payload(recipients, content))
            .await
            .map_err(DispatchError::Internal)?;

        let confirmation = match &request {
            AlertRequest::Emergency(r) => Some(self.confirm(&r.sender_id, recipient_count).await),
            _ => None,
        };

        Ok(DispatchReport {
            kind,
            success: primary.delivered,
            recipient_count,
            primary: Some(primary),
            confirmation,
        })
    }

    /// Sends the emergency confirmation back to the originator. Failures are
    /// folded into the outcome and never fail the request.
    async fn confirm(&self, sender_id: &str, contacts_notified: usize) -> DispatchOutcome {
        let Some(recipients) = Recipients::single(sender_id) else {
            return DispatchOutcome::failed(0, None, "sender has no player ID");
        };
        let content = self.formatter.confirmation(contacts_notified);
        match self.send(payload(recipients, content)).await {
            Ok(outcome) => {
                if !outcome.delivered {
                    warn!(error = ?outcome.error, "Emergency confirmation was not delivered");
                }
                outcome
            }
            Err(e) => {
                error!(error = %e, "Emergency confirmation failed");
                DispatchOutcome::failed(1, None, e.to_string())
            }
        }
    }

    async fn send(&self, payload: NotificationPayload) -> anyhow::Result<DispatchOutcome> {
        let start = Instant::now();
        let result = self.sender.send(&payload).await;
        self.metrics
            .record_provider_request(start.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => self.metrics.increment_notifications_sent(if outcome.delivered {
                "delivered"
            } else {
                "failed"
            }),
            Err(_) => self.metrics.increment_notifications_sent("error"),
        }
        result
    }
}

fn payload(recipients: Recipients, content: NotificationContent) -> NotificationPayload {
    NotificationPayload {
        recipients,
        title: content.title,
        body: content.body,
        data: content.data,
    }
}
