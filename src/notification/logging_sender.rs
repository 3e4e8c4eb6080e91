//! A sender that logs notifications instead of delivering them.
//!
//! Used when `provider.dry_run` is set, so the HTTP surface and the dispatch
//! rules can be exercised locally without provider credentials.

use crate::core::{DispatchOutcome, NotificationPayload, NotificationSender};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

/// Logs every payload and reports it as delivered.
#[derive(Debug, Default, Clone)]
pub struct LoggingSender;

#[async_trait]
impl NotificationSender for LoggingSender {
    fn name(&self) -> &str {
        "dry-run"
    }

    #[instrument(skip_all, fields(count = payload.recipients.len()))]
    async fn send(&self, payload: &NotificationPayload) -> Result<DispatchOutcome> {
        info!(
            recipients = ?payload.recipients.as_slice(),
            title = %payload.title,
            body = %payload.body,
            data = ?payload.data,
            "Dry run: notification not sent"
        );
        Ok(DispatchOutcome::delivered(
            payload.recipients.len(),
            Some(json!({ "dry_run": true, "recipients": payload.recipients.len() })),
        ))
    }
}
