//! A client for delivering notifications through the OneSignal REST API.

use crate::config::ProviderConfig;
use crate::core::{DispatchOutcome, NotificationPayload, NotificationSender};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{error, info, instrument};

/// Single-locale text block (`{"en": ...}`).
#[derive(Debug, Serialize)]
struct Localized<'a> {
    en: &'a str,
}

/// The provider's notification-creation body.
#[derive(Debug, Serialize)]
struct CreateNotification<'a> {
    app_id: &'a str,
    include_player_ids: &'a [String],
    headings: Localized<'a>,
    contents: Localized<'a>,
    data: &'a Map<String, Value>,
    priority: u8,
    sound: &'a str,
}

/// Sends notifications to the OneSignal notification-creation endpoint.
pub struct OneSignalClient {
    http: reqwest::Client,
    api_url: String,
    app_id: String,
    authorization: String,
    priority: u8,
    sound: String,
}

impl OneSignalClient {
    /// Creates a new `OneSignalClient` from the provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(Self {
            http: builder.build()?,
            api_url: config.api_url.clone(),
            app_id: config.app_id.clone(),
            authorization: format!("{} {}", config.auth_scheme, config.api_key),
            priority: config.priority,
            sound: config.sound.clone(),
        })
    }

    fn request_body<'a>(&'a self, payload: &'a NotificationPayload) -> CreateNotification<'a> {
        CreateNotification {
            app_id: &self.app_id,
            include_player_ids: payload.recipients.as_slice(),
            headings: Localized { en: &payload.title },
            contents: Localized { en: &payload.body },
            data: &payload.data,
            priority: self.priority,
            sound: &self.sound,
        }
    }
}

#[async_trait]
impl NotificationSender for OneSignalClient {
    fn name(&self) -> &str {
        "onesignal"
    }

    #[instrument(skip(self, payload), fields(count = payload.recipients.len()))]
    async fn send(&self, payload: &NotificationPayload) -> Result<DispatchOutcome> {
        let recipient_count = payload.recipients.len();
        let response = self
            .http
            .post(&self.api_url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.authorization)
            .json(&self.request_body(payload))
            .send()
            .await;

        let response = match response {
            Ok(res) => res,
            Err(e) => {
                error!(error = %e, "HTTP request to OneSignal failed");
                return Ok(DispatchOutcome::failed(recipient_count, None, e.to_string()));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!(status = %status, error = %e, "Failed to read OneSignal response body");
                return Ok(DispatchOutcome::failed(recipient_count, None, e.to_string()));
            }
        };
        // Keep non-JSON bodies (proxies, HTML error pages) as plain strings.
        let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| Value::String(text.clone()));

        if status.is_success() {
            info!(status = %status, response = %body, "OneSignal response");
            Ok(DispatchOutcome::delivered(recipient_count, Some(body)))
        } else {
            error!(
                status = %status,
                body = %text,
                "Failed to send OneSignal notification"
            );
            Ok(DispatchOutcome::failed(
                recipient_count,
                Some(body),
                format!("provider returned {}: {}", status, text),
            ))
        }
    }
}
