#![allow(dead_code)]
//! Test helpers for running the full application instance.

use alertrelay::{
    app::AppBuilder, config::Config, core::NotificationSender, internal_metrics::Metrics,
};
use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// A running instance of the application bound to an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown_tx: watch::Sender<bool>,
    app_handle: JoinHandle<Result<()>>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POSTs a JSON body and returns the status and the parsed response body.
    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("request failed");
        let status = response.status();
        let body = response.json::<Value>().await.expect("response was not JSON");
        (status, body)
    }

    /// POSTs a raw body with a JSON content type.
    pub async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request failed");
        let status = response.status();
        let body = response.json::<Value>().await.expect("response was not JSON");
        (status, body)
    }

    /// Shuts down the application and waits for it to terminate.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        self.shutdown_tx.send(true)?;
        match timeout(timeout_duration, self.app_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
        }
    }
}

/// A builder for creating `TestApp` instances with specific configurations.
pub struct TestAppBuilder {
    pub config: Config,
    sender: Option<Arc<dyn NotificationSender>>,
    metrics: Option<Metrics>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = "127.0.0.1:0".parse().unwrap();
        config.provider.app_id = "test-app".to_string();
        config.provider.api_key = "test-key".to_string();
        config.formatting.emoji_titles = false;

        Self {
            config,
            sender: None,
            metrics: Some(Metrics::disabled()),
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Lets the app install its own metrics recorder from the config.
    pub fn with_real_metrics(mut self) -> Self {
        self.metrics = None;
        self
    }

    pub fn with_config_modifier(mut self, modifier: impl FnOnce(&mut Config)) -> Self {
        modifier(&mut self.config);
        self
    }

    pub async fn build(self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut builder = AppBuilder::new(self.config).clock_override(super::fixed_time);
        if let Some(sender) = self.sender {
            builder = builder.sender_override(sender);
        }
        if let Some(metrics) = self.metrics {
            builder = builder.metrics_override(metrics);
        }

        let app = builder.build(shutdown_rx).await?;
        let addr = app.local_addr();
        let app_handle = tokio::spawn(app.run());

        Ok(TestApp {
            addr,
            client: reqwest::Client::new(),
            shutdown_tx,
            app_handle,
        })
    }
}
