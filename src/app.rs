//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::NotificationSender,
    dispatch::AlertDispatcher,
    formatting::ContentFormatter,
    internal_metrics::{Metrics, MetricsBuilder},
    notification::sender_from_config,
    server::{router, AppState},
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, instrument};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the HTTP server actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        let already_signalled = *shutdown_rx.borrow();
        if !already_signalled {
            shutdown_rx.changed().await.ok();
        }
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;

        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap the push provider for a fake.
pub struct AppBuilder {
    config: Config,
    sender_override: Option<Arc<dyn NotificationSender>>,
    metrics_override: Option<Metrics>,
    clock_override: Option<Clock>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sender_override: None,
            metrics_override: None,
            clock_override: None,
        }
    }

    /// Overrides the notification sender for testing.
    pub fn sender_override(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.sender_override = Some(sender);
        self
    }

    /// Overrides the metrics system for testing.
    pub fn metrics_override(mut self, metrics: Metrics) -> Self {
        self.metrics_override = Some(metrics);
        self
    }

    /// Overrides the timestamp source for testing.
    pub fn clock_override<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock_override = Some(Arc::new(clock));
        self
    }

    /// Builds all components, binds the listener and starts serving.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Initialize Metrics
        // =========================================================================
        let (metrics, prometheus) = match self.metrics_override {
            Some(m) => (m, None),
            None => MetricsBuilder::new(config.metrics.clone()).build(),
        };

        // =========================================================================
        // 2. Instantiate the Sender and Dispatcher
        // =========================================================================
        let sender = match self.sender_override {
            Some(sender) => sender,
            None => sender_from_config(&config.provider)?,
        };
        info!(sender = sender.name(), "Notification sender ready");

        let formatter = ContentFormatter::new(config.formatting.emoji_titles);
        let mut dispatcher = AlertDispatcher::new(sender, formatter, metrics.clone());
        if let Some(clock) = self.clock_override {
            dispatcher = dispatcher.with_clock(move || clock());
        }

        // =========================================================================
        // 3. Start the HTTP Server
        // =========================================================================
        let state = Arc::new(AppState {
            dispatcher,
            metrics,
            prometheus,
        });
        let app = router(state);

        let listener = TcpListener::bind(config.server.listen_address)
            .await
            .with_context(|| format!("failed to bind {}", config.server.listen_address))?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "HTTP server listening");

        let mut server_shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("HttpServer", async move {
            let shutdown = async move {
                let already_signalled = *server_shutdown_rx.borrow();
                if !already_signalled {
                    server_shutdown_rx.changed().await.ok();
                }
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        });

        Ok(App {
            task_manager,
            local_addr,
        })
    }
}
