//! Implementations of `NotificationSender`.
//!
//! The dispatcher only sees the trait; which sender backs it is decided once
//! at startup from the provider configuration.
pub mod logging_sender;
pub mod onesignal;

use crate::config::ProviderConfig;
use crate::core::NotificationSender;
use anyhow::Result;
use std::sync::Arc;

pub use logging_sender::LoggingSender;
pub use onesignal::OneSignalClient;

/// Builds the sender selected by the provider configuration.
pub fn sender_from_config(config: &ProviderConfig) -> Result<Arc<dyn NotificationSender>> {
    if config.dry_run {
        Ok(Arc::new(LoggingSender))
    } else {
        Ok(Arc::new(OneSignalClient::new(config)?))
    }
}
