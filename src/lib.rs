/// AlertRelay - a notification-dispatch gateway for personal-safety alerts
///
/// This library validates inbound alert requests, fans them out to the
/// contacts' push installations through a provider, and reports the outcome
/// of every delivery attempt back to the caller.
pub mod notification;

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod formatting;
pub mod internal_metrics;
pub mod request;
pub mod server;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
pub use dispatch::{AlertDispatcher, DispatchError, DispatchReport};
pub use request::{AlertRequest, ValidationError};
