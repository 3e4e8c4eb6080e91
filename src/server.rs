//! # HTTP Server
//!
//! The `axum` router exposing one POST endpoint per alert kind. Handlers do
//! no work of their own: they parse the body into an `AlertRequest`, hand it
//! to the `AlertDispatcher` and serialize the `DispatchReport`.
//!
//! Status mapping:
//! - 400 for validation errors (no outbound call was made)
//! - 200 whenever the dispatch ran, even if the provider rejected it
//! - 500 for unexpected sender errors
//!
//! All routes allow any origin. Preflight requests are answered with
//! 204 No Content.

use crate::core::{AlertKind, DispatchOutcome};
use crate::dispatch::{AlertDispatcher, DispatchError, DispatchReport};
use crate::internal_metrics::Metrics;
use crate::request::{AlertRequest, ValidationError};
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

/// Shared, read-only state for all handlers.
pub struct AppState {
    pub dispatcher: AlertDispatcher,
    pub metrics: Metrics,
    pub prometheus: Option<PrometheusHandle>,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/sendEmergencyAlert", post(send_emergency_alert))
        .route("/sendSafetyCheckAlert", post(send_safety_check_alert))
        .route("/sendLocationUpdate", post(send_location_update))
        .route("/sendLowBatteryAlert", post(send_low_battery_alert))
        .route("/testNotification", post(test_notification))
        .route("/health", get(health));

    if state.prometheus.is_some() {
        app = app.route("/metrics", get(render_metrics));
    }

    app.with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(preflight_no_content))
}

async fn send_emergency_alert(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_alert(&state, AlertKind::Emergency, body).await
}

async fn send_safety_check_alert(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_alert(&state, AlertKind::SafetyCheck, body).await
}

async fn send_location_update(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_alert(&state, AlertKind::LocationUpdate, body).await
}

async fn send_low_battery_alert(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_alert(&state, AlertKind::LowBattery, body).await
}

async fn test_notification(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    handle_alert(&state, AlertKind::Test, body).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn handle_alert(state: &AppState, kind: AlertKind, body: Bytes) -> Response {
    info!(%kind, "Alert request received");
    debug!(%kind, body = %String::from_utf8_lossy(&body), "Alert request body");

    match dispatch(state, kind, &body).await {
        Ok(report) => {
            info!(
                %kind,
                success = report.success,
                contacts = report.recipient_count,
                "Alert dispatched"
            );
            (StatusCode::OK, Json(AlertResponse::from(&report))).into_response()
        }
        Err(e) => {
            match &e {
                DispatchError::Validation(v) => warn!(%kind, error = %v, "Rejected alert request"),
                DispatchError::Internal(err) => error!(%kind, error = ?err, "Error dispatching alert"),
            }
            e.into_response()
        }
    }
}

async fn dispatch(
    state: &AppState,
    kind: AlertKind,
    body: &[u8],
) -> Result<DispatchReport, DispatchError> {
    let request = parse_body(body)
        .and_then(|value| AlertRequest::parse(kind, value))
        .map_err(|e| {
            state.metrics.increment_alerts_rejected(kind);
            e
        })?;
    state.dispatcher.handle(request).await
}

/// An empty body is treated as `{}` so that missing fields, not the JSON
/// parser, decide the error message.
fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

/// Rewrites successful CORS preflight answers to 204.
async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "success": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertResponse<'a> {
    success: bool,
    message: String,
    onesignal_result: Option<&'a Value>,
    contacts_notified: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmation: Option<ConfirmationResponse<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationResponse<'a> {
    delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    onesignal_result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl<'a> From<&'a DispatchReport> for AlertResponse<'a> {
    fn from(report: &'a DispatchReport) -> Self {
        Self {
            success: report.success,
            message: report.message(),
            onesignal_result: report.provider_response(),
            contacts_notified: report.recipient_count,
            error: report.error(),
            confirmation: report.confirmation.as_ref().map(ConfirmationResponse::from),
        }
    }
}

impl<'a> From<&'a DispatchOutcome> for ConfirmationResponse<'a> {
    fn from(outcome: &'a DispatchOutcome) -> Self {
        Self {
            delivered: outcome.delivered,
            onesignal_result: outcome.provider_response.as_ref(),
            error: outcome.error.as_deref(),
        }
    }
}
