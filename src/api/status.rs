use axum::{extract::State, response::Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::services::RendererHandle;

pub const SERVICE_NAME: &str = "HTML2PDF Converter";

/// Liveness report
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "OK"
    pub status: String,
    /// Service identity
    pub service: String,
    /// Seconds since the service started
    pub uptime: f64,
    /// Current time (RFC 3339)
    pub timestamp: String,
    /// Whether the browser process is ready for conversions
    pub browser: bool,
}

/// Liveness check
///
/// Always answers 200; check `browser` to learn whether conversions can
/// currently succeed.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse),
    ),
    tag = "Status"
)]
pub async fn handle_health(
    State(renderer): State<Arc<RendererHandle>>,
    State(started_at): State<Instant>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        service: SERVICE_NAME.to_string(),
        uptime: started_at.elapsed().as_secs_f64(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        browser: renderer.is_ready().await,
    })
}

/// Service description
///
/// Lists the endpoints and the accepted conversion options.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Static service description"),
    ),
    tag = "Status"
)]
pub async fn handle_info() -> Json<Value> {
    Json(service_info())
}

pub fn service_info() -> Value {
    json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "convert": "POST /convert",
            "health": "GET /health",
            "docs": "GET /swagger-ui"
        },
        "usage": {
            "method": "POST",
            "url": "/convert",
            "body": {
                "html": "string (required) - HTML content to convert",
                "filename": "string (optional) - Output filename",
                "options": {
                    "format": "string (optional) - A0-A6, Letter, Legal, Tabloid, Ledger (default: A4)",
                    "marginTop": "string (optional) - Top margin, units mm/cm/in/px (default: 20mm)",
                    "marginRight": "string (optional) - Right margin (default: 20mm)",
                    "marginBottom": "string (optional) - Bottom margin (default: 20mm)",
                    "marginLeft": "string (optional) - Left margin (default: 20mm)",
                    "printBackground": "boolean (optional) - Include backgrounds (default: true)"
                }
            }
        }
    })
}
