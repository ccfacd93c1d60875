//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub email: EmailHealth,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Outgoing email status. Delivery is best-effort, so this never fails the check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EmailHealth {
    pub enabled: bool,
    pub provider: &'static str,
}

/// Simple status response for liveness/readiness checks.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl HealthResponse {
    fn new(database: DatabaseHealth, email: EmailHealth) -> Self {
        Self {
            status: if database.connected { "healthy" } else { "unhealthy" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            email,
        }
    }
}

/// Full health check endpoint.
///
/// Returns database connectivity with round-trip latency and the email
/// delivery mode.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let database = match persistence::db::ping(&state.pool).await {
        Ok(latency) => DatabaseHealth {
            connected: true,
            latency_ms: Some(latency.as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health check database ping failed");
            DatabaseHealth {
                connected: false,
                latency_ms: None,
            }
        }
    };

    if !database.connected {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let email = EmailHealth {
        enabled: state.email.is_enabled(),
        provider: state.config.email.provider.as_str(),
    };

    Ok(Json(HealthResponse::new(database, email)))
}

/// Liveness endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match persistence::db::ping(&state.pool).await {
        Ok(_) => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
