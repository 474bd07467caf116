//! Automation-facing HTTP endpoints.
//!
//! - GET /api/v1/alerts — current alert sweep across stations
//! - GET /api/v1/automation/status — background payout sweeper state

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::alerts::{sweep_alerts, WeatherAlert};
use crate::services::sweeper::{SharedSweeperState, SweeperState};

/// Alert sweep response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AlertsResponse {
    /// When the sweep ran (ISO 8601)
    pub timestamp: String,
    pub alert_count: usize,
    pub alerts: Vec<WeatherAlert>,
}

/// Sweep all stations for current weather alerts.
///
/// Scores each station's latest observation; any peril whose snapshot
/// score crosses the alert line produces one alert entry. Stations whose
/// reading can't be fetched are skipped.
#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    tag = "Automation",
    responses(
        (status = 200, description = "Current weather alerts", body = AlertsResponse),
        (status = 502, description = "Station provider unreachable", body = ErrorResponse),
    )
)]
pub async fn get_alerts(State(state): State<AppState>) -> Result<Json<AlertsResponse>, AppError> {
    let alerts = sweep_alerts(&state.wxm).await?;

    Ok(Json(AlertsResponse {
        timestamp: Utc::now().to_rfc3339(),
        alert_count: alerts.len(),
        alerts,
    }))
}

/// Get the current payout sweeper status.
///
/// Returns per-station info (risk scores, last result) and global info
/// (next wakeup, last completed sweep, recommendations from the most
/// recent cycle).
#[utoipa::path(
    get,
    path = "/api/v1/automation/status",
    tag = "Automation",
    responses(
        (status = 200, description = "Current sweeper status", body = SweeperState),
    )
)]
pub async fn get_sweeper_status(State(state): State<SharedSweeperState>) -> Json<SweeperState> {
    let s = state.read().await;
    Json(s.clone())
}
