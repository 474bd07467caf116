//! Station HTTP endpoints.
//!
//! - GET /api/v1/stations
//! - GET /api/v1/stations/:station_id/risk
//! - GET /api/v1/stations/:station_id/analysis?date=YYYY-MM-DD&days=N

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::models::{InstantRisk, Observation, Station, WeatherAnalysis};
use crate::routes::AppState;
use crate::services::analysis::analyze_station;
use crate::services::risk::instant_risk;

/// Maximum allowed lookback window in days.
const MAX_LOOKBACK_DAYS: u32 = 90;

/// Default lookback window when the query omits `days`.
const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Snapshot score at which the automation view flags a payout.
/// Presentation-layer signal only; the payout evaluator is authoritative.
const PAYOUT_TRIGGER_SCORE: u8 = 80;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalysisQuery {
    /// Analysis date in ISO 8601 format (e.g. "2025-06-30"); defaults to today
    pub date: Option<String>,
    /// Lookback window in days (1–90); defaults to 30
    pub days: Option<u32>,
}

/// Resolve the analysis window from query parameters.
pub(crate) fn parse_analysis_window(params: &AnalysisQuery) -> Result<(NaiveDate, u32), AppError> {
    let date = match &params.date {
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map_err(|e| AppError::BadRequest(format!("Invalid date: {}", e)))?,
        None => Utc::now().date_naive(),
    };

    let days = params.days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
    if days == 0 || days > MAX_LOOKBACK_DAYS {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_LOOKBACK_DAYS
        )));
    }

    Ok((date, days))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Per-peril payout flags in the automation-facing snapshot view.
#[derive(Debug, Serialize, ToSchema)]
pub struct PayoutFlags {
    pub flood: bool,
    pub wind: bool,
    pub drought: bool,
}

/// Instantaneous station risk response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StationRiskResponse {
    pub station_id: String,
    /// Reading time as reported by the station (ISO 8601), when known
    pub timestamp: Option<String>,
    /// Per-peril snapshot scores (0–100)
    pub risks: InstantRisk,
    /// Advisory flags set when a score reaches the automation trigger line
    pub should_trigger_payout: PayoutFlags,
    /// The raw observation the scores were computed from
    pub weather: Observation,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List all stations visible to the configured provider key.
#[utoipa::path(
    get,
    path = "/api/v1/stations",
    tag = "Stations",
    responses(
        (status = 200, description = "Known weather stations", body = Vec<Station>),
        (status = 502, description = "Station provider unreachable", body = ErrorResponse),
    )
)]
pub async fn list_stations(State(state): State<AppState>) -> Result<Json<Vec<Station>>, AppError> {
    let stations = state.wxm.list_stations().await?;
    Ok(Json(stations))
}

/// Get the instantaneous risk snapshot for a station.
///
/// Scores the station's single most recent observation — no history is
/// consulted. Used by live dashboards and automation; the authoritative
/// payout path is the policy evaluate endpoint.
#[utoipa::path(
    get,
    path = "/api/v1/stations/{station_id}/risk",
    tag = "Stations",
    params(
        ("station_id" = String, Path, description = "Station identifier"),
    ),
    responses(
        (status = 200, description = "Current risk snapshot", body = StationRiskResponse),
        (status = 502, description = "Station provider unreachable", body = ErrorResponse),
    )
)]
pub async fn get_station_risk(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
) -> Result<Json<StationRiskResponse>, AppError> {
    let latest = state.wxm.get_latest_observation(&station_id).await?;
    let risks = instant_risk(&latest.observation);

    Ok(Json(StationRiskResponse {
        station_id,
        timestamp: latest.timestamp.map(|dt| dt.to_rfc3339()),
        should_trigger_payout: PayoutFlags {
            flood: risks.flood_risk >= PAYOUT_TRIGGER_SCORE,
            wind: risks.wind_risk >= PAYOUT_TRIGGER_SCORE,
            drought: risks.drought_risk >= PAYOUT_TRIGGER_SCORE,
        },
        risks,
        weather: latest.observation,
    }))
}

/// Run a historical weather analysis for a station.
///
/// Fetches the per-day observation series over the lookback window and
/// returns risk scores plus detected trigger events. The
/// `payout_recommendation` field is always null here — evaluating a
/// specific policy is a separate endpoint.
#[utoipa::path(
    get,
    path = "/api/v1/stations/{station_id}/analysis",
    tag = "Stations",
    params(
        ("station_id" = String, Path, description = "Station identifier"),
        AnalysisQuery,
    ),
    responses(
        (status = 200, description = "Weather analysis over the lookback window", body = WeatherAnalysis),
        (status = 400, description = "Invalid date or window", body = ErrorResponse),
        (status = 502, description = "No observations available for the window", body = ErrorResponse),
    )
)]
pub async fn get_station_analysis(
    State(state): State<AppState>,
    Path(station_id): Path<String>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<WeatherAnalysis>, AppError> {
    let (date, days) = parse_analysis_window(&params)?;
    let analysis = analyze_station(&state.wxm, &station_id, date, days).await?;
    Ok(Json(analysis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analysis_window_defaults() {
        let params = AnalysisQuery {
            date: None,
            days: None,
        };
        let (date, days) = parse_analysis_window(&params).unwrap();
        assert_eq!(days, DEFAULT_LOOKBACK_DAYS);
        assert_eq!(date, Utc::now().date_naive());
    }

    #[test]
    fn test_parse_analysis_window_explicit() {
        let params = AnalysisQuery {
            date: Some("2025-06-30".to_string()),
            days: Some(7),
        };
        let (date, days) = parse_analysis_window(&params).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert_eq!(days, 7);
    }

    #[test]
    fn test_parse_analysis_window_rejects_bad_date() {
        let params = AnalysisQuery {
            date: Some("30/06/2025".to_string()),
            days: None,
        };
        assert!(matches!(
            parse_analysis_window(&params),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_analysis_window_rejects_out_of_range_days() {
        for days in [0, MAX_LOOKBACK_DAYS + 1] {
            let params = AnalysisQuery {
                date: None,
                days: Some(days),
            };
            assert!(
                matches!(parse_analysis_window(&params), Err(AppError::BadRequest(_))),
                "days={} should be rejected",
                days
            );
        }
    }
}
