//! Automation-facing weather alert sweep.
//!
//! Snapshot-scores the most recent observation of each station and emits
//! an alert per peril whose score crosses the alert line. The
//! `should_trigger_payout` flag is advisory, for automation dashboards —
//! the authoritative payout decision is always the payout evaluator
//! running over a historical analysis.

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{Observation, Peril, Severity, Station, StationLocation};
use crate::services::risk::instant_risk;
use crate::services::wxm::WxmClient;

/// Snapshot score at which a peril becomes an alert.
const ALERT_SCORE: u8 = 60;
/// Snapshot score mapped to high severity.
const HIGH_SCORE: u8 = 70;
/// Snapshot score mapped to extreme severity and the advisory payout flag.
const EXTREME_SCORE: u8 = 80;

/// Stations scanned per sweep; keeps one sweep to a bounded number of
/// provider calls.
const MAX_STATIONS_PER_SWEEP: usize = 10;

/// An alert for one peril at one station.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeatherAlert {
    pub station_id: String,
    pub alert_type: Peril,
    pub severity: Severity,
    /// Current reading driving the alert, in the peril's unit
    pub value: f64,
    /// Nominal threshold the reading is judged against
    pub threshold: f64,
    pub location: StationLocation,
    /// Affected radius in metres
    pub affected_radius_m: u32,
    /// Advisory automation signal; not a payout decision
    pub should_trigger_payout: bool,
}

fn alert_severity(score: u8) -> Severity {
    if score >= EXTREME_SCORE {
        Severity::Extreme
    } else if score >= HIGH_SCORE {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Build the alerts a single station's current observation warrants.
pub fn build_station_alerts(station: &Station, obs: &Observation) -> Vec<WeatherAlert> {
    let risk = instant_risk(obs);
    let mut alerts = Vec::new();

    if risk.flood_risk >= ALERT_SCORE {
        let severity = alert_severity(risk.flood_risk);
        alerts.push(WeatherAlert {
            station_id: station.id.clone(),
            alert_type: Peril::Flood,
            severity,
            value: obs.precipitation_rate,
            threshold: 10.0,
            location: station.location,
            affected_radius_m: 5_000,
            should_trigger_payout: severity >= Severity::High,
        });
    }

    if risk.wind_risk >= ALERT_SCORE {
        let severity = alert_severity(risk.wind_risk);
        alerts.push(WeatherAlert {
            station_id: station.id.clone(),
            alert_type: Peril::Wind,
            severity,
            value: obs.wind_speed.max(obs.wind_gust),
            threshold: 15.0,
            location: station.location,
            affected_radius_m: 8_000,
            should_trigger_payout: severity >= Severity::High,
        });
    }

    if risk.drought_risk >= ALERT_SCORE {
        let severity = alert_severity(risk.drought_risk);
        alerts.push(WeatherAlert {
            station_id: station.id.clone(),
            alert_type: Peril::Drought,
            severity,
            value: obs.temperature,
            threshold: 35.0,
            location: station.location,
            affected_radius_m: 15_000,
            should_trigger_payout: severity >= Severity::High,
        });
    }

    alerts
}

/// Sweep the provider's stations and collect current alerts.
///
/// A station whose latest reading can't be fetched is skipped with a
/// warning; one dead station must not hide alerts from the rest.
pub async fn sweep_alerts(client: &WxmClient) -> Result<Vec<WeatherAlert>, AppError> {
    let stations = client.list_stations().await?;
    let mut alerts = Vec::new();

    for station in stations.iter().take(MAX_STATIONS_PER_SWEEP) {
        let latest = match client.get_latest_observation(&station.id).await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::warn!("Skipping station {} in alert sweep: {}", station.id, e);
                continue;
            }
        };

        alerts.extend(build_station_alerts(station, &latest.observation));
    }

    Ok(alerts)
}
