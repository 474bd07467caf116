//! Background payout sweeper.
//!
//! Periodically re-evaluates every active policy against a fresh
//! historical analysis of its station, so payout recommendations surface
//! even when nobody is calling the API. The original automation hook this
//! replaces polled on an external scheduler; here it is a spawned task.
//!
//! Architecture:
//! - Wakes on a fixed interval, loads active policies from the repository
//! - Groups policies by station and analyzes each station once per window
//! - Evaluates every policy against its station's 30-day analysis; the
//!   7-day scores ride along for dashboards
//! - State is in-memory (`Arc<RwLock<SweeperState>>`), exposed via the
//!   status endpoint

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{PayoutRecommendation, Policy, RiskScores};
use crate::services::analysis::analyze_station;
use crate::services::payout::evaluate_payout;
use crate::services::wxm::WxmClient;
use crate::store::SharedPolicyStore;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Long analysis window evaluated for payouts (days).
const SWEEP_LONG_LOOKBACK_DAYS: u32 = 30;

/// Short analysis window surfaced for dashboards (days).
const SWEEP_SHORT_LOOKBACK_DAYS: u32 = 7;

/// Sleep between sweep cycles (seconds).
const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Sleep after a repository error before retrying (seconds).
const SWEEP_RETRY_SECS: u64 = 300;

/// Sleep when no active policies exist (seconds).
const SWEEP_NO_POLICIES_SLEEP_SECS: u64 = 1800;

// ---------------------------------------------------------------------------
// Sweeper state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Status of a single station's last sweep.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StationSweepStatus {
    pub station_id: String,
    pub policies_evaluated: usize,
    pub risk_scores_30d: Option<RiskScores>,
    pub risk_scores_7d: Option<RiskScores>,
    /// "ok" or "error: ..."
    pub last_sweep_result: String,
}

/// Global sweeper state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SweeperState {
    pub active: bool,
    pub next_wakeup_at: Option<DateTime<Utc>>,
    pub last_sweep_completed_at: Option<DateTime<Utc>>,
    pub last_sweep_duration_ms: Option<u64>,
    pub total_sweeps: u64,
    pub stations: Vec<StationSweepStatus>,
    /// Recommendations produced by the most recent sweep.
    pub recommendations: Vec<PayoutRecommendation>,
}

impl SweeperState {
    pub fn new() -> Self {
        Self {
            active: true,
            next_wakeup_at: None,
            last_sweep_completed_at: None,
            last_sweep_duration_ms: None,
            total_sweeps: 0,
            stations: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

impl Default for SweeperState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared sweeper state handle.
pub type SharedSweeperState = Arc<RwLock<SweeperState>>;

// ---------------------------------------------------------------------------
// Main sweeper loop
// ---------------------------------------------------------------------------

/// Run the background sweeper. This function never returns (runs until
/// process exit). Should be spawned via `tokio::spawn(run_sweeper(...))`.
pub async fn run_sweeper(
    client: WxmClient,
    store: SharedPolicyStore,
    state: SharedSweeperState,
) {
    tracing::info!("Background payout sweeper started");

    loop {
        let sweep_start = Utc::now();

        let policies = match store.list_active().await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Sweeper: failed to load active policies: {}", e);
                sleep_secs(SWEEP_RETRY_SECS).await;
                continue;
            }
        };

        if policies.is_empty() {
            handle_no_policies(&state).await;
            sleep_secs(SWEEP_NO_POLICIES_SLEEP_SECS).await;
            continue;
        }

        let today = Utc::now().date_naive();
        let by_station = group_by_station(policies);

        let mut station_statuses = Vec::with_capacity(by_station.len());
        let mut recommendations = Vec::new();

        for (station_id, station_policies) in &by_station {
            match sweep_station(&client, station_id, station_policies, today).await {
                Ok(outcome) => {
                    recommendations.extend(outcome.recommendations);
                    station_statuses.push(StationSweepStatus {
                        station_id: station_id.clone(),
                        policies_evaluated: station_policies.len(),
                        risk_scores_30d: Some(outcome.risk_scores_30d),
                        risk_scores_7d: outcome.risk_scores_7d,
                        last_sweep_result: "ok".to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Sweeper: station {} failed: {}", station_id, e);
                    station_statuses.push(StationSweepStatus {
                        station_id: station_id.clone(),
                        policies_evaluated: 0,
                        risk_scores_30d: None,
                        risk_scores_7d: None,
                        last_sweep_result: format!("error: {}", e),
                    });
                }
            }
        }

        let sweep_duration_ms = (Utc::now() - sweep_start).num_milliseconds().max(0) as u64;

        {
            let mut s = state.write().await;
            s.stations = station_statuses;
            s.recommendations = recommendations;
            s.next_wakeup_at = Some(Utc::now() + Duration::seconds(SWEEP_INTERVAL_SECS as i64));
            s.last_sweep_completed_at = Some(Utc::now());
            s.last_sweep_duration_ms = Some(sweep_duration_ms);
            s.total_sweeps += 1;
        }

        tracing::info!(
            "Sweeper: cycle complete in {}ms across {} stations, sleeping {}s",
            sweep_duration_ms,
            by_station.len(),
            SWEEP_INTERVAL_SECS,
        );

        sleep_secs(SWEEP_INTERVAL_SECS).await;
    }
}

/// Update state when no active policies exist.
async fn handle_no_policies(state: &SharedSweeperState) {
    tracing::debug!(
        "Sweeper: no active policies, sleeping {} seconds",
        SWEEP_NO_POLICIES_SLEEP_SECS
    );
    let mut s = state.write().await;
    s.stations.clear();
    s.recommendations.clear();
    s.next_wakeup_at =
        Some(Utc::now() + Duration::seconds(SWEEP_NO_POLICIES_SLEEP_SECS as i64));
    s.last_sweep_completed_at = Some(Utc::now());
}

/// Group policies by their station, deterministically ordered.
fn group_by_station(policies: Vec<Policy>) -> BTreeMap<String, Vec<Policy>> {
    let mut by_station: BTreeMap<String, Vec<Policy>> = BTreeMap::new();
    for policy in policies {
        by_station
            .entry(policy.station_id.clone())
            .or_default()
            .push(policy);
    }
    by_station
}

// ---------------------------------------------------------------------------
// Single-station sweep
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StationSweepOutcome {
    risk_scores_30d: RiskScores,
    risk_scores_7d: Option<RiskScores>,
    recommendations: Vec<PayoutRecommendation>,
}

/// Analyze one station and evaluate its policies against the 30-day window.
async fn sweep_station(
    client: &WxmClient,
    station_id: &str,
    policies: &[Policy],
    today: NaiveDate,
) -> Result<StationSweepOutcome, AppError> {
    let analysis_30d =
        analyze_station(client, station_id, today, SWEEP_LONG_LOOKBACK_DAYS).await?;

    // The short window is informational; its failure shouldn't stop
    // evaluation against the long one.
    let risk_scores_7d =
        match analyze_station(client, station_id, today, SWEEP_SHORT_LOOKBACK_DAYS).await {
            Ok(analysis) => Some(analysis.risk_scores),
            Err(e) => {
                tracing::warn!(
                    "Sweeper: 7-day analysis failed for station {}: {}",
                    station_id,
                    e
                );
                None
            }
        };

    let mut recommendations = Vec::new();
    for policy in policies {
        match evaluate_payout(policy, &analysis_30d) {
            Ok(Some(rec)) => {
                tracing::info!(
                    "Sweeper: payout recommended for policy {} ({} {}, {}%)",
                    rec.policy_id,
                    rec.event_type,
                    rec.severity,
                    rec.payout_percentage,
                );
                recommendations.push(rec);
            }
            Ok(None) => {}
            // Unsupported coverage or a bad policy config shouldn't sink
            // the rest of the station's policies.
            Err(e) => {
                tracing::warn!("Sweeper: skipping policy {}: {}", policy.id, e);
            }
        }
    }

    Ok(StationSweepOutcome {
        risk_scores_30d: analysis_30d.risk_scores,
        risk_scores_7d,
        recommendations,
    })
}

/// Async sleep helper.
async fn sleep_secs(secs: u64) {
    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CoverageType, DroughtThresholds, FloodThresholds, PolicyThresholds, WindThresholds,
    };
    use rust_decimal::Decimal;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn policy(station_id: &str, coverage_type: CoverageType) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            station_id: station_id.to_string(),
            holder_name: "Test Holder".to_string(),
            coverage_type,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            active: true,
            coverage_amount: Decimal::from(10_000),
            deductible_pct: 10.0,
            thresholds: PolicyThresholds {
                drought: DroughtThresholds {
                    days: 7,
                    humidity_threshold: 40.0,
                    temperature_threshold: 30.0,
                },
                flood: FloodThresholds {
                    days: 3,
                    precipitation_threshold: 20.0,
                    cumulative_threshold: 50.0,
                },
                wind: WindThresholds {
                    occurrences: 1,
                    wind_speed_threshold: 20.0,
                    gust_threshold: 30.0,
                },
            },
        }
    }

    #[test]
    fn test_group_by_station() {
        let policies = vec![
            policy("st-b", CoverageType::Drought),
            policy("st-a", CoverageType::Wind),
            policy("st-b", CoverageType::Flood),
        ];
        let grouped = group_by_station(policies);
        let stations: Vec<&String> = grouped.keys().collect();
        assert_eq!(stations, vec!["st-a", "st-b"]);
        assert_eq!(grouped["st-b"].len(), 2);
    }

    #[tokio::test]
    async fn test_sweep_station_recommends_drought_payout() {
        let server = MockServer::start().await;
        // Every history day returns the same bone-dry reading, so the
        // 30-day window holds one long qualifying run.
        Mock::given(method("GET"))
            .and(path("/stations/st-1/history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "observation": {
                    "temperature": 36.0,
                    "humidity": 12.0,
                    "precipitation_rate": 0.0
                }
            })))
            .mount(&server)
            .await;

        let client = WxmClient::new(&server.uri(), "secret");
        let policies = vec![
            policy("st-1", CoverageType::Drought),
            // Unsupported coverage is skipped, not fatal.
            policy("st-1", CoverageType::Hail),
        ];

        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let outcome = sweep_station(&client, "st-1", &policies, today)
            .await
            .unwrap();

        assert_eq!(outcome.recommendations.len(), 1);
        let rec = &outcome.recommendations[0];
        assert_eq!(rec.payout_percentage, 90.0);
        assert_eq!(outcome.risk_scores_30d.drought, 100);
        assert_eq!(outcome.risk_scores_7d.unwrap().drought, 61);
    }

    #[tokio::test]
    async fn test_sweep_station_fails_when_station_dark() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stations/st-1/history"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WxmClient::new(&server.uri(), "secret");
        let policies = vec![policy("st-1", CoverageType::Drought)];
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();

        let err = sweep_station(&client, "st-1", &policies, today)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }
}
