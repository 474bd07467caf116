//! Domain types shared across the analysis, payout, and route layers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// An insurable weather peril.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Peril {
    Drought,
    Flood,
    Wind,
    Hail,
}

impl std::fmt::Display for Peril {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Peril::Drought => write!(f, "drought"),
            Peril::Flood => write!(f, "flood"),
            Peril::Wind => write!(f, "wind"),
            Peril::Hail => write!(f, "hail"),
        }
    }
}

/// The peril (or all perils) a policy insures against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Drought,
    Flood,
    Wind,
    Hail,
    MultiPeril,
}

impl CoverageType {
    /// Whether a trigger event of `peril` falls under this coverage.
    pub fn covers(&self, peril: Peril) -> bool {
        match self {
            CoverageType::MultiPeril => true,
            CoverageType::Drought => peril == Peril::Drought,
            CoverageType::Flood => peril == Peril::Flood,
            CoverageType::Wind => peril == Peril::Wind,
            CoverageType::Hail => peril == Peril::Hail,
        }
    }
}

/// Four-level ordinal severity classification of a trigger event.
///
/// Derived `Ord` follows declaration order: low < medium < high < extreme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Extreme,
}

impl Severity {
    /// Numeric rank used for dedup ordering (low = 1 .. extreme = 4).
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Extreme => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Extreme => write!(f, "extreme"),
        }
    }
}

/// One reading from a weather station.
///
/// Fields absent from the provider payload default to zero, except
/// accumulated precipitation which is genuinely optional: many stations
/// report only a rate, and the flood scorer falls back accordingly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Observation {
    /// Air temperature in °C
    #[serde(default)]
    pub temperature: f64,
    /// Relative humidity in % (0–100)
    #[serde(default)]
    pub humidity: f64,
    /// Barometric pressure in hPa
    #[serde(default)]
    pub pressure: f64,
    /// Sustained wind speed in m/s
    #[serde(default)]
    pub wind_speed: f64,
    /// Wind gust speed in m/s
    #[serde(default)]
    pub wind_gust: f64,
    /// Precipitation rate in mm/h
    #[serde(default)]
    pub precipitation_rate: f64,
    /// Accumulated precipitation in mm over the reporting period
    #[serde(default)]
    pub precipitation_accumulated: Option<f64>,
}

/// A calendar day's observation within a historical series.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub observation: Observation,
}

/// A detected, time-bounded occurrence of a peril.
///
/// Immutable once created; the deduplicator may drop an event but never
/// mutates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TriggerEvent {
    pub event_type: Peril,
    pub severity: Severity,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Event duration in whole days (≥ 1)
    pub duration: u32,
    /// Peril-specific peak reading (°C for drought, mm/h for flood/hail, m/s for wind)
    pub peak_value: f64,
    /// Secondary reading; for drought this carries the run's minimum
    /// humidity, a long-standing field-name mismatch that payout tooling
    /// downstream depends on.
    pub average_value: f64,
    /// Static per-peril affected radius in metres
    pub affected_area_m: u32,
}

/// Per-peril risk scores on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RiskScores {
    pub drought: u8,
    pub flood: u8,
    pub wind: u8,
    pub hail: u8,
}

/// Aggregate analysis result for one station over one lookback window.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeatherAnalysis {
    pub station_id: String,
    pub analysis_date: NaiveDate,
    /// Lookback window label, e.g. "7d" or "30d"
    pub period: String,
    pub risk_scores: RiskScores,
    pub trigger_events: Vec<TriggerEvent>,
    /// Filled in by the payout evaluator, never by the aggregator.
    pub payout_recommendation: Option<PayoutRecommendation>,
}

/// Per-coverage-type contractual thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PolicyThresholds {
    pub drought: DroughtThresholds,
    pub flood: FloodThresholds,
    pub wind: WindThresholds,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct DroughtThresholds {
    /// Minimum consecutive dry days before a payout qualifies
    pub days: u32,
    /// Humidity floor in % below which a day counts as dry
    pub humidity_threshold: f64,
    /// Temperature ceiling in °C above which a day counts as dry
    pub temperature_threshold: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct FloodThresholds {
    /// Window length in days for cumulative rainfall
    pub days: u32,
    /// Peak precipitation rate in mm/h that qualifies a payout
    pub precipitation_threshold: f64,
    /// Cumulative rainfall in mm over the window
    pub cumulative_threshold: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct WindThresholds {
    /// Number of qualifying wind occurrences
    pub occurrences: u32,
    /// Sustained wind speed in m/s that qualifies a payout
    pub wind_speed_threshold: f64,
    /// Gust speed in m/s
    pub gust_threshold: f64,
}

/// An insurance policy held against a weather station.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Policy {
    pub id: Uuid,
    pub station_id: String,
    pub holder_name: String,
    pub coverage_type: CoverageType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
    /// Insured amount in currency units
    pub coverage_amount: Decimal,
    /// Payout-percentage floor (0–100); payouts are net of this
    pub deductible_pct: f64,
    pub thresholds: PolicyThresholds,
}

/// Terminal, reportable payout decision for one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayoutRecommendation {
    pub policy_id: Uuid,
    pub event_type: Peril,
    pub severity: Severity,
    /// Recommended payout in currency units, net of the deductible
    pub payout_amount: Decimal,
    /// Payout percentage after subtracting the deductible (0–100)
    pub payout_percentage: f64,
    pub justification: String,
    /// The trigger event(s) backing the decision
    pub evidence_data: Vec<TriggerEvent>,
}

/// Instantaneous per-peril risk computed from a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InstantRisk {
    pub flood_risk: u8,
    pub wind_risk: u8,
    pub drought_risk: u8,
}

/// A weather station as listed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: StationLocation,
}

/// Station coordinates (WGS84).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct StationLocation {
    pub lat: f64,
    pub lon: f64,
}
