//! Payout eligibility evaluation against a policy's contractual thresholds.
//!
//! Takes a finished [`WeatherAnalysis`] plus a [`Policy`] and produces at
//! most one [`PayoutRecommendation`]. Evaluation is first-match-wins over
//! the analysis' event order: later qualifying events are never considered,
//! even when they would pay more (see the regression test pinning this).

use crate::errors::AppError;
use crate::helpers::{dec_to_f64, f64_to_decimal_2dp};
use crate::models::{Peril, Policy, CoverageType, PayoutRecommendation, TriggerEvent, WeatherAnalysis};

/// Evaluate whether `policy` is owed a payout for `analysis`.
///
/// Returns `Ok(None)` when no event qualifies. Hail-only coverage is
/// refused outright with [`AppError::UnsupportedCoverage`]: no payout rule
/// is defined for hail and inventing one here would move real money.
/// Within a multi-peril policy, hail events simply never qualify.
pub fn evaluate_payout(
    policy: &Policy,
    analysis: &WeatherAnalysis,
) -> Result<Option<PayoutRecommendation>, AppError> {
    if policy.coverage_type == CoverageType::Hail {
        return Err(AppError::UnsupportedCoverage(
            "hail coverage has no defined payout rule".to_string(),
        ));
    }

    validate_thresholds(policy)?;

    let relevant: Vec<&TriggerEvent> = analysis
        .trigger_events
        .iter()
        .filter(|event| policy.coverage_type.covers(event.event_type))
        .collect();

    if relevant.is_empty() {
        return Ok(None);
    }

    for event in relevant {
        let (should_payout, payout_percentage) = match event.event_type {
            Peril::Drought => {
                let threshold = policy.thresholds.drought;
                (
                    event.duration >= threshold.days,
                    (event.duration as f64 / threshold.days as f64 * 100.0).min(100.0),
                )
            }
            Peril::Flood => {
                let threshold = policy.thresholds.flood;
                (
                    event.peak_value >= threshold.precipitation_threshold,
                    (event.peak_value / threshold.precipitation_threshold * 100.0).min(100.0),
                )
            }
            Peril::Wind => {
                let threshold = policy.thresholds.wind;
                (
                    event.peak_value >= threshold.wind_speed_threshold,
                    (event.peak_value / threshold.wind_speed_threshold * 100.0).min(100.0),
                )
            }
            // No payout rule defined for hail.
            Peril::Hail => (false, 0.0),
        };

        // Strictly greater: a payout percentage equal to the deductible
        // pays nothing.
        if should_payout && payout_percentage > policy.deductible_pct {
            let net_percentage = payout_percentage - policy.deductible_pct;
            let payout_amount =
                f64_to_decimal_2dp(dec_to_f64(policy.coverage_amount) * net_percentage / 100.0);

            return Ok(Some(PayoutRecommendation {
                policy_id: policy.id,
                event_type: event.event_type,
                severity: event.severity,
                payout_amount,
                payout_percentage: net_percentage,
                justification: format!(
                    "{} event exceeded policy thresholds: {} days duration, peak value {}",
                    event.event_type, event.duration, event.peak_value
                ),
                evidence_data: vec![event.clone()],
            }));
        }
    }

    Ok(None)
}

/// Refuse to evaluate when a threshold this policy divides by is missing
/// its positive value — a zero divisor must surface as a configuration
/// error, not as an Infinity/NaN payout.
fn validate_thresholds(policy: &Policy) -> Result<(), AppError> {
    let thresholds = &policy.thresholds;

    let drought_ok = thresholds.drought.days > 0;
    let flood_ok = thresholds.flood.precipitation_threshold > 0.0;
    let wind_ok = thresholds.wind.wind_speed_threshold > 0.0;

    let valid = match policy.coverage_type {
        CoverageType::Drought => drought_ok,
        CoverageType::Flood => flood_ok,
        CoverageType::Wind => wind_ok,
        CoverageType::MultiPeril => drought_ok && flood_ok && wind_ok,
        // Rejected before validation.
        CoverageType::Hail => true,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidPolicyConfiguration(format!(
            "non-positive threshold for {:?} coverage on policy {}",
            policy.coverage_type, policy.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DroughtThresholds, FloodThresholds, PolicyThresholds, RiskScores, Severity, WindThresholds,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn policy(coverage_type: CoverageType, deductible_pct: f64) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            station_id: "st-1".to_string(),
            holder_name: "Eleni Farms".to_string(),
            coverage_type,
            start_date: d(1),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            active: true,
            coverage_amount: Decimal::from_str("10000").unwrap(),
            deductible_pct,
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

    fn event(event_type: Peril, severity: Severity, duration: u32, peak: f64) -> TriggerEvent {
        TriggerEvent {
            event_type,
            severity,
            start_date: d(1),
            end_date: d(duration.max(1)),
            duration,
            peak_value: peak,
            average_value: peak,
            affected_area_m: 5_000,
        }
    }

    fn analysis_with(events: Vec<TriggerEvent>) -> WeatherAnalysis {
        WeatherAnalysis {
            station_id: "st-1".to_string(),
            analysis_date: d(30),
            period: "30d".to_string(),
            risk_scores: RiskScores {
                drought: 0,
                flood: 0,
                wind: 0,
                hail: 0,
            },
            trigger_events: events,
            payout_recommendation: None,
        }
    }

    #[test]
    fn test_flood_payout_net_of_deductible() {
        let policy = policy(CoverageType::Flood, 10.0);
        let analysis = analysis_with(vec![event(Peril::Flood, Severity::High, 3, 30.0)]);

        let rec = evaluate_payout(&policy, &analysis).unwrap().unwrap();
        // 30/20 = 150 % capped at 100, minus the 10-point deductible
        assert_eq!(rec.payout_percentage, 90.0);
        assert_eq!(rec.payout_amount, Decimal::from_str("9000.00").unwrap());
        assert_eq!(rec.event_type, Peril::Flood);
        assert_eq!(rec.evidence_data.len(), 1);
        assert!(rec.justification.contains("flood"));
        assert!(rec.justification.contains("peak value 30"));
    }

    #[test]
    fn test_payout_percentage_must_exceed_deductible_strictly() {
        let policy = policy(CoverageType::Flood, 100.0);
        let analysis = analysis_with(vec![event(Peril::Flood, Severity::High, 3, 30.0)]);
        // Percentage caps at 100, which is not strictly greater than 100.
        assert!(evaluate_payout(&policy, &analysis).unwrap().is_none());
    }

    #[test]
    fn test_drought_payout_on_duration() {
        let policy = policy(CoverageType::Drought, 0.0);
        let analysis = analysis_with(vec![event(Peril::Drought, Severity::Medium, 10, 36.0)]);

        let rec = evaluate_payout(&policy, &analysis).unwrap().unwrap();
        assert_eq!(rec.payout_percentage, 100.0);
        assert_eq!(rec.payout_amount, Decimal::from_str("10000.00").unwrap());
        assert!(rec.justification.contains("10 days duration"));
    }

    #[test]
    fn test_drought_below_contract_days_pays_nothing() {
        let mut policy = policy(CoverageType::Drought, 0.0);
        policy.thresholds.drought.days = 14;
        let analysis = analysis_with(vec![event(Peril::Drought, Severity::Medium, 10, 36.0)]);
        assert!(evaluate_payout(&policy, &analysis).unwrap().is_none());
    }

    #[test]
    fn test_wind_payout_on_peak_speed() {
        let policy = policy(CoverageType::Wind, 20.0);
        let analysis = analysis_with(vec![event(Peril::Wind, Severity::Extreme, 1, 45.0)]);

        let rec = evaluate_payout(&policy, &analysis).unwrap().unwrap();
        assert_eq!(rec.payout_percentage, 80.0);
        assert_eq!(rec.payout_amount, Decimal::from_str("8000.00").unwrap());
    }

    #[test]
    fn test_no_matching_events_returns_none() {
        let policy = policy(CoverageType::Wind, 0.0);
        let analysis = analysis_with(vec![event(Peril::Flood, Severity::High, 3, 30.0)]);
        assert!(evaluate_payout(&policy, &analysis).unwrap().is_none());
    }

    #[test]
    fn test_multi_peril_covers_any_qualifying_event() {
        let policy = policy(CoverageType::MultiPeril, 0.0);
        let analysis = analysis_with(vec![event(Peril::Wind, Severity::High, 1, 35.0)]);
        let rec = evaluate_payout(&policy, &analysis).unwrap().unwrap();
        assert_eq!(rec.event_type, Peril::Wind);
    }

    #[test]
    fn test_first_match_wins_even_when_later_event_is_worse() {
        // Known limitation carried over from the contract wording: the
        // first qualifying event decides, even if a later one is more
        // severe. Pinned here so any change is deliberate.
        let policy = policy(CoverageType::Flood, 0.0);
        let analysis = analysis_with(vec![
            event(Peril::Flood, Severity::Medium, 3, 25.0),
            event(Peril::Flood, Severity::Extreme, 3, 80.0),
        ]);

        let rec = evaluate_payout(&policy, &analysis).unwrap().unwrap();
        assert_eq!(rec.severity, Severity::Medium);
        assert_eq!(rec.evidence_data[0].peak_value, 25.0);
    }

    #[test]
    fn test_hail_coverage_is_explicitly_unsupported() {
        let policy = policy(CoverageType::Hail, 0.0);
        let analysis = analysis_with(vec![event(Peril::Hail, Severity::Medium, 1, 8.0)]);
        let err = evaluate_payout(&policy, &analysis).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedCoverage(_)));
    }

    #[test]
    fn test_hail_events_never_qualify_under_multi_peril() {
        let policy = policy(CoverageType::MultiPeril, 0.0);
        let analysis = analysis_with(vec![event(Peril::Hail, Severity::Medium, 1, 8.0)]);
        assert!(evaluate_payout(&policy, &analysis).unwrap().is_none());
    }

    #[test]
    fn test_zero_threshold_is_a_configuration_error() {
        let mut policy = policy(CoverageType::Flood, 0.0);
        policy.thresholds.flood.precipitation_threshold = 0.0;
        let analysis = analysis_with(vec![event(Peril::Flood, Severity::High, 3, 30.0)]);
        let err = evaluate_payout(&policy, &analysis).unwrap_err();
        assert!(matches!(err, AppError::InvalidPolicyConfiguration(_)));
    }

    #[test]
    fn test_zero_drought_days_rejected_for_multi_peril() {
        let mut policy = policy(CoverageType::MultiPeril, 0.0);
        policy.thresholds.drought.days = 0;
        let analysis = analysis_with(vec![event(Peril::Wind, Severity::High, 1, 35.0)]);
        let err = evaluate_payout(&policy, &analysis).unwrap_err();
        assert!(matches!(err, AppError::InvalidPolicyConfiguration(_)));
    }

    #[test]
    fn test_empty_analysis_returns_none() {
        let policy = policy(CoverageType::MultiPeril, 0.0);
        let analysis = analysis_with(vec![]);
        assert!(evaluate_payout(&policy, &analysis).unwrap().is_none());
    }
}
