//! Historical weather analysis aggregation.
//!
//! Fetches an observation series for a lookback window, runs all four
//! peril scorers over it, and assembles a [`WeatherAnalysis`]. The
//! aggregator never decides payouts — `payout_recommendation` stays empty
//! until the payout evaluator fills it.
//!
//! Per-day history fetches are independent and read-only, so they run
//! concurrently via `join_all`; the series order is restored positionally
//! before any scorer sees it.

use chrono::{Duration, NaiveDate};
use futures::future::join_all;

use crate::errors::AppError;
use crate::models::{DailyObservation, RiskScores, WeatherAnalysis};
use crate::services::risk::{assess_drought, assess_flood, assess_hail, assess_wind};
use crate::services::wxm::WxmClient;

/// Analyze a station's weather over the `lookback_days` ending at
/// `analysis_date` (exclusive).
pub async fn analyze_station(
    client: &WxmClient,
    station_id: &str,
    analysis_date: NaiveDate,
    lookback_days: u32,
) -> Result<WeatherAnalysis, AppError> {
    let series =
        fetch_observation_series(client, station_id, analysis_date, lookback_days).await?;
    Ok(build_analysis(
        station_id,
        analysis_date,
        lookback_days,
        &series,
    ))
}

/// Fetch the per-day observation series for [analysis_date − lookback,
/// analysis_date), oldest first.
///
/// A failed or empty day is skipped with a warning — a single missing day
/// must not sink a 30-day analysis. Only a window with zero observations
/// fails, as [`AppError::DataUnavailable`].
pub async fn fetch_observation_series(
    client: &WxmClient,
    station_id: &str,
    analysis_date: NaiveDate,
    lookback_days: u32,
) -> Result<Vec<DailyObservation>, AppError> {
    let start = analysis_date - Duration::days(lookback_days as i64);
    let dates: Vec<NaiveDate> = (0..lookback_days)
        .map(|i| start + Duration::days(i as i64))
        .collect();

    let fetches = dates
        .iter()
        .map(|&date| client.get_observation_for_date(station_id, date));
    let results = join_all(fetches).await;

    let mut series = Vec::with_capacity(dates.len());
    for (date, result) in dates.iter().zip(results) {
        match result {
            Ok(Some(observation)) => series.push(DailyObservation {
                date: *date,
                observation,
            }),
            Ok(None) => {
                tracing::debug!("No observation for station {} on {}", station_id, date);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch history for station {} on {}: {}",
                    station_id,
                    date,
                    e
                );
            }
        }
    }

    if series.is_empty() {
        return Err(AppError::DataUnavailable(format!(
            "No observations for station {} in the {} days before {}",
            station_id, lookback_days, analysis_date
        )));
    }

    Ok(series)
}

/// Run all four scorers over a series and assemble the analysis.
///
/// Pure: identical series in, identical analysis out. Events concatenate
/// in scorer order (drought, flood, wind, hail); only the flood scorer
/// self-deduplicates, there is no cross-peril deduplication.
pub fn build_analysis(
    station_id: &str,
    analysis_date: NaiveDate,
    lookback_days: u32,
    series: &[DailyObservation],
) -> WeatherAnalysis {
    let drought = assess_drought(series);
    let flood = assess_flood(series);
    let wind = assess_wind(series);
    let hail = assess_hail(series);

    let mut trigger_events =
        Vec::with_capacity(drought.events.len() + flood.events.len() + wind.events.len() + hail.events.len());
    trigger_events.extend(drought.events);
    trigger_events.extend(flood.events);
    trigger_events.extend(wind.events);
    trigger_events.extend(hail.events);

    WeatherAnalysis {
        station_id: station_id.to_string(),
        analysis_date,
        period: format!("{}d", lookback_days),
        risk_scores: RiskScores {
            drought: drought.risk_score,
            flood: flood.risk_score,
            wind: wind.risk_score,
            hail: hail.risk_score,
        },
        trigger_events,
        payout_recommendation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, Peril};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn stormy_series() -> Vec<DailyObservation> {
        (1..=10)
            .map(|i| DailyObservation {
                date: date(i),
                observation: Observation {
                    temperature: 35.0,
                    humidity: 15.0,
                    wind_speed: if i == 5 { 32.0 } else { 3.0 },
                    precipitation_rate: 0.0,
                    ..Default::default()
                },
            })
            .collect()
    }

    #[test]
    fn test_build_analysis_wires_all_scorers() {
        let series = stormy_series();
        let analysis = build_analysis("st-1", date(11), 10, &series);

        assert_eq!(analysis.station_id, "st-1");
        assert_eq!(analysis.period, "10d");
        assert!(analysis.payout_recommendation.is_none());

        // One 10-day drought run and one high-wind day.
        assert!(analysis.risk_scores.drought > 0);
        assert!(analysis.risk_scores.wind > 0);
        assert_eq!(analysis.risk_scores.flood, 0);
        assert_eq!(analysis.risk_scores.hail, 0);

        let perils: Vec<Peril> = analysis
            .trigger_events
            .iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(perils, vec![Peril::Drought, Peril::Wind]);
    }

    #[test]
    fn test_build_analysis_is_idempotent() {
        let series = stormy_series();
        let first = build_analysis("st-1", date(11), 10, &series);
        let second = build_analysis("st-1", date(11), 10, &series);

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b, "same series must produce identical output");
    }

    #[tokio::test]
    async fn test_fetch_series_tolerates_partial_failures() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "observation": { "temperature": 25.0, "humidity": 50.0 }
        });
        Mock::given(method("GET"))
            .and(path("/stations/st-1/history"))
            .and(query_param("date", "2025-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stations/st-1/history"))
            .and(query_param("date", "2025-06-02"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stations/st-1/history"))
            .and(query_param("date", "2025-06-03"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = WxmClient::new(&server.uri(), "secret");
        let series = fetch_observation_series(&client, "st-1", date(4), 3)
            .await
            .unwrap();

        // The failed middle day is simply absent; order is preserved.
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date(1));
        assert_eq!(series[1].date, date(3));
    }

    #[tokio::test]
    async fn test_fetch_series_fails_when_whole_window_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stations/st-1/history"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = WxmClient::new(&server.uri(), "secret");
        let err = fetch_observation_series(&client, "st-1", date(4), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }
}
