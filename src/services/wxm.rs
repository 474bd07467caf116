//! WeatherXM Pro station API client.
//!
//! Fetches current and historical observations for weather stations.
//! See: https://pro.weatherxm.com/api/v1
//!
//! The client fetches raw JSON and hands it to pure extraction functions,
//! so payload-shape handling is testable without any network.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{Observation, Station, StationLocation};

/// Header carrying the WeatherXM API key.
const API_KEY_HEADER: &str = "X-API-KEY";

/// Client for the WeatherXM Pro station API.
#[derive(Debug, Clone)]
pub struct WxmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// The most recent reading from a station.
#[derive(Debug, Clone)]
pub struct LatestObservation {
    /// Reading time as reported by the station, when present.
    pub timestamp: Option<DateTime<Utc>>,
    pub observation: Observation,
}

impl WxmClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| AppError::InternalError(format!("Invalid API key header: {}", e)))?,
        );
        Ok(headers)
    }

    async fn get_json(&self, url: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("WeatherXM request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "WeatherXM returned HTTP {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("WeatherXM JSON parse error: {}", e))
        })
    }

    /// Fetch the single most recent observation for a station.
    pub async fn get_latest_observation(
        &self,
        station_id: &str,
    ) -> Result<LatestObservation, AppError> {
        let url = format!("{}/stations/{}/latest", self.base_url, station_id);
        let raw = self.get_json(&url).await?;
        extract_latest_observation(&raw)
    }

    /// Fetch the observation for a station on a specific calendar day.
    ///
    /// Returns `Ok(None)` when the provider has no data for that day;
    /// transport and HTTP failures surface as errors so callers can
    /// distinguish "no reading" from "source down".
    pub async fn get_observation_for_date(
        &self,
        station_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Observation>, AppError> {
        let url = format!(
            "{}/stations/{}/history?date={}",
            self.base_url,
            station_id,
            date.format("%Y-%m-%d")
        );
        let raw = self.get_json(&url).await?;
        Ok(extract_daily_observation(&raw))
    }

    /// List all stations visible to this API key.
    pub async fn list_stations(&self) -> Result<Vec<Station>, AppError> {
        let url = format!("{}/stations", self.base_url);
        let raw = self.get_json(&url).await?;
        Ok(extract_stations(&raw))
    }
}

// ---------------------------------------------------------------------------
// Pure payload extraction
// ---------------------------------------------------------------------------

/// Extract the latest observation from a `/stations/{id}/latest` payload.
///
/// The reading may sit under an `observation` key or at the top level.
pub fn extract_latest_observation(raw: &Value) -> Result<LatestObservation, AppError> {
    let body = raw.get("observation").unwrap_or(raw);

    let timestamp = body
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let observation: Observation = serde_json::from_value(body.clone()).map_err(|e| {
        AppError::ExternalServiceError(format!("WeatherXM observation structure error: {}", e))
    })?;

    Ok(LatestObservation {
        timestamp,
        observation,
    })
}

/// Extract one day's observation from a `/stations/{id}/history` payload.
///
/// Accepts three shapes: an object with an `observation` key, a bare
/// observation object, or an array of readings (first entry wins, one
/// record per day). Returns `None` for an empty array or an unusable
/// payload — that day is simply absent from the series.
pub fn extract_daily_observation(raw: &Value) -> Option<Observation> {
    let body = match raw {
        Value::Array(entries) => entries.first()?,
        other => other.get("observation").unwrap_or(other),
    };

    serde_json::from_value(body.clone()).ok()
}

/// Extract the station list from a `/stations` payload.
///
/// The list may live under `data`, `stations`, or be the top-level array.
/// Entries without an id are dropped.
pub fn extract_stations(raw: &Value) -> Vec<Station> {
    let entries = raw
        .get("data")
        .or_else(|| raw.get("stations"))
        .unwrap_or(raw)
        .as_array()
        .cloned()
        .unwrap_or_default();

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry
                .get("id")
                .or_else(|| entry.get("station_id"))?
                .as_str()?
                .to_string();
            let name = entry
                .get("name")
                .or_else(|| entry.get("station_name"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Station {}", id));
            let lat = entry
                .get("lat")
                .or_else(|| entry.get("latitude"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            let lon = entry
                .get("lon")
                .or_else(|| entry.get("longitude"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);

            Some(Station {
                id,
                name,
                location: StationLocation { lat, lon },
            })
        })
        .collect()
}
