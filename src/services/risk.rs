//! Per-peril risk scorers over historical observation series, plus the
//! instantaneous single-observation snapshot used by dashboards and alerts.
//!
//! Every scorer is a pure function of its input series: same series in,
//! same score and events out. Sparse series are fine — absent days simply
//! don't contribute (they neither break drought runs nor pad flood windows).

use chrono::NaiveDate;

use crate::models::{DailyObservation, InstantRisk, Observation, Peril, Severity, TriggerEvent};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Humidity ceiling (%) for a day to count as dry.
const DROUGHT_HUMIDITY_MAX: f64 = 40.0;
/// Temperature floor (°C) for a day to count as dry.
const DROUGHT_TEMPERATURE_MIN: f64 = 30.0;
/// Precipitation-rate ceiling (mm/h) for a day to count as dry.
const DROUGHT_PRECIP_MAX: f64 = 1.0;
/// Minimum consecutive dry days before a drought event is emitted.
const DROUGHT_MIN_RUN_DAYS: u32 = 7;
/// Run-length thresholds (days) for drought severity classification.
const DROUGHT_SEVERITY_DAYS: [f64; 3] = [7.0, 14.0, 21.0];

/// Flood detection window length in days.
const FLOOD_WINDOW_DAYS: usize = 3;
/// Cumulative rainfall (mm) over the window that triggers a flood event.
const FLOOD_WINDOW_RAINFALL_MM: f64 = 50.0;
/// Peak daily precipitation rate (mm/h) that triggers a flood event.
const FLOOD_DAILY_RATE_MM_H: f64 = 20.0;

/// Max of wind speed and gust (m/s) above which a wind event is emitted.
const WIND_EVENT_MS: f64 = 20.0;

/// Day-over-day temperature drop (°C) in the hail proxy.
const HAIL_TEMP_DROP_C: f64 = 10.0;
/// Precipitation rate (mm/h) accompanying the drop in the hail proxy.
const HAIL_PRECIP_MM_H: f64 = 5.0;

/// Two same-peril events starting within this many calendar days of each
/// other are considered duplicates.
const DEDUP_WINDOW_DAYS: i64 = 2;

/// Static affected radius per peril, in metres.
const DROUGHT_AFFECTED_RADIUS_M: u32 = 15_000;
const FLOOD_AFFECTED_RADIUS_M: u32 = 5_000;
const WIND_AFFECTED_RADIUS_M: u32 = 10_000;
const HAIL_AFFECTED_RADIUS_M: u32 = 3_000;

// ---------------------------------------------------------------------------
// Shared classification helpers
// ---------------------------------------------------------------------------

/// Classify a value against three ascending thresholds.
///
/// value ≥ t3 → extreme, ≥ t2 → high, ≥ t1 → medium, below t1 → low.
pub fn severity_for(value: f64, thresholds: [f64; 3]) -> Severity {
    if value >= thresholds[2] {
        Severity::Extreme
    } else if value >= thresholds[1] {
        Severity::High
    } else if value >= thresholds[0] {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Score points a deduplicated flood event contributes per severity.
fn severity_points(severity: Severity) -> u32 {
    match severity {
        Severity::Low => 10,
        Severity::Medium => 20,
        Severity::High => 35,
        Severity::Extreme => 50,
    }
}

/// A scorer's result: an aggregate 0–100 score and the discrete events
/// backing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PerilAssessment {
    pub risk_score: u8,
    pub events: Vec<TriggerEvent>,
}

// ---------------------------------------------------------------------------
// Drought — run-length detection over consecutive dry days
// ---------------------------------------------------------------------------

/// State of an in-progress dry run.
struct DryRun {
    start: NaiveDate,
    days: u32,
    peak_temperature: f64,
    min_humidity: f64,
}

impl DryRun {
    fn into_event(self, end_date: NaiveDate) -> TriggerEvent {
        TriggerEvent {
            event_type: Peril::Drought,
            severity: severity_for(self.days as f64, DROUGHT_SEVERITY_DAYS),
            start_date: self.start,
            end_date,
            duration: self.days,
            peak_value: self.peak_temperature,
            // Field name is historical: carries the run's minimum humidity,
            // which downstream payout evidence depends on.
            average_value: self.min_humidity,
            affected_area_m: DROUGHT_AFFECTED_RADIUS_M,
        }
    }
}

/// Detect sustained drought runs and score overall drought risk.
///
/// A day is dry when humidity < 40 %, temperature > 30 °C and the
/// precipitation rate is below 1 mm/h — all three at once. Runs of at
/// least [`DROUGHT_MIN_RUN_DAYS`] become events, including a run still
/// open at the end of the series.
pub fn assess_drought(series: &[DailyObservation]) -> PerilAssessment {
    let mut events = Vec::new();
    let mut current: Option<DryRun> = None;
    let mut total_rainfall = 0.0_f64;

    for day in series {
        let obs = &day.observation;
        total_rainfall += obs.precipitation_rate;

        let is_dry_day = obs.humidity < DROUGHT_HUMIDITY_MAX
            && obs.temperature > DROUGHT_TEMPERATURE_MIN
            && obs.precipitation_rate < DROUGHT_PRECIP_MAX;

        if is_dry_day {
            match current.as_mut() {
                Some(run) => {
                    run.days += 1;
                    run.peak_temperature = run.peak_temperature.max(obs.temperature);
                    run.min_humidity = run.min_humidity.min(obs.humidity);
                }
                None => {
                    current = Some(DryRun {
                        start: day.date,
                        days: 1,
                        peak_temperature: obs.temperature,
                        min_humidity: obs.humidity,
                    });
                }
            }
        } else if let Some(run) = current.take() {
            if run.days >= DROUGHT_MIN_RUN_DAYS {
                events.push(run.into_event(day.date));
            }
        }
    }

    // A run still open at the end of the series is emitted too.
    if let Some(run) = current.take() {
        if run.days >= DROUGHT_MIN_RUN_DAYS {
            if let Some(last) = series.last() {
                events.push(run.into_event(last.date));
            }
        }
    }

    let longest_run = events.iter().map(|e| e.duration).max().unwrap_or(0);
    let rainfall_penalty =
        !series.is_empty() && total_rainfall / (series.len() as f64) < DROUGHT_PRECIP_MAX;

    let score = 3 * longest_run
        + if rainfall_penalty { 30 } else { 0 }
        + 10 * events.len() as u32;

    PerilAssessment {
        risk_score: score.min(100) as u8,
        events,
    }
}

// ---------------------------------------------------------------------------
// Flood — 3-day sliding window over cumulative rainfall
// ---------------------------------------------------------------------------

/// Detect flood windows and score overall flood risk.
///
/// Slides a 3-day window across the series; a window triggers when its
/// cumulative rainfall exceeds 50 mm or any day's rate exceeds 20 mm/h.
/// Accumulated precipitation is preferred; the rate stands in when a
/// station doesn't report an accumulation. Adjacent windows overlap, so
/// near-duplicate detections are collapsed before scoring.
pub fn assess_flood(series: &[DailyObservation]) -> PerilAssessment {
    let mut events = Vec::new();

    if series.len() >= FLOOD_WINDOW_DAYS {
        for window in series.windows(FLOOD_WINDOW_DAYS) {
            let window_rainfall: f64 = window
                .iter()
                .map(|d| {
                    d.observation
                        .precipitation_accumulated
                        .unwrap_or(d.observation.precipitation_rate)
                })
                .sum();
            let max_daily_rate = window
                .iter()
                .map(|d| d.observation.precipitation_rate)
                .fold(0.0_f64, f64::max);

            if window_rainfall > FLOOD_WINDOW_RAINFALL_MM || max_daily_rate > FLOOD_DAILY_RATE_MM_H
            {
                let severity = if max_daily_rate > 50.0 {
                    Severity::Extreme
                } else if max_daily_rate > 30.0 || window_rainfall > 100.0 {
                    Severity::High
                } else {
                    Severity::Medium
                };

                events.push(TriggerEvent {
                    event_type: Peril::Flood,
                    severity,
                    start_date: window[0].date,
                    end_date: window[FLOOD_WINDOW_DAYS - 1].date,
                    duration: FLOOD_WINDOW_DAYS as u32,
                    peak_value: max_daily_rate,
                    average_value: window_rainfall / FLOOD_WINDOW_DAYS as f64,
                    affected_area_m: FLOOD_AFFECTED_RADIUS_M,
                });
            }
        }
    }

    let unique = deduplicate_events(events);

    let score: u32 = unique.iter().map(|e| severity_points(e.severity)).sum();

    PerilAssessment {
        risk_score: score.min(100) as u8,
        events: unique,
    }
}

// ---------------------------------------------------------------------------
// Wind — per-day threshold check, no windowing
// ---------------------------------------------------------------------------

/// Detect high-wind days and score overall wind risk.
///
/// Each day is checked independently against max(wind_speed, wind_gust).
/// Severity uses its own four-band cascade rather than [`severity_for`];
/// the band edges are strict (> not ≥).
pub fn assess_wind(series: &[DailyObservation]) -> PerilAssessment {
    let mut events = Vec::new();
    let mut high_wind_days: u32 = 0;

    for day in series {
        let obs = &day.observation;
        let max_wind = obs.wind_speed.max(obs.wind_gust);

        if max_wind > WIND_EVENT_MS {
            high_wind_days += 1;
            let severity = if max_wind > 40.0 {
                Severity::Extreme
            } else if max_wind > 30.0 {
                Severity::High
            } else if max_wind > 25.0 {
                Severity::Medium
            } else {
                Severity::Low
            };

            events.push(TriggerEvent {
                event_type: Peril::Wind,
                severity,
                start_date: day.date,
                end_date: day.date,
                duration: 1,
                peak_value: max_wind,
                average_value: max_wind,
                affected_area_m: WIND_AFFECTED_RADIUS_M,
            });
        }
    }

    // high_wind_days and the event count track the same condition today;
    // the formula weights them separately as distinct quantities
    // (exposure days vs discrete events).
    let score = 5 * high_wind_days + 3 * events.len() as u32;

    PerilAssessment {
        risk_score: score.min(100) as u8,
        events,
    }
}

// ---------------------------------------------------------------------------
// Hail — proxy heuristic over consecutive day pairs
// ---------------------------------------------------------------------------

/// Detect likely hail days and score overall hail risk.
///
/// No dedicated hail sensor exists in the station data; a sharp
/// day-over-day temperature drop combined with precipitation stands in as
/// a proxy. All proxy events carry a fixed medium severity.
pub fn assess_hail(series: &[DailyObservation]) -> PerilAssessment {
    let mut events = Vec::new();

    for pair in series.windows(2) {
        let temp_drop = pair[0].observation.temperature - pair[1].observation.temperature;
        let precipitation = pair[1].observation.precipitation_rate;

        if temp_drop > HAIL_TEMP_DROP_C && precipitation > HAIL_PRECIP_MM_H {
            events.push(TriggerEvent {
                event_type: Peril::Hail,
                severity: Severity::Medium,
                start_date: pair[1].date,
                end_date: pair[1].date,
                duration: 1,
                peak_value: precipitation,
                average_value: precipitation,
                affected_area_m: HAIL_AFFECTED_RADIUS_M,
            });
        }
    }

    let score = 15 * events.len() as u32;

    PerilAssessment {
        risk_score: score.min(100) as u8,
        events,
    }
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Collapse temporally overlapping detections of the same peril, keeping
/// the single most severe.
///
/// Events are stably sorted by descending severity rank, then accepted in
/// order unless an already-accepted event of the same peril starts within
/// [`DEDUP_WINDOW_DAYS`] calendar days.
pub fn deduplicate_events(mut events: Vec<TriggerEvent>) -> Vec<TriggerEvent> {
    events.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));

    let mut unique: Vec<TriggerEvent> = Vec::new();
    for event in events {
        let has_overlap = unique.iter().any(|existing| {
            existing.event_type == event.event_type
                && (existing.start_date - event.start_date).num_days().abs() < DEDUP_WINDOW_DAYS
        });
        if !has_overlap {
            unique.push(event);
        }
    }

    unique
}

// ---------------------------------------------------------------------------
// Instantaneous snapshot — single observation, no history
// ---------------------------------------------------------------------------

/// Flood risk from current conditions: precipitation rate, saturation
/// humidity, and low pressure (storm systems).
pub fn instant_flood_risk(obs: &Observation) -> u8 {
    let mut risk: u32 = 0;

    if obs.precipitation_rate > 20.0 {
        risk += 40;
    } else if obs.precipitation_rate > 10.0 {
        risk += 30;
    } else if obs.precipitation_rate > 5.0 {
        risk += 15;
    }

    if obs.humidity > 90.0 {
        risk += 20;
    } else if obs.humidity > 80.0 {
        risk += 10;
    }

    if obs.pressure < 1000.0 {
        risk += 10;
    } else if obs.pressure < 1005.0 {
        risk += 5;
    }

    risk.min(100) as u8
}

/// Wind risk from current conditions: max of speed and gust, plus low
/// pressure.
pub fn instant_wind_risk(obs: &Observation) -> u8 {
    let mut risk: u32 = 0;
    let max_wind = obs.wind_speed.max(obs.wind_gust);

    if max_wind > 25.0 {
        risk += 40;
    } else if max_wind > 20.0 {
        risk += 30;
    } else if max_wind > 15.0 {
        risk += 20;
    } else if max_wind > 10.0 {
        risk += 10;
    }

    if obs.pressure < 990.0 {
        risk += 20;
    } else if obs.pressure < 1000.0 {
        risk += 10;
    }

    risk.min(100) as u8
}

/// Drought risk from current conditions: low humidity, high temperature,
/// zero precipitation, with an extra bump when humidity and temperature
/// are both at their extremes (the bands don't exclude it).
pub fn instant_drought_risk(obs: &Observation) -> u8 {
    let mut risk: u32 = 0;

    if obs.humidity < 20.0 {
        risk += 30;
    } else if obs.humidity < 30.0 {
        risk += 20;
    } else if obs.humidity < 40.0 {
        risk += 10;
    }

    if obs.temperature > 40.0 {
        risk += 25;
    } else if obs.temperature > 35.0 {
        risk += 20;
    } else if obs.temperature > 30.0 {
        risk += 10;
    }

    if obs.precipitation_rate == 0.0 {
        risk += 20;
    }

    if obs.humidity < 20.0 && obs.temperature > 40.0 {
        risk += 25;
    }

    risk.min(100) as u8
}

/// All three instantaneous scores from one observation.
pub fn instant_risk(obs: &Observation) -> InstantRisk {
    InstantRisk {
        flood_risk: instant_flood_risk(obs),
        wind_risk: instant_wind_risk(obs),
        drought_risk: instant_drought_risk(obs),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
