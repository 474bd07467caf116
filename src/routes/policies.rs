//! Policy HTTP endpoints.
//!
//! - POST /api/v1/policies
//! - GET  /api/v1/policies
//! - GET  /api/v1/policies/:id
//! - POST /api/v1/policies/:id/evaluate?date=YYYY-MM-DD&days=N

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::models::{CoverageType, Policy, PolicyThresholds, WeatherAnalysis};
use crate::routes::stations::{parse_analysis_window, AnalysisQuery};
use crate::routes::AppState;
use crate::services::analysis::analyze_station;
use crate::services::payout::evaluate_payout;

/// Request body for creating a policy.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePolicyRequest {
    pub station_id: String,
    pub holder_name: String,
    pub coverage_type: CoverageType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Insured amount in currency units
    pub coverage_amount: Decimal,
    /// Payout-percentage floor (0–100)
    pub deductible_pct: f64,
    pub thresholds: PolicyThresholds,
}

fn validate_create(request: &CreatePolicyRequest) -> Result<(), AppError> {
    if request.station_id.trim().is_empty() {
        return Err(AppError::BadRequest("station_id must not be empty".to_string()));
    }
    if request.holder_name.trim().is_empty() {
        return Err(AppError::BadRequest("holder_name must not be empty".to_string()));
    }
    if request.end_date <= request.start_date {
        return Err(AppError::BadRequest(
            "end_date must be after start_date".to_string(),
        ));
    }
    if request.coverage_amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "coverage_amount must be positive".to_string(),
        ));
    }
    if !request.deductible_pct.is_finite()
        || request.deductible_pct < 0.0
        || request.deductible_pct > 100.0
    {
        return Err(AppError::BadRequest(
            "deductible_pct must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Create a new policy.
///
/// Validates the request shape here and the coverage thresholds at
/// evaluation time; a policy with a zero divisor threshold is still
/// storable but will refuse to evaluate.
#[utoipa::path(
    post,
    path = "/api/v1/policies",
    tag = "Policies",
    request_body = CreatePolicyRequest,
    responses(
        (status = 201, description = "Policy created", body = Policy),
        (status = 400, description = "Invalid policy request", body = ErrorResponse),
    )
)]
pub async fn create_policy(
    State(state): State<AppState>,
    Json(request): Json<CreatePolicyRequest>,
) -> Result<(StatusCode, Json<Policy>), AppError> {
    validate_create(&request)?;

    let policy = Policy {
        id: Uuid::new_v4(),
        station_id: request.station_id,
        holder_name: request.holder_name,
        coverage_type: request.coverage_type,
        start_date: request.start_date,
        end_date: request.end_date,
        active: true,
        coverage_amount: request.coverage_amount,
        deductible_pct: request.deductible_pct,
        thresholds: request.thresholds,
    };

    state.store.insert(policy.clone()).await?;
    tracing::info!(
        "Created policy {} ({:?}) for station {}",
        policy.id,
        policy.coverage_type,
        policy.station_id
    );

    Ok((StatusCode::CREATED, Json(policy)))
}

/// List all policies.
#[utoipa::path(
    get,
    path = "/api/v1/policies",
    tag = "Policies",
    responses(
        (status = 200, description = "All policies", body = Vec<Policy>),
    )
)]
pub async fn list_policies(State(state): State<AppState>) -> Result<Json<Vec<Policy>>, AppError> {
    Ok(Json(state.store.list().await?))
}

/// Get a policy by id.
#[utoipa::path(
    get,
    path = "/api/v1/policies/{id}",
    tag = "Policies",
    params(
        ("id" = Uuid, Path, description = "Policy UUID"),
    ),
    responses(
        (status = 200, description = "The policy", body = Policy),
        (status = 404, description = "Policy not found", body = ErrorResponse),
    )
)]
pub async fn get_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Policy>, AppError> {
    let policy = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))?;
    Ok(Json(policy))
}

/// Evaluate a policy against a fresh weather analysis of its station.
///
/// Runs the historical analysis over the requested window, then applies
/// the policy's thresholds and deductible. The returned analysis carries
/// the payout recommendation when one is owed, and null otherwise.
#[utoipa::path(
    post,
    path = "/api/v1/policies/{id}/evaluate",
    tag = "Policies",
    params(
        ("id" = Uuid, Path, description = "Policy UUID"),
        AnalysisQuery,
    ),
    responses(
        (status = 200, description = "Analysis with payout recommendation (or null)", body = WeatherAnalysis),
        (status = 400, description = "Invalid date or window", body = ErrorResponse),
        (status = 404, description = "Policy not found", body = ErrorResponse),
        (status = 422, description = "Unsupported coverage or invalid thresholds", body = ErrorResponse),
        (status = 502, description = "No observations available for the window", body = ErrorResponse),
    )
)]
pub async fn evaluate_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<WeatherAnalysis>, AppError> {
    let (date, days) = parse_analysis_window(&params)?;

    let policy = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Policy {} not found", id)))?;

    let mut analysis = analyze_station(&state.wxm, &policy.station_id, date, days).await?;
    let recommendation = evaluate_payout(&policy, &analysis)?;
    analysis.payout_recommendation = recommendation;

    if let Some(rec) = &analysis.payout_recommendation {
        tracing::info!(
            "Policy {} qualifies for payout: {} ({}%)",
            policy.id,
            rec.payout_amount,
            rec.payout_percentage
        );
    }

    Ok(Json(analysis))
}
