use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::store::SharedPolicyStore;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when healthy, "degraded" when the policy store is unreachable)
    pub status: String,
    /// API version
    pub version: String,
    /// Number of policies currently held in the store
    pub policies: usize,
}

/// Health check endpoint.
///
/// Returns the API status and version, plus the policy count as a cheap
/// probe of the store. Returns status "degraded" (still 200) if the store
/// is unreachable, so load balancers can distinguish partial failures.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(store): State<SharedPolicyStore>) -> Json<HealthResponse> {
    match store.count().await {
        Ok(policies) => Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            policies,
        }),
        Err(_) => Json(HealthResponse {
            status: "degraded".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            policies: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPolicyStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_policy_count() {
        let store: SharedPolicyStore = Arc::new(InMemoryPolicyStore::new());
        let response = health_check(State(store)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.policies, 0);
        assert!(!response.version.is_empty());
    }
}
