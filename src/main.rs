// Weather Cover API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;
mod store;

use config::AppConfig;
use routes::AppState;
use services::sweeper::{SharedSweeperState, SweeperState};
use services::wxm::WxmClient;
use store::{InMemoryPolicyStore, SharedPolicyStore};

/// Weather Cover API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Cover API",
        version = "0.1.0",
        description = "Parametric weather insurance evaluation API. \
            Analyzes station observation history for drought, flood, wind and \
            hail trigger events, scores per-peril risk, and evaluates payout \
            eligibility against policy thresholds and deductibles. A background \
            sweeper re-evaluates active policies so recommendations surface \
            without user traffic.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Stations", description = "Station listing, risk snapshots, and historical analysis"),
        (name = "Policies", description = "Policy management and payout evaluation"),
        (name = "Automation", description = "Weather alerts and background payout sweeper"),
    ),
    paths(
        routes::health::health_check,
        routes::stations::list_stations,
        routes::stations::get_station_risk,
        routes::stations::get_station_analysis,
        routes::policies::create_policy,
        routes::policies::list_policies,
        routes::policies::get_policy,
        routes::policies::evaluate_policy,
        routes::automation::get_alerts,
        routes::automation::get_sweeper_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::stations::StationRiskResponse,
            routes::stations::PayoutFlags,
            routes::policies::CreatePolicyRequest,
            routes::automation::AlertsResponse,
            models::Station,
            models::StationLocation,
            models::Observation,
            models::InstantRisk,
            models::WeatherAnalysis,
            models::RiskScores,
            models::TriggerEvent,
            models::Peril,
            models::Severity,
            models::CoverageType,
            models::Policy,
            models::PolicyThresholds,
            models::DroughtThresholds,
            models::FloodThresholds,
            models::WindThresholds,
            models::PayoutRecommendation,
            services::alerts::WeatherAlert,
            services::sweeper::SweeperState,
            services::sweeper::StationSweepStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_cover_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Create policy store and seed it from the data directory
    let store: SharedPolicyStore = Arc::new(InMemoryPolicyStore::new());

    let data_dir = std::path::Path::new(&config.data_dir);
    match store::load_policies_from_dir(data_dir) {
        Ok(policies) => {
            if policies.is_empty() {
                tracing::warn!("No policy seed files found in {}", data_dir.display());
            }
            for policy in policies {
                let id = policy.id;
                let station = policy.station_id.clone();
                match store.insert(policy).await {
                    Ok(()) => {
                        tracing::info!("Seeded policy {} for station {}", id, station);
                    }
                    Err(e) => {
                        tracing::error!("Failed to seed policy {}: {}", id, e);
                    }
                }
            }
        }
        Err(e) => {
            tracing::error!(
                "Failed to load policy seeds from {}: {}",
                data_dir.display(),
                e
            );
        }
    }

    // Create WeatherXM client
    let wxm_client = WxmClient::new(&config.wxm_api_url, &config.wxm_api_key);

    // Build shared application state
    let app_state = AppState {
        wxm: wxm_client.clone(),
        store: store.clone(),
    };

    // Create shared sweeper state and spawn the background payout sweeper
    let sweeper_state: SharedSweeperState = Arc::new(RwLock::new(SweeperState::new()));
    tokio::spawn(services::sweeper::run_sweeper(
        wxm_client,
        store.clone(),
        sweeper_state.clone(),
    ));

    // CORS — reads are open; policy creation comes from the same origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Build router
    // Station/policy/alert routes share AppState; health uses the store
    // directly; the sweeper status route uses SharedSweeperState.
    let station_routes = Router::new()
        .route("/api/v1/stations", get(routes::stations::list_stations))
        .route(
            "/api/v1/stations/:station_id/risk",
            get(routes::stations::get_station_risk),
        )
        .route(
            "/api/v1/stations/:station_id/analysis",
            get(routes::stations::get_station_analysis),
        )
        .route("/api/v1/alerts", get(routes::automation::get_alerts))
        .with_state(app_state.clone());

    let policy_routes = Router::new()
        .route(
            "/api/v1/policies",
            post(routes::policies::create_policy).get(routes::policies::list_policies),
        )
        .route("/api/v1/policies/:id", get(routes::policies::get_policy))
        .route(
            "/api/v1/policies/:id/evaluate",
            post(routes::policies::evaluate_policy),
        )
        .with_state(app_state);

    // Health check probes the policy store
    let health_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .with_state(store);

    // Sweeper status uses SharedSweeperState
    let automation_routes = Router::new()
        .route(
            "/api/v1/automation/status",
            get(routes::automation::get_sweeper_status),
        )
        .with_state(sweeper_state);

    let app = Router::new()
        .merge(health_routes)
        .merge(station_routes)
        .merge(policy_routes)
        .merge(automation_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
