use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod download;
pub mod entities;
pub mod error;
pub mod filters;
pub mod jobs;
pub mod lookups;
pub mod query;
pub mod routes;

use config::Settings;
use download::{DownloadContext, DownloadRequest, FileStore};
use routes::*;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
    pub store: Arc<FileStore>,
    /// One permit per download allowed to run at a time
    pub download_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: Settings, store: FileStore) -> Self {
        let slots = settings.download_max_concurrent.max(1);
        Self {
            db,
            settings: Arc::new(settings),
            store: Arc::new(store),
            download_slots: Arc::new(Semaphore::new(slots)),
        }
    }

    pub fn download_context(&self) -> DownloadContext {
        DownloadContext {
            db: self.db.clone(),
            settings: self.settings.clone(),
            store: self.store.clone(),
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Federal Spending API",
        version = "0.1.0",
        description = "Award, transaction and subaward search with bulk CSV downloads"
    ),
    paths(
        health_check,
        spending_by_award,
        spending_by_transaction,
        spending_by_category,
        spending_by_geography,
        download_awards,
        download_subawards,
        download_transactions,
        download_status,
        download_transaction_count
    ),
    components(schemas(
        SpendingByAwardRequest,
        SpendingByAwardResponse,
        SpendingByCategoryRequest,
        SpendingByCategoryResponse,
        SpendingByGeographyRequest,
        SpendingByGeographyResponse,
        GeographyResult,
        GeoScope,
        GeoLayer,
        DownloadRequest,
        DownloadStatusResponse,
        DownloadCountRequest,
        DownloadCountResponse,
        query::PageMetadata,
        query::SimplePageMetadata
    ))
)]
struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let api_doc = ApiDoc::openapi();
    let rate_limit = state.settings.rate_limit_per_minute;

    let search_routes = Router::new()
        .route("/spending_by_award/", post(spending_by_award))
        .route("/spending_by_transaction/", post(spending_by_transaction))
        .route("/spending_by_category/", post(spending_by_category))
        .route("/spending_by_geography/", post(spending_by_geography));

    let download_routes = Router::new()
        .route("/awards/", post(download_awards))
        .route("/subawards/", post(download_subawards))
        .route("/transactions/", post(download_transactions))
        .route("/status/", get(download_status))
        .route("/count/", post(download_transaction_count));

    let mut api_routes = Router::new()
        .nest("/api/v2/search", search_routes)
        .nest("/api/v2/download", download_routes)
        .with_state(state);

    // Rate limiting keys on client IP, so it only makes sense behind a real listener.
    if let Some(per_minute) = rate_limit.filter(|n| *n > 0) {
        let governor_conf = GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .period(std::time::Duration::from_secs(60) / per_minute)
            .burst_size(per_minute)
            .finish();
        match governor_conf {
            Some(conf) => {
                api_routes = api_routes.layer(GovernorLayer {
                    config: Arc::new(conf),
                });
            }
            None => tracing::warn!(per_minute, "invalid rate limit; serving without one"),
        }
    }

    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
