//! PolicyDesk API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Entity CRUD (contacts, leads, clients, opportunities, quotes,
//!   communications)
//! - CSV lead import
//! - Document storage with signed download URLs
//! - Telephony (calls, SMS) through the vendor collaborator
//! - Rate limiting and observability

mod handlers;
mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use policydesk_common::{
    config::AppConfig,
    db::{DbPool, Repository},
    metrics as app_metrics,
    storage::UrlSigner,
    telephony::{DbTokenStore, TelephonyClient},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub signer: UrlSigner,
    /// Present only when vendor credentials are configured
    pub telephony: Option<TelephonyClient>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting PolicyDesk API Gateway v{}", policydesk_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    app_metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets(app_metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Prometheus exporter listening on {}", metrics_addr);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    // Telephony is optional; without vendor credentials its routes 500
    // with a configuration error instead of failing startup
    let telephony = if config.telephony.client_id.is_some() {
        let store = Arc::new(DbTokenStore::new(Repository::new(db.clone())));
        Some(TelephonyClient::new(&config.telephony, store)?)
    } else {
        info!("Telephony credentials not configured, telephony routes disabled");
        None
    };

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        signer: UrlSigner::new(&config.storage),
        telephony,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Contact endpoints
        .route(
            "/contacts",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route("/contacts/bulk", patch(handlers::contacts::bulk_update_contacts))
        .route(
            "/contacts/{id}",
            get(handlers::contacts::get_contact)
                .patch(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        )
        // Lead endpoints
        .route(
            "/leads",
            get(handlers::leads::list_leads).post(handlers::leads::create_lead),
        )
        .route("/leads/bulk", patch(handlers::leads::bulk_update_leads))
        .route("/leads/import", post(handlers::import::import_leads))
        .route(
            "/leads/{id}",
            get(handlers::leads::get_lead)
                .patch(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        // Client endpoints
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/{id}",
            get(handlers::clients::get_client)
                .patch(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        // Opportunity endpoints
        .route(
            "/opportunities",
            get(handlers::opportunities::list_opportunities)
                .post(handlers::opportunities::create_opportunity),
        )
        .route(
            "/opportunities/{id}",
            get(handlers::opportunities::get_opportunity)
                .patch(handlers::opportunities::update_opportunity)
                .delete(handlers::opportunities::delete_opportunity),
        )
        // Quote endpoints
        .route(
            "/quotes",
            get(handlers::quotes::list_quotes).post(handlers::quotes::create_quote),
        )
        .route(
            "/quotes/{id}",
            get(handlers::quotes::get_quote)
                .patch(handlers::quotes::update_quote)
                .delete(handlers::quotes::delete_quote),
        )
        // Communication endpoints
        .route(
            "/communications",
            get(handlers::communications::list_communications)
                .post(handlers::communications::create_communication),
        )
        .route(
            "/communications/{id}",
            get(handlers::communications::get_communication),
        )
        // Storage endpoints
        .route("/storage/upload", post(handlers::storage::upload_document))
        .route("/storage/download", post(handlers::storage::download_url))
        .route(
            "/storage/file/{bucket}/{*path}",
            get(handlers::storage::serve_file),
        )
        // Telephony endpoints
        .route("/telephony/authorized", get(handlers::telephony::authorized))
        .route("/telephony/call", post(handlers::telephony::place_call))
        .route("/telephony/sms", post(handlers::telephony::send_sms))
        .route("/telephony/hangup", post(handlers::telephony::hangup))
        .route(
            "/telephony/disconnect",
            post(handlers::telephony::disconnect),
        );

    // Rate limiting
    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        api_routes = api_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
