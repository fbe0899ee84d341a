//! Axum HTTP + WebSocket server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wattlink_core::{BillingRates, ConnectionId};
use wattlink_payments::PaymentClient;
use wattlink_store::ReadingRepo;
use wattlink_telemetry::PrometheusHandle;

use crate::api;
use crate::config::{ServerConfig, SessionConfig};
use crate::health::{self, HealthResponse};
use crate::relay::Relay;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::lifecycle::classify;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub readings: ReadingRepo,
    pub billing: BillingRates,
    pub payments: PaymentClient,
    /// Prometheus handle; `/metrics` is empty without one.
    pub metrics: Option<PrometheusHandle>,
    pub session: SessionConfig,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub start_time: Instant,
}

/// Collaborators the server is built from.
pub struct ServerDeps {
    pub relay: Arc<Relay>,
    pub readings: ReadingRepo,
    pub billing: BillingRates,
    pub payments: PaymentClient,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: &ServerConfig, deps: ServerDeps) -> Self {
        Self {
            relay: deps.relay,
            readings: deps.readings,
            billing: deps.billing,
            payments: deps.payments,
            metrics: deps.metrics,
            session: config.session(),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let api = api::routes().layer(TimeoutLayer::new(Duration::from_secs(
        config.request_timeout_secs,
    )));

    Router::new()
        .route("/ws/device", get(ws_handler))
        .route("/ws/ui", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// GET /ws/device, GET /ws/ui
async fn ws_handler(
    ws: WebSocketUpgrade,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let role = classify(uri.path(), &query);
    let conn_id = ConnectionId::new();
    let token = state.shutdown.token();
    ws.on_upgrade(move |socket| {
        run_ws_session(socket, conn_id, role, state.relay, state.session, token)
    })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.relay.registry();
    Json(health::health_check(
        state.start_time,
        registry.device_count(),
        registry.observer_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, wattlink_telemetry::render(handle)),
        None => (StatusCode::OK, String::new()),
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    pub port: u16,
    relay: Arc<Relay>,
    shutdown: Arc<ShutdownCoordinator>,
    server: JoinHandle<()>,
}

impl ServerHandle {
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Stop accepting connections, close every session and wait for the server task.
    pub async fn shutdown(self) {
        info!("shutting down server");
        self.shutdown
            .graceful_shutdown(vec![self.server], None)
            .await;
    }
}

/// Bind, spawn the server task, and return once it is accepting connections.
pub async fn start(config: ServerConfig, deps: ServerDeps) -> std::io::Result<ServerHandle> {
    let state = AppState::new(&config, deps);
    let relay = state.relay.clone();
    let shutdown = state.shutdown.clone();
    let router = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "wattlink server started");

    let token = shutdown.token();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
        {
            warn!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        relay,
        shutdown,
        server,
    })
}
