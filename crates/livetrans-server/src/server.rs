//! `RelayServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use livetrans_core::Translator;
use livetrans_engine::{DebounceConfig, DebounceEngine, SessionRegistry};
use livetrans_telemetry::{MetricSample, MetricsRecorder};

use crate::config::ServerConfig;
use crate::connection::{run_connection, ConnectionSettings};
use crate::context::RelayContext;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: RelayContext,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub connection: ConnectionSettings,
    pub max_message_size: usize,
    pub start_time: Instant,
}

/// The translation relay server.
pub struct RelayServer {
    config: ServerConfig,
    ctx: RelayContext,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl RelayServer {
    /// Create a server with a fresh session registry.
    pub fn new(
        config: ServerConfig,
        debounce: DebounceConfig,
        translator: Arc<dyn Translator>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::with_capacity_limit(
            DebounceEngine::new(debounce),
            config.max_sessions,
        ));
        Self {
            config,
            ctx: RelayContext::new(registry, translator, metrics),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            ctx: self.ctx.clone(),
            shutdown: Arc::clone(&self.shutdown),
            connection: ConnectionSettings::from(&self.config),
            max_message_size: self.config.max_message_size,
            start_time: self.start_time,
        };

        Router::new()
            .route(&self.config.ws_path, get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and start serving in the background.
    ///
    /// Returns the bound address (useful with port 0) and the serve task,
    /// which finishes once shutdown has been signalled.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(
            %addr,
            ws_path = %self.config.ws_path,
            translator = self.ctx.translator.name(),
            "relay server listening"
        );

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });

        Ok((addr, handle))
    }

    /// Stop accepting connections, close live sessions, and wait for them.
    pub async fn shutdown(&self, serve_handle: JoinHandle<()>) {
        info!(
            active_sessions = self.ctx.registry.len(),
            "shutting down relay server"
        );
        self.shutdown
            .graceful_shutdown(vec![serve_handle], self.config.shutdown_timeout())
            .await;
        info!("relay server stopped");
    }

    pub fn context(&self) -> &RelayContext {
        &self.ctx
    }

    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET {ws_path}: upgrade and run one translation session.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }

    let AppState {
        ctx,
        shutdown,
        connection,
        max_message_size,
        ..
    } = state;
    let tracker_token = shutdown.tracker().token();
    let cancel = shutdown.token();

    ws.max_message_size(max_message_size)
        .max_frame_size(max_message_size)
        .on_upgrade(move |socket| async move {
            run_connection(socket, ctx, connection, cancel).await;
            drop(tracker_token);
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.ctx.registry.len(),
        state.ctx.translator.name(),
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics: JSON snapshot of every recorded series.
async fn metrics_handler(State(state): State<AppState>) -> Json<Vec<MetricSample>> {
    state.ctx.refresh_active_gauge();
    Json(state.ctx.metrics.snapshot())
}
