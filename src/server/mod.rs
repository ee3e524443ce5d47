//! HTTP front (C10/C6, §4.6): a thin `axum` router over the Orchestrator.
//! Grounded on the teacher's `server/mod.rs` shutdown-signal pattern,
//! rehomed from stdio/MCP transport onto an `axum` HTTP listener.

mod routes;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use axum::routing::{get, post};
use axum::Router;
use routes::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct Server {
    config: Arc<Config>,
    orchestrator: Arc<Orchestrator>,
    cancellation_token: CancellationToken,
}

impl Server {
    #[must_use]
    pub fn new(config: Arc<Config>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            cancellation_token: CancellationToken::new(),
        }
    }

    fn router(&self) -> Router {
        let origins: Vec<_> = self
            .config
            .server
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
            .collect();
        let cors = CorsLayer::new()
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_origin(AllowOrigin::list(origins));

        let state = Arc::new(AppState {
            orchestrator: Arc::clone(&self.orchestrator),
        });

        Router::new()
            .route("/api/research", post(routes::research))
            .route("/health", get(routes::health))
            .route("/openapi.json", get(routes::openapi))
            .route("/docs", get(routes::docs))
            .with_state(state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        info!(%addr, "starting HTTP front");

        let listener = TcpListener::bind(&addr).await.map_err(Error::Io)?;
        let shutdown_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received");
            shutdown_token.cancel();
        });

        let shutdown_signal = self.cancellation_token.clone();
        let serve = axum::serve(listener, self.router()).with_graceful_shutdown(async move { shutdown_signal.cancelled().await });

        let force_shutdown = {
            let token = self.cancellation_token.clone();
            let timeout = tokio::time::Duration::from_secs(self.config.server.graceful_shutdown_timeout_secs);
            async move {
                token.cancelled().await;
                tokio::time::sleep(timeout).await;
            }
        };

        let result = tokio::select! {
            r = serve => r.map_err(Error::Io),
            () = force_shutdown => {
                warn!("graceful shutdown timeout exceeded, forcing shutdown");
                Ok(())
            }
        };

        info!("HTTP front shutdown complete");
        result
    }

    pub fn shutdown(&self) {
        warn!("initiating server shutdown");
        self.cancellation_token.cancel();
    }

    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
