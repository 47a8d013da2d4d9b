//! API server setup and configuration.

use crate::api::routes::{self, AppState};
use axum::Router;
use log::info;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// API server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: IpAddr,
    /// Server port
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl ApiServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Binds the configured address and serves until the cancel token fires.
    /// In-flight downloads are allowed to finish.
    pub async fn run(&self) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        info!("API server listening on http://{}", listener.local_addr()?);

        let cancel_token = self.cancel_token.clone();
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("API server shutting down...");
            })
            .await
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
