//! Inkwire WebSocket Relay Server
//!
//! Groups drawing connections by the user id given at handshake and relays
//! each `drawing` and `chat` frame to the other members of the sender's
//! group, unmodified.
//!
//! ## Protocol
//!
//! Connect to `/ws?userId=<id>` and exchange JSON text frames:
//! ```json
//! { "event": "drawing", "data": { "points": [...], "color": "#000", "lineWidth": 3, "tool": "pencil" } }
//! { "event": "chat", "data": { "text": "hi" } }
//! ```
//! Frames are never echoed to the sender and never stored.

pub mod config;
mod connection;
pub mod error;
pub mod hub;
pub mod routing;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

pub use config::ServerConfig;
pub use connection::{HandshakeParams, MISSING_USER_ID};
pub use error::{ConfigError, HubClosed, ServerError};
pub use hub::{HubHandle, RelayHub};
pub use routing::{ConnectionId, RoutingId, RoutingTable};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    /// Outbound queue depth for each new connection.
    pub outbound_capacity: usize,
}

/// Build the HTTP router around a running hub.
pub fn app(hub: HubHandle, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/ws", get(connection::ws_handler))
        .route("/health", get(health));

    let router = match &config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.route("/", get(index)),
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            hub,
            outbound_capacity: config.outbound_capacity,
        })
}

/// Serve on an already-bound listener until the server stops.
pub async fn serve(listener: TcpListener, hub: HubHandle, config: &ServerConfig) -> Result<(), ServerError> {
    axum::serve(listener, app(hub, config)).await?;
    Ok(())
}

/// Bind `config.bind_addr`, start the hub and serve.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let hub = RelayHub::spawn(config.channel_capacity);
    let listener = TcpListener::bind(config.bind_addr).await?;

    info!("Inkwire relay server listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws?userId=<id>", config.bind_addr);
    if let Some(dir) = &config.static_dir {
        info!("Serving static files from {}", dir.display());
    }

    serve(listener, hub, &config).await
}

/// Index page
async fn index() -> &'static str {
    "Inkwire Relay Server - Connect via WebSocket at /ws?userId=<id>"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}
