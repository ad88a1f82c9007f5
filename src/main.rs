use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use knightfall::room::{RegistryConfig, RoomRegistry};
use knightfall::shared::{build_router, AppState};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knightfall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting knightfall game server");

    // Composition root: the registry lives for the whole process and is
    // injected into the handlers through AppState.
    let registry = Arc::new(RoomRegistry::new(RegistryConfig::default()));
    let app = build_router(AppState::new(registry));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!(%addr, "Server running");
    axum::serve(listener, app).await.unwrap();
}
