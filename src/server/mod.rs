use axum::{routing::{get, post}, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::loader::ModuleHost;

pub mod routes;

/// Server state: one host behind a single read-write lock.
///
/// Lookups (resolve, closures, stats) take the read half and may run
/// concurrently; structural mutation (validate's pruning) takes the write
/// half and excludes everything else.
pub struct AppState {
    pub host: RwLock<ModuleHost>,
}

pub async fn start_server(port: u16, host: ModuleHost) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        host: RwLock::new(host),
    });

    let app = Router::new()
        .route("/stats", get(routes::get_stats))
        .route("/modules", get(routes::list_modules))
        .route("/module", get(routes::get_module))
        .route("/dependencies", get(routes::get_dependencies))
        .route("/dependents", get(routes::get_dependents))
        .route("/resolve", get(routes::resolve_symbol))
        .route("/order", get(routes::get_order))
        .route("/validate", post(routes::validate_module))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
