use axum::{
    routing::{get, post, MethodRouter},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    api_info_handler, health_handler, index_handler, root_handler, send_handler,
};
use crate::state::AppState;

/// A registered route as listed by `/index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub path: &'static str,
    pub name: &'static str,
    pub methods: &'static [&'static str],
}

impl RouteInfo {
    const fn new(path: &'static str, name: &'static str, methods: &'static [&'static str]) -> Self {
        Self {
            path,
            name,
            methods,
        }
    }
}

/// Route table shared by [`build_router`] and `/index`
fn route_table() -> Vec<(RouteInfo, MethodRouter<AppState>)> {
    vec![
        (RouteInfo::new("/", "root", &["GET"]), get(root_handler)),
        (
            RouteInfo::new("/send", "send_message", &["POST"]),
            post(send_handler),
        ),
        (
            RouteInfo::new("/checkHealth", "check_health", &["GET"]),
            get(health_handler),
        ),
        (
            RouteInfo::new("/api-info", "api_info", &["GET"]),
            get(api_info_handler),
        ),
        (
            RouteInfo::new("/index", "index", &["GET"]),
            get(index_handler),
        ),
    ]
}

/// Every route mounted by [`build_router`]
pub fn routes() -> Vec<RouteInfo> {
    route_table().into_iter().map(|(info, _)| info).collect()
}

pub fn build_router(state: AppState) -> Router {
    route_table()
        .into_iter()
        .fold(Router::new(), |router, (info, method_router)| {
            router.route(info.path, method_router)
        })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_rx).await
}

/// Serve on an already bound listener until `shutdown_rx` fires.
///
/// Shutdown also cancels the session state's token, so `/send` requests still
/// waiting on a reply finish and graceful shutdown can complete.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
