use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use studylog_core::ReviewStore;

use crate::api::routes::{get_events, get_stats, healthz, submit_session, AppState};

pub async fn run(store: Arc<dyn ReviewStore>, addr: SocketAddr) -> anyhow::Result<()> {
    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/sessions", post(submit_session))
        .route("/events", get(get_events))
        .route("/stats", get(get_stats))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    tracing::info!(%addr, "studylog api listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
