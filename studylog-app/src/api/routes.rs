use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

use studylog_core::{
    list_events, list_stats, process_session, EventFilter, Page, ReviewEvent, ReviewStats,
    ReviewStore, SessionSubmission, StatsFilter,
};

use crate::api::auth::Identity;
use crate::api::dto::LoggedOut;
use crate::api::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReviewStore>,
}

pub async fn submit_session(
    State(st): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Json(body): Json<SessionSubmission>,
) -> Result<Json<LoggedOut>, ApiError> {
    let logged = process_session(st.store.as_ref(), user_id, body).await?;
    Ok(Json(LoggedOut { logged }))
}

pub async fn get_events(
    State(st): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Query(filter): Query<EventFilter>,
) -> Result<Json<Page<ReviewEvent>>, ApiError> {
    Ok(Json(list_events(st.store.as_ref(), user_id, filter).await?))
}

pub async fn get_stats(
    State(st): State<Arc<AppState>>,
    Identity(user_id): Identity,
    Query(filter): Query<StatsFilter>,
) -> Result<Json<Page<ReviewStats>>, ApiError> {
    Ok(Json(list_stats(st.store.as_ref(), user_id, filter).await?))
}

pub async fn healthz() -> &'static str {
    "ok"
}
