use std::time::Instant;

use agent_core::AgentResponse;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router as AxumRouter,
};
use serde::Deserialize;

use crate::auth::BearerToken;
use crate::request_id::RequestId;
use crate::{AppError, AppState};

#[derive(Deserialize, utoipa::IntoParams)]
pub struct AgentQuery {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub fn agent_routes() -> AxumRouter<AppState> {
    AxumRouter::new()
        .route("/agent", get(handle_agent_query))
        .route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[utoipa::path(
    get,
    path = "/agent",
    params(AgentQuery),
    responses((status = 200, description = "Answer to a Korean-equity question, or a follow-up prompt")),
    tag = "Agent"
)]
async fn handle_agent_query(
    State(state): State<AppState>,
    Query(query): Query<AgentQuery>,
    Extension(bearer): Extension<BearerToken>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<AgentResponse>, AppError> {
    let question = query.question.trim();
    if question.is_empty() {
        return Err(AppError::EmptyQuestion);
    }

    let session_id = query.session_id.unwrap_or(request_id.0);
    let today = chrono::Utc::now().date_naive();

    let started = Instant::now();
    let answer = state
        .router
        .handle_turn(&session_id, question, &bearer.0, today)
        .await;
    tracing::info!(
        session_id = %session_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "handled agent turn"
    );

    Ok(Json(AgentResponse { answer, session_id }))
}
