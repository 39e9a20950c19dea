pub mod auth;
pub mod calendar;
pub mod config;
pub mod ohlcv;
pub mod request_id;
pub mod routes;

use std::sync::Arc;

use agent_core::InMemorySessionStore;
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Json,
};
use dialog_router::Router;
use llm_bridge::{HttpLlmBridge, LlmConfig};
use serde_json::json;
use ticker_resolver::TickerDisambiguator;
use universe::UniverseCatalog;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
}

/// Errors reaching the HTTP edge without having been routed through the
/// dialog router — per the specification these are the only two non-200
/// outcomes (§7): a missing bearer token and an empty question.
#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    EmptyQuestion,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing bearer token"),
            AppError::EmptyQuestion => (StatusCode::BAD_REQUEST, "question must not be empty"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agent_server=info,dialog_router=info,ticker_resolver=info,warn".into());
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().try_init().ok();
    } else {
        subscriber.try_init().ok();
    }
}

fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let catalog = Arc::new(UniverseCatalog::load(&config.kospi_csv, &config.kosdaq_csv, &config.alias_csv)?);
    let llm_config = LlmConfig {
        timeout: std::time::Duration::from_secs(config.request_timeout_secs),
        ..LlmConfig::default()
    };
    let llm: Arc<dyn llm_bridge::LlmBridge> = Arc::new(HttpLlmBridge::new(llm_config));
    let disambiguator = Arc::new(TickerDisambiguator::new(&catalog, llm.clone(), config.disambiguator));

    let router = Arc::new(Router {
        calendar: Arc::new(crate::calendar::WeekendCalendar),
        ohlcv: Arc::new(crate::ohlcv::CsvOhlcvProvider::new(&config.ohlcv_dir)),
        catalog,
        llm,
        disambiguator,
        sessions: Arc::new(InMemorySessionStore::new()),
    });

    Ok(AppState { router })
}

/// Assembles the axum app and serves it until the process is signalled.
/// Delegates from `main.rs` the way the teacher's `api-server` binary
/// delegates to `api_server::run_server()`.
pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    let state = build_state(&config)?;

    let app = routes::agent_routes()
        .layer(middleware::from_fn(auth::auth_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "agent-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
