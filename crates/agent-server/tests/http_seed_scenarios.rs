use std::collections::HashMap;
use std::sync::Arc;

use agent_core::{Bar, CalendarProvider, CoreResult, InMemorySessionStore, Metric, QueryParameters, Task};
use agent_server::{routes, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Datelike, NaiveDate, Weekday};
use dialog_router::Router;
use http_body_util::BodyExt;
use llm_bridge::LlmBridge;
use serde_json::Value;
use ticker_resolver::{DisambiguatorConfig, TickerDisambiguator};
use tower::ServiceExt;
use universe::UniverseCatalog;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

struct FakeCalendar;

impl FakeCalendar {
    fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date)
    }

    fn prev_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.pred_opt().unwrap();
        while Self::is_weekend(cursor) {
            cursor = cursor.pred_opt().unwrap();
        }
        cursor
    }

    fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.succ_opt().unwrap();
        while Self::is_weekend(cursor) {
            cursor = cursor.succ_opt().unwrap();
        }
        cursor
    }

    fn nth_prev_trading_day(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut cursor = date;
        for _ in 0..n {
            cursor = self.prev_trading_day(cursor);
        }
        cursor
    }
}

struct FakeOhlcv {
    bars: HashMap<String, Vec<Bar>>,
}

#[async_trait]
impl agent_core::OhlcvProvider for FakeOhlcv {
    async fn load(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> CoreResult<Vec<Bar>> {
        let series = self.bars.get(ticker).cloned().unwrap_or_default();
        Ok(series.into_iter().filter(|bar| bar.date >= start && bar.date <= end).collect())
    }
}

struct ScriptedLlm {
    responses: HashMap<String, QueryParameters>,
}

#[async_trait]
impl LlmBridge for ScriptedLlm {
    async fn extract_params(&self, question: &str, _api_key: &str) -> QueryParameters {
        self.responses.get(question).cloned().unwrap_or(QueryParameters {
            task: Some(Task::Unknown),
            ..Default::default()
        })
    }

    async fn fill_slots(&self, _user_reply: &str, _slots: &[String], _api_key: &str) -> Option<HashMap<String, Value>> {
        None
    }

    async fn choose_alias(&self, _alias: &str, candidates: &[String], _api_key: &str) -> (String, f64) {
        (candidates.first().cloned().unwrap_or_default(), 0.0)
    }
}

fn test_catalog() -> UniverseCatalog {
    let dir = std::env::temp_dir().join(format!("agent-server-http-seed-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let kospi = dir.join("kospi.csv");
    std::fs::write(&kospi, "종목코드,종목명\n005930.KS,삼성전자\n").unwrap();
    let kosdaq = dir.join("kosdaq.csv");
    std::fs::write(&kosdaq, "종목코드,종목명\n").unwrap();
    let alias = dir.join("alias.csv");
    std::fs::write(&alias, "alias,ticker\n").unwrap();
    UniverseCatalog::load(&kospi, &kosdaq, &alias).unwrap()
}

fn build_app(responses: HashMap<String, QueryParameters>, bars: HashMap<String, Vec<Bar>>) -> axum::Router {
    let catalog = Arc::new(test_catalog());
    let llm: Arc<dyn LlmBridge> = Arc::new(ScriptedLlm { responses });
    let disambiguator = Arc::new(TickerDisambiguator::new(&catalog, llm.clone(), DisambiguatorConfig::default()));

    let router = Arc::new(Router {
        calendar: Arc::new(FakeCalendar),
        ohlcv: Arc::new(FakeOhlcv { bars }),
        catalog,
        llm,
        disambiguator,
        sessions: Arc::new(InMemorySessionStore::new()),
    });

    routes::agent_routes()
        .layer(axum::middleware::from_fn(agent_server::auth::auth_middleware))
        .layer(axum::middleware::from_fn(agent_server::request_id::request_id_middleware))
        .with_state(AppState { router })
}

#[tokio::test]
async fn missing_bearer_token_is_rejected_with_401() {
    let app = build_app(HashMap::new(), HashMap::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/agent?question=%EC%A2%85%EA%B0%80")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_question_is_rejected_with_400() {
    let app = build_app(HashMap::new(), HashMap::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/agent?question=")
                .header("Authorization", "Bearer test-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_is_exempt_from_auth() {
    let app = build_app(HashMap::new(), HashMap::new());

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn simple_lookup_resolves_over_http() {
    let mut responses = HashMap::new();
    responses.insert(
        "2025-06-11 삼성전자 종가".to_string(),
        QueryParameters {
            task: Some(Task::SimpleLookup),
            date: Some(d("2025-06-11")),
            tickers: vec!["삼성전자".to_string()],
            metrics: vec![Metric::Close],
            ..Default::default()
        },
    );
    let mut bars = HashMap::new();
    bars.insert("005930.KS".to_string(), vec![Bar {
        date: d("2025-06-11"),
        open: 71000.0,
        high: 72000.0,
        low: 70500.0,
        close: 71500.0,
        adj_close: 71500.0,
        volume: 1000.0,
    }]);
    let app = build_app(responses, bars);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/agent?question=2025-06-11%20%EC%82%BC%EC%84%B1%EC%A0%84%EC%9E%90%20%EC%A2%85%EA%B0%80&session_id=s1")
                .header("Authorization", "Bearer test-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["session_id"], "s1");
    assert!(json["answer"].as_str().unwrap().contains("삼성전자"));
}
