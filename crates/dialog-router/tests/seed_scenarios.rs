use std::collections::HashMap;
use std::sync::Arc;

use agent_core::{
    Bar, CalendarProvider, Conditions, CoreResult, CrossSide, InMemorySessionStore, Market, Metric, OhlcvProvider, QueryParameters, Task,
};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use dialog_router::Router;
use llm_bridge::LlmBridge;
use serde_json::Value;
use ticker_resolver::{DisambiguatorConfig, TickerDisambiguator};
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
impl OhlcvProvider for FakeOhlcv {
    async fn load(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> CoreResult<Vec<Bar>> {
        let series = self.bars.get(ticker).cloned().unwrap_or_default();
        Ok(series.into_iter().filter(|bar| bar.date >= start && bar.date <= end).collect())
    }
}

fn bar(date: &str, close: f64, volume: f64) -> Bar {
    Bar {
        date: d(date),
        open: close,
        high: close,
        low: close,
        close,
        adj_close: close,
        volume,
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

    async fn fill_slots(&self, user_reply: &str, _slots: &[String], _api_key: &str) -> Option<HashMap<String, Value>> {
        let date = NaiveDate::parse_from_str(user_reply.trim(), "%Y-%m-%d").ok()?;
        let mut out = HashMap::new();
        out.insert("date".to_string(), Value::String(date.to_string()));
        Some(out)
    }

    async fn choose_alias(&self, _alias: &str, candidates: &[String], _api_key: &str) -> (String, f64) {
        (candidates.first().cloned().unwrap_or_default(), 0.0)
    }
}

fn test_catalog() -> UniverseCatalog {
    let dir = std::env::temp_dir().join(format!("dialog-router-seed-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let kospi = dir.join("kospi.csv");
    std::fs::write(&kospi, "종목코드,종목명\n005930.KS,삼성전자\n").unwrap();
    let kosdaq = dir.join("kosdaq.csv");
    std::fs::write(&kosdaq, "종목코드,종목명\n035720.KQ,카카오\n").unwrap();
    let alias = dir.join("alias.csv");
    std::fs::write(&alias, "alias,ticker\n").unwrap();
    UniverseCatalog::load(&kospi, &kosdaq, &alias).unwrap()
}

fn test_catalog_five_kospi() -> UniverseCatalog {
    let dir = std::env::temp_dir().join(format!("dialog-router-seed-5kospi-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let kospi = dir.join("kospi.csv");
    std::fs::write(
        &kospi,
        "종목코드,종목명\n005930.KS,삼성전자\n000660.KS,SK하이닉스\n207940.KS,삼성바이오로직스\n005380.KS,현대차\n035420.KS,NAVER\n",
    )
    .unwrap();
    let kosdaq = dir.join("kosdaq.csv");
    std::fs::write(&kosdaq, "종목코드,종목명\n").unwrap();
    let alias = dir.join("alias.csv");
    std::fs::write(&alias, "alias,ticker\n").unwrap();
    UniverseCatalog::load(&kospi, &kosdaq, &alias).unwrap()
}

fn build_router_with_catalog(catalog: UniverseCatalog, responses: HashMap<String, QueryParameters>, bars: HashMap<String, Vec<Bar>>) -> Router {
    let catalog = Arc::new(catalog);
    let llm: Arc<dyn LlmBridge> = Arc::new(ScriptedLlm { responses });
    let disambiguator = Arc::new(TickerDisambiguator::new(&catalog, llm.clone(), DisambiguatorConfig::default()));

    Router {
        calendar: Arc::new(FakeCalendar),
        ohlcv: Arc::new(FakeOhlcv { bars }),
        catalog,
        llm,
        disambiguator,
        sessions: Arc::new(InMemorySessionStore::new()),
    }
}

fn build_router(responses: HashMap<String, QueryParameters>, bars: HashMap<String, Vec<Bar>>) -> Router {
    build_router_with_catalog(test_catalog(), responses, bars)
}

#[tokio::test]
async fn first_turn_simple_lookup_resolves_immediately() {
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
    bars.insert("005930.KS".to_string(), vec![bar("2025-06-11", 71500.0, 1000.0)]);

    let router = build_router(responses, bars);
    let answer = router.handle_turn("session-1", "2025-06-11 삼성전자 종가", "key", d("2025-06-11")).await;

    assert!(answer.contains("삼성전자"));
    assert!(answer.contains("71500"));
    assert!(router.sessions.get("session-1").await.is_none(), "a completed answer clears the session");
}

#[tokio::test]
async fn missing_date_opens_a_session_then_resolves_on_follow_up() {
    let mut responses = HashMap::new();
    responses.insert(
        "카카오 종가".to_string(),
        QueryParameters {
            task: Some(Task::SimpleLookup),
            tickers: vec!["카카오".to_string()],
            metrics: vec![Metric::Close],
            ..Default::default()
        },
    );
    let mut bars = HashMap::new();
    bars.insert("035720.KQ".to_string(), vec![bar("2024-12-02", 45000.0, 500.0)]);

    let router = build_router(responses, bars);
    let first = router.handle_turn("session-2", "카카오 종가", "key", d("2024-12-03")).await;
    assert!(
        router.sessions.get("session-2").await.is_some(),
        "prompt turn must leave a pending session"
    );
    assert!(!first.is_empty());

    let second = router.handle_turn("session-2", "2024-12-02", "key", d("2024-12-03")).await;
    assert!(second.contains("카카오"));
    assert!(router.sessions.get("session-2").await.is_none());
}

#[tokio::test]
async fn non_trading_day_returns_holiday_message_and_clears_session() {
    let mut responses = HashMap::new();
    responses.insert(
        "2025-06-14 KOSPI 지수".to_string(),
        QueryParameters {
            task: Some(Task::SimpleLookup),
            date: Some(d("2025-06-14")),
            market: Some(Market::Kospi),
            metrics: vec![Metric::Index],
            ..Default::default()
        },
    );

    let router = build_router(responses, HashMap::new());
    let answer = router.handle_turn("session-3", "2025-06-14 KOSPI 지수", "key", d("2025-06-14")).await;

    assert!(answer.contains("휴장일"));
    assert!(router.sessions.get("session-3").await.is_none());
}

#[tokio::test]
async fn market_rank_top_five_kospi_by_volume_lists_five_names() {
    let mut responses = HashMap::new();
    responses.insert(
        "2025-06-11 KOSPI에서 거래량이 높은 5개의 종목".to_string(),
        QueryParameters {
            task: Some(Task::MarketRank),
            date: Some(d("2025-06-11")),
            market: Some(Market::Kospi),
            metrics: vec![Metric::Volume],
            rank_n: Some(5),
            ..Default::default()
        },
    );
    let mut bars = HashMap::new();
    for (ticker, volume) in [
        ("005930.KS", 5000.0),
        ("000660.KS", 4000.0),
        ("207940.KS", 3000.0),
        ("005380.KS", 2000.0),
        ("035420.KS", 1000.0),
    ] {
        bars.insert(ticker.to_string(), vec![bar("2025-06-11", 70000.0, volume)]);
    }

    let router = build_router_with_catalog(test_catalog_five_kospi(), responses, bars);
    let answer = router
        .handle_turn("session-5", "2025-06-11 KOSPI에서 거래량이 높은 5개의 종목", "key", d("2025-06-11"))
        .await;

    let names: Vec<&str> = answer.split(", ").collect();
    assert_eq!(names.len(), 5, "answer should list exactly five names: {answer}");
    assert!(names.contains(&"삼성전자"));
}

#[tokio::test]
async fn ambiguous_ticker_alias_prompts_and_retains_resolved_tickers() {
    let mut responses = HashMap::new();
    responses.insert(
        "2025-06-11 삼성전자 반도체".to_string(),
        QueryParameters {
            task: Some(Task::SimpleLookup),
            date: Some(d("2025-06-11")),
            tickers: vec!["삼성전자".to_string(), "반도체".to_string()],
            metrics: vec![Metric::Close],
            ..Default::default()
        },
    );

    let router = build_router(responses, HashMap::new());
    let answer = router.handle_turn("session-4", "2025-06-11 삼성전자 반도체", "key", d("2025-06-11")).await;

    assert!(
        answer.starts_with("종목명 인식에 실패하였습니다."),
        "unexpected answer: {answer}"
    );
    let session = router
        .sessions
        .get("session-4")
        .await
        .expect("a below-confidence alias must leave a pending session");
    assert_eq!(session.parameters.tickers, vec!["삼성전자".to_string()]);
}

#[tokio::test]
async fn golden_cross_count_phrasing_for_a_date_range() {
    let mut responses = HashMap::new();
    responses.insert(
        "2025-06-02~2025-06-11 삼성전자 골든크로스 몇 번".to_string(),
        QueryParameters {
            task: Some(Task::CountSearch),
            date_from: Some(d("2025-06-02")),
            date_to: Some(d("2025-06-11")),
            tickers: vec!["삼성전자".to_string()],
            conditions: Conditions {
                cross: Some(CrossSide::Golden),
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let days = [
        "2025-06-02",
        "2025-06-03",
        "2025-06-04",
        "2025-06-05",
        "2025-06-06",
        "2025-06-09",
        "2025-06-10",
        "2025-06-11",
    ];
    let series: Vec<Bar> = days.iter().enumerate().map(|(i, day)| bar(day, 70000.0 + i as f64 * 100.0, 1000.0)).collect();
    let mut bars = HashMap::new();
    bars.insert("005930.KS".to_string(), series);

    let router = build_router(responses, bars);
    let answer = router
        .handle_turn("session-6", "2025-06-02~2025-06-11 삼성전자 골든크로스 몇 번", "key", d("2025-06-11"))
        .await;

    assert!(answer.contains("골든크로스가 발생한 횟수는"), "unexpected answer: {answer}");
    assert!(answer.ends_with("번입니다."));
}
