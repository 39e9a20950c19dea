use std::collections::HashMap;
use std::time::Duration;

use agent_core::{Conditions, Market, Metric, QueryParameters, Task};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use crate::error::{LlmError, LlmResult};
use crate::json_extract::safe_json;
use crate::params_clean::clean_params;
use crate::trait_def::LlmBridge;

const SYSTEM_PROMPT: &str = include_str!("prompts/system_prompt.txt");
const DISAMBIGUATION_PROMPT: &str = include_str!("prompts/disambiguation_prompt.txt");

const METRIC_VOCABULARY: &str =
    "\"종가\",\"시가\",\"고가\",\"저가\",\"pct_change\",\"거래량\",\"지수\",\"거래대금\",\"상승률\",\"하락률\",\"가격\",\"변동성\",\"베타\"";

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("HYPERCLOVA_API_URL").unwrap_or_else(|_| {
                "https://clovastudio.stream.ntruss.com/v3/chat-completions/HCX-005".to_string()
            }),
            timeout: Duration::from_secs(40),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// HTTP implementation of `LlmBridge`. One shared `reqwest::Client` backs
/// all three operations, mirroring the pooled-client pattern used
/// throughout this codebase's other external-service clients.
pub struct HttpLlmBridge {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmBridge {
    pub fn new(config: LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(20)
            .build()
            .expect("failed to build llm-bridge http client");
        Self { client, config }
    }

    pub fn with_defaults() -> Self {
        Self::new(LlmConfig::default())
    }

    async fn chat(
        &self,
        system_prompt: &str,
        user_message: &str,
        api_key: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> LlmResult<String> {
        if api_key.is_empty() {
            return Err(LlmError::ServiceUnavailable("no api key supplied".into()));
        }

        let payload = json!({
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
            "maxTokens": max_tokens,
            "temperature": temperature,
            "topP": 0.8,
            "topK": 0,
            "repetitionPenalty": 1.1,
            "includeAiFilters": false,
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("X-NCP-CLOVASTUDIO-REQUEST-ID", uuid::Uuid::new_v4().to_string())
            .header("Content-Type", "application/json; charset=utf-8")
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        if response.status().as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(LlmError::InvalidResponse(format!(
                "completion service returned {}",
                response.status()
            )));
        }

        let data: Value = response.json().await?;
        let content = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .or_else(|| {
                data.get("result")
                    .and_then(|r| r.get("message"))
                    .and_then(|m| m.get("content"))
            })
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(content)
    }

    async fn chat_with_retry(
        &self,
        system_prompt: &str,
        user_message: &str,
        api_key: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Option<Value> {
        let mut delay = self.config.initial_backoff;
        for attempt in 0..self.config.max_retries {
            match self
                .chat(system_prompt, user_message, api_key, max_tokens, temperature)
                .await
            {
                Ok(content) => return safe_json(&content),
                Err(LlmError::RateLimited) => {
                    tracing::warn!(attempt, ?delay, "rate limited by completion service, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => {
                    tracing::warn!(%err, "completion service call failed");
                    return None;
                }
            }
        }
        None
    }
}

fn default_parameters() -> QueryParameters {
    let yesterday = (Utc::now() - ChronoDuration::days(1)).date_naive();
    QueryParameters {
        task: None,
        date: Some(yesterday),
        date_from: Some(yesterday),
        date_to: Some(yesterday),
        market: None,
        tickers: Vec::new(),
        metrics: Vec::new(),
        rank_n: Some(10),
        conditions: Conditions::default(),
        missing: Default::default(),
    }
}

fn parse_task(value: &Value) -> Task {
    match value.get("task").and_then(Value::as_str) {
        Some("simple_lookup") => Task::SimpleLookup,
        Some("market_rank") => Task::MarketRank,
        Some("advancers_count") => Task::AdvancersCount,
        Some("decliners_count") => Task::DeclinersCount,
        Some("traded_count") => Task::TradedCount,
        Some("stock_search") => Task::StockSearch,
        Some("count_search") => Task::CountSearch,
        Some("date_search") => Task::DateSearch,
        _ => Task::Unknown,
    }
}

fn parse_market(value: &Value) -> Option<Market> {
    match value.get("market").and_then(Value::as_str) {
        Some("KOSPI") => Some(Market::Kospi),
        Some("KOSDAQ") => Some(Market::Kosdaq),
        _ => None,
    }
}

fn parse_date(value: &Value, key: &str) -> Option<chrono::NaiveDate> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn parse_string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn metric_from_korean(token: &str) -> Option<Metric> {
    Some(match token {
        "종가" => Metric::Close,
        "시가" => Metric::Open,
        "고가" => Metric::High,
        "저가" => Metric::Low,
        "거래량" => Metric::Volume,
        "pct_change" | "등락률" => Metric::PctChange,
        "지수" => Metric::Index,
        "거래대금" => Metric::Turnover,
        "상승률" => Metric::AscendRate,
        "하락률" => Metric::DescendRate,
        "가격" => Metric::Price,
        "변동성" => Metric::Volatility,
        "베타" => Metric::Beta,
        "적삼병" => Metric::ThreeWhite,
        "흑삼병" => Metric::ThreeBlack,
        "RSI" => Metric::Rsi,
        "볼린저" => Metric::Bollinger,
        "이동평균" => Metric::MovingAvg,
        "거래량급증" => Metric::VolumeSpike,
        _ => return None,
    })
}

fn parse_metrics(value: &Value) -> Vec<Metric> {
    parse_string_list(value, "metrics")
        .iter()
        .filter_map(|token| metric_from_korean(token))
        .collect()
}

#[async_trait]
impl LlmBridge for HttpLlmBridge {
    async fn extract_params(&self, question: &str, api_key: &str) -> QueryParameters {
        let Some(data) = self
            .chat_with_retry(SYSTEM_PROMPT, question, api_key, 256, 0.5)
            .await
        else {
            tracing::warn!(%question, "extract_params parse failed, falling back to unknown");
            return QueryParameters {
                task: Some(Task::Unknown),
                ..Default::default()
            };
        };

        if data.get("task").is_none() {
            return QueryParameters {
                task: Some(Task::Unknown),
                ..Default::default()
            };
        }

        let mut params = default_parameters();
        params.task = Some(parse_task(&data));
        if let Some(date) = parse_date(&data, "date") {
            params.date = Some(date);
        }
        if let Some(date_from) = parse_date(&data, "date_from") {
            params.date_from = Some(date_from);
        }
        if let Some(date_to) = parse_date(&data, "date_to") {
            params.date_to = Some(date_to);
        }
        params.market = parse_market(&data);
        params.tickers = parse_string_list(&data, "tickers");
        params.metrics = parse_metrics(&data);
        if let Some(n) = data.get("rank_n").and_then(Value::as_u64) {
            params.rank_n = Some(n as u32);
        }
        params
    }

    async fn fill_slots(
        &self,
        user_reply: &str,
        slots: &[String],
        api_key: &str,
    ) -> Option<HashMap<String, Value>> {
        if slots.is_empty() {
            return Some(HashMap::new());
        }

        let slot_line = slots.join(", ");
        let sample = format!(
            "{{{}}}",
            slots
                .iter()
                .map(|s| format!("\"{s}\": \"<value>\""))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let system_prompt = format!(
            "당신은 한국 주식 질의용 AI이다.\n\
             사용자 답변에서 다음 필드({slot_line})의 값을 추출해 JSON 한 줄로만 응답하라.\n\
             {sample} 형식을 반드시 준수하라.\n\
             값이 없으면 <value> 자리에 null을 입력하라.\n\
             \"date\"에 대해서는 {{\"date\":\"YYYY-MM-DD\"}} 형태로 반환하라.\n\
             \"date_from\"에 대해서는 {{\"date_from\":\"YYYY-MM-DD\"}} 형태로 반환하라.\n\
             \"date_to\"에 대해서는 {{\"date_to\":\"YYYY-MM-DD\"}} 형태로 반환하라.\n\
             \"metrics\"에 대해서는 {{\"metrics\":[\"종가\", \"거래량\"]}} 형태로 반환하라. \
             metrics ∈ {{{METRIC_VOCABULARY}}} 외의 값은 허용되지 않는다.\n\
             \"tickers\"에 대해서는 {{\"tickers\":[\"삼성전자\"]}} 형태로 종목명을 반환하라.\n\
             \"코스피\"/\"KOSPI\"가 질문에 포함되면 \"market\":\"KOSPI\", \
             \"코스닥\"/\"KOSDAQ\"이 포함되면 \"market\":\"KOSDAQ\", 없으면 null로 반환하라."
        );

        let data = self
            .chat_with_retry(&system_prompt, user_reply, api_key, 128, 0.2)
            .await?;
        let cleaned = clean_params(&data);
        let Value::Object(map) = cleaned else {
            return None;
        };
        let filtered: HashMap<String, Value> = map
            .into_iter()
            .filter(|(k, v)| slots.contains(k) && !matches!(v, Value::Null) && v != &json!("") && v != &json!([]))
            .collect();
        if filtered.is_empty() {
            None
        } else {
            Some(filtered)
        }
    }

    async fn choose_alias(&self, alias: &str, candidates: &[String], api_key: &str) -> (String, f64) {
        if candidates.is_empty() {
            return (String::new(), 0.0);
        }
        let user_prompt = format!(
            "사용자 별칭: '{alias}'\n후보: {}\n가장 잘 맞는 하나를 골라 JSON 형식으로 답변하세요.",
            candidates.join(", ")
        );
        let Some(data) = self
            .chat_with_retry(DISAMBIGUATION_PROMPT, &user_prompt, api_key, 128, 0.0)
            .await
        else {
            return (candidates[0].clone(), 0.0);
        };

        let best = data.get("best").and_then(Value::as_str).unwrap_or_default().to_string();
        let confidence = data.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);

        if !candidates.contains(&best) {
            (candidates[0].clone(), 0.0)
        } else {
            (best, confidence)
        }
    }
}
