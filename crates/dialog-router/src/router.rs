use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use agent_core::{
    CalendarProvider, Conditions, MovingAvgCondition, OffPeakCondition, OhlcvProvider, PeakCondition, QueryParameters,
    Range, RsiCondition, Session, SessionStore, Task, VolumeSpikeCondition,
};
use chrono::NaiveDate;
use llm_bridge::LlmBridge;
use serde_json::Value;
use ticker_resolver::TickerDisambiguator;
use universe::UniverseCatalog;

use crate::checker;
use crate::error::{RouterError, RouterResult};
use crate::messages;
use crate::tasks;

const RECENT_WORDS: [&str; 5] = ["최근", "요즘", "근래", "요새", "이즈음"];
const TODAY_WORDS: [&str; 4] = ["오늘", "금일", "당일", "오늘자"];

/// Wires the three core subsystems together behind one per-turn entry
/// point. Holds no mutable state of its own — all state lives in the
/// session store.
pub struct Router {
    pub calendar: Arc<dyn CalendarProvider>,
    pub ohlcv: Arc<dyn OhlcvProvider>,
    pub catalog: Arc<UniverseCatalog>,
    pub llm: Arc<dyn LlmBridge>,
    pub disambiguator: Arc<TickerDisambiguator>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Router {
    /// Runs one full turn: merge, auto-fill, check, and either persist a
    /// follow-up prompt or dispatch and return the final answer. Never
    /// returns an `Err` — every failure mode degrades to a user-facing
    /// message per the error propagation policy.
    pub async fn handle_turn(&self, session_id: &str, question: &str, api_key: &str, today: NaiveDate) -> String {
        let mut params = self.merge_turn(session_id, question, api_key).await;
        self.apply_relative_date_autofill(question, today, &mut params);

        let Some(task) = params.task else {
            self.sessions.clear(session_id).await;
            return messages::could_not_understand_message();
        };
        if task == Task::Unknown {
            self.sessions.clear(session_id).await;
            return messages::could_not_understand_message();
        }

        let missing = checker::missing_slots(&params);
        if !missing.is_empty() {
            let prompt = self.synthesize_prompt(task, &params, &missing);
            params.missing = missing;
            self.sessions.set(session_id, Session { parameters: params }).await;
            return prompt;
        }

        match self.dispatch(&mut params, api_key).await {
            Ok(answer) => {
                self.sessions.clear(session_id).await;
                answer
            }
            Err(RouterError::AmbiguousTicker { alias, candidates }) => {
                params.remove_ticker(&alias);
                self.sessions.set(session_id, Session { parameters: params }).await;
                messages::ambiguous_ticker_prompt(&alias, &candidates)
            }
            Err(err) => {
                tracing::warn!(error = %err, "handler failed");
                self.sessions.set(session_id, Session { parameters: params }).await;
                messages::could_not_understand_message()
            }
        }
    }

    async fn merge_turn(&self, session_id: &str, question: &str, api_key: &str) -> QueryParameters {
        match self.sessions.get(session_id).await {
            Some(session) => {
                let mut pending = session.parameters;
                if !pending.missing.is_empty() {
                    let slots: Vec<String> = pending.missing.iter().cloned().collect();
                    if let Some(filled) = self.llm.fill_slots(question, &slots, api_key).await {
                        apply_filled_slots(&mut pending, filled);
                    }
                }
                let extra = self.llm.extract_params(question, api_key).await;
                pending.merge_non_overwrite(extra);
                pending
            }
            None => self.llm.extract_params(question, api_key).await,
        }
    }

    fn apply_relative_date_autofill(&self, question: &str, today: NaiveDate, params: &mut QueryParameters) {
        if params.date.is_none() && params.date_to.is_none() {
            let is_relative = RECENT_WORDS.iter().chain(TODAY_WORDS.iter()).any(|word| question.contains(word));
            if is_relative {
                let most_recent = self.calendar.most_recent_trading_day(today);
                params.date = Some(most_recent);
                if params.date_from.is_some() {
                    params.date_to = Some(most_recent);
                }
            }
        }
    }

    fn synthesize_prompt(&self, task: Task, params: &QueryParameters, missing: &BTreeSet<String>) -> String {
        match task {
            Task::SimpleLookup => messages::simple_lookup_prompt(params, missing),
            Task::MarketRank => messages::market_rank_prompt(params, missing),
            Task::AdvancersCount | Task::DeclinersCount | Task::TradedCount => messages::count_prompt(),
            Task::StockSearch => messages::stock_search_prompt(&params.conditions, missing),
            Task::CountSearch | Task::DateSearch => messages::count_date_search_prompt(missing),
            Task::Unknown => messages::could_not_understand_message(),
        }
    }

    async fn resolve_tickers(&self, params: &mut QueryParameters, api_key: &str) -> RouterResult<()> {
        let mut resolved = Vec::with_capacity(params.tickers.len());
        for alias in &params.tickers {
            let (ticker, _name) = self.disambiguator.resolve(alias, api_key).await?;
            resolved.push(ticker);
        }
        params.tickers = resolved;
        Ok(())
    }

    async fn dispatch(&self, params: &mut QueryParameters, api_key: &str) -> RouterResult<String> {
        if !params.tickers.is_empty() {
            self.resolve_tickers(params, api_key).await?;
        }

        match params.task {
            Some(Task::SimpleLookup) => {
                tasks::simple_lookup::handle(params, self.calendar.as_ref(), self.ohlcv.as_ref(), self.catalog.as_ref()).await
            }
            Some(Task::MarketRank) => {
                tasks::market_rank::handle(params, self.calendar.as_ref(), self.ohlcv.as_ref(), self.catalog.as_ref()).await
            }
            Some(Task::AdvancersCount) | Some(Task::DeclinersCount) | Some(Task::TradedCount) => {
                tasks::counts::handle(params, self.calendar.as_ref(), self.ohlcv.as_ref(), self.catalog.as_ref()).await
            }
            Some(Task::StockSearch) => {
                tasks::stock_search::handle(params, self.calendar.as_ref(), self.ohlcv.as_ref(), self.catalog.as_ref()).await
            }
            Some(Task::CountSearch) | Some(Task::DateSearch) => {
                tasks::count_date_search::handle(params, self.calendar.as_ref(), self.ohlcv.as_ref(), self.catalog.as_ref()).await
            }
            _ => Ok(messages::could_not_understand_message()),
        }
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().map(|v| v as u32).or_else(|| value.as_f64().map(|v| v as u32))
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Applies the LLM's slot-filling response onto the pending parameter
/// record. Only the slots present in `filled` are touched; unknown keys
/// are ignored rather than treated as an error, since `fill_slots` only
/// ever returns a subset of the slots asked for.
fn apply_filled_slots(pending: &mut QueryParameters, filled: HashMap<String, Value>) {
    let c = &mut pending.conditions;
    for (key, value) in filled {
        match key.as_str() {
            "date" => pending.date = as_date(&value).or(pending.date),
            "date_from" => pending.date_from = as_date(&value).or(pending.date_from),
            "date_to" => pending.date_to = as_date(&value).or(pending.date_to),
            "market" => {
                pending.market = value
                    .as_str()
                    .and_then(|s| match s.to_uppercase().as_str() {
                        "KOSPI" => Some(agent_core::Market::Kospi),
                        "KOSDAQ" => Some(agent_core::Market::Kosdaq),
                        _ => None,
                    })
                    .or(pending.market)
            }
            "tickers" => {
                if let Some(arr) = value.as_array() {
                    for v in arr {
                        if let Some(s) = v.as_str() {
                            if !pending.tickers.iter().any(|t| t == s) {
                                pending.tickers.push(s.to_string());
                            }
                        }
                    }
                }
            }
            "rank_n" => pending.rank_n = as_u32(&value).or(pending.rank_n),
            "order" => {
                c.order = value
                    .as_str()
                    .and_then(|s| match s {
                        "high" => Some(agent_core::RankOrder::High),
                        "low" => Some(agent_core::RankOrder::Low),
                        _ => None,
                    })
                    .or(c.order)
            }
            "bollinger_touch" => {
                c.bollinger_touch = value
                    .as_str()
                    .and_then(|s| match s {
                        "upper" => Some(agent_core::BollingerBand::Upper),
                        "lower" => Some(agent_core::BollingerBand::Lower),
                        _ => None,
                    })
                    .or(c.bollinger_touch)
            }
            "cross" => {
                c.cross = value
                    .as_str()
                    .and_then(|s| match s {
                        "golden" => Some(agent_core::CrossSide::Golden),
                        "dead" => Some(agent_core::CrossSide::Dead),
                        "both" => Some(agent_core::CrossSide::Both),
                        _ => None,
                    })
                    .or(c.cross)
            }
            "three_pattern" => {
                c.three_pattern = value
                    .as_str()
                    .and_then(|s| match s {
                        "white" => Some(agent_core::ThreePattern::White),
                        "black" => Some(agent_core::ThreePattern::Black),
                        _ => None,
                    })
                    .or(c.three_pattern)
            }
            "consecutive_change" => {
                c.consecutive_change = value
                    .as_str()
                    .and_then(|s| match s {
                        "up" => Some(agent_core::ConsecutiveDirection::Up),
                        "down" => Some(agent_core::ConsecutiveDirection::Down),
                        _ => None,
                    })
                    .or(c.consecutive_change)
            }
            "RSI.window" => {
                let cond = c.rsi.get_or_insert(RsiCondition::default());
                cond.window = as_u32(&value).or(cond.window);
            }
            "RSI.min" => fill_range_min(&mut c.rsi.get_or_insert(RsiCondition::default()).range, &value),
            "RSI.max" => fill_range_max(&mut c.rsi.get_or_insert(RsiCondition::default()).range, &value),
            "volume_spike.window" => {
                let cond = c.volume_spike.get_or_insert(VolumeSpikeCondition::default());
                cond.window = as_u32(&value).or(cond.window);
            }
            "volume_spike.volume_ratio.min" => {
                let cond = c.volume_spike.get_or_insert(VolumeSpikeCondition::default());
                cond.ratio_min = as_f64(&value).or(cond.ratio_min);
            }
            "moving_avg.window" => {
                let cond = c.moving_avg.get_or_insert(MovingAvgCondition::default());
                cond.window = as_u32(&value).or(cond.window);
            }
            "moving_avg.diff_pct.min" => fill_range_min(&mut c.moving_avg.get_or_insert(MovingAvgCondition::default()).diff_pct, &value),
            "moving_avg.diff_pct.max" => fill_range_max(&mut c.moving_avg.get_or_insert(MovingAvgCondition::default()).diff_pct, &value),
            "peak_break.period_days" => {
                let cond = c.peak_break.get_or_insert(PeakCondition::default());
                cond.period_days = as_u32(&value).or(cond.period_days);
            }
            "peak_low.period_days" => {
                let cond = c.peak_low.get_or_insert(PeakCondition::default());
                cond.period_days = as_u32(&value).or(cond.period_days);
            }
            "off_peak.period_days" => {
                let cond = c.off_peak.get_or_insert(OffPeakCondition::default());
                cond.period_days = as_u32(&value).or(cond.period_days);
            }
            "off_peak.min" => {
                let cond = c.off_peak.get_or_insert(OffPeakCondition::default());
                cond.min = as_f64(&value).or(cond.min);
            }
            other if other.ends_with(".min") || other.ends_with(".max") => {
                apply_plain_range_slot(c, other, &value);
            }
            other => {
                tracing::debug!(slot = other, "fill_slots returned an unrecognized slot; ignored");
            }
        }
    }
}

fn fill_range_min(range: &mut Range, value: &Value) {
    range.min = as_f64(value).or(range.min);
}

fn fill_range_max(range: &mut Range, value: &Value) {
    range.max = as_f64(value).or(range.max);
}

/// Handles the plain `{leaf}.min` / `{leaf}.max` paths for the simple
/// numeric-range leaves (`price_close`, `volume`, `pct_change`,
/// `volume_pct`, `pct_change_range`, `gap_pct`).
fn apply_plain_range_slot(c: &mut Conditions, slot: &str, value: &Value) {
    let (leaf, bound) = match slot.rsplit_once('.') {
        Some(parts) => parts,
        None => return,
    };
    let range: &mut Range = match leaf {
        "price_close" => c.price_close.get_or_insert(Range::default()),
        "volume" => c.volume.get_or_insert(Range::default()),
        "pct_change" => c.pct_change.get_or_insert(Range::default()),
        "volume_pct" => c.volume_pct.get_or_insert(Range::default()),
        "pct_change_range" => c.pct_change_range.get_or_insert(Range::default()),
        "gap_pct" => c.gap_pct.get_or_insert(Range::default()),
        _ => return,
    };
    if bound == "min" {
        fill_range_min(range, value);
    } else {
        fill_range_max(range, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_top_level_date_slot() {
        let mut params = QueryParameters::default();
        let mut filled = HashMap::new();
        filled.insert("date".to_string(), Value::String("2025-06-11".to_string()));
        apply_filled_slots(&mut params, filled);
        assert_eq!(params.date, NaiveDate::parse_from_str("2025-06-11", "%Y-%m-%d").ok());
    }

    #[test]
    fn fills_dotted_condition_slot() {
        let mut params = QueryParameters::default();
        let mut filled = HashMap::new();
        filled.insert("moving_avg.diff_pct.min".to_string(), Value::from(5.0));
        apply_filled_slots(&mut params, filled);
        assert_eq!(params.conditions.moving_avg.unwrap().diff_pct.min, Some(5.0));
    }
}
