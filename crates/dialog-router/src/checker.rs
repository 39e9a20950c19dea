use std::collections::BTreeSet;

use agent_core::{Metric, QueryParameters, Range, Task};

fn range_missing(slot: &str, range: &Range, missing: &mut BTreeSet<String>) {
    if range.is_empty() {
        missing.insert(format!("{slot}.min"));
    }
}

fn simple_lookup_missing(params: &QueryParameters) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    if params.date.is_none() {
        missing.insert("date".to_string());
    }
    if params.metrics.is_empty() {
        missing.insert("metrics".to_string());
    }
    let market_level_only = !params.metrics.is_empty() && params.metrics.iter().all(|m| m.is_market_level());
    if params.tickers.is_empty() && !market_level_only {
        missing.insert("tickers".to_string());
    }
    if params.metrics.contains(&Metric::Index) && params.market.is_none() {
        missing.insert("market".to_string());
    }
    missing
}

fn market_rank_missing(params: &QueryParameters) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    if params.date.is_none() {
        missing.insert("date".to_string());
    }
    if params.metrics.is_empty() {
        missing.insert("metrics".to_string());
    }
    if params.metrics.iter().any(|m| m.is_bidirectional()) && params.conditions.order.is_none() {
        missing.insert("order".to_string());
    }
    missing
}

fn count_missing(params: &QueryParameters) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    if params.date.is_none() {
        missing.insert("date".to_string());
    }
    missing
}

/// For `stock_search`: every present leaf contributes its own holes; an
/// entirely empty `conditions` tree is itself a hole, since a search with
/// no criteria at all is not a well-formed request for this task.
fn stock_search_missing(params: &QueryParameters) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    let c = &params.conditions;

    if c.is_empty() {
        missing.insert("conditions".to_string());
    }

    if let Some(range) = c.price_close {
        range_missing("price_close", &range, &mut missing);
    }
    if let Some(range) = c.volume {
        range_missing("volume", &range, &mut missing);
    }
    if let Some(range) = c.pct_change {
        range_missing("pct_change", &range, &mut missing);
    }
    if let Some(range) = c.volume_pct {
        range_missing("volume_pct", &range, &mut missing);
    }
    if let Some(range) = c.gap_pct {
        range_missing("gap_pct", &range, &mut missing);
    }
    if let Some(rsi) = c.rsi {
        if rsi.window.is_none() {
            missing.insert("RSI.window".to_string());
        }
        range_missing("RSI", &rsi.range, &mut missing);
    }
    if let Some(spike) = c.volume_spike {
        if spike.window.is_none() {
            missing.insert("volume_spike.window".to_string());
        }
        if spike.ratio_min.is_none() {
            missing.insert("volume_spike.volume_ratio.min".to_string());
        }
    }
    if let Some(ma) = c.moving_avg {
        if ma.window.is_none() {
            missing.insert("moving_avg.window".to_string());
        }
        range_missing("moving_avg.diff_pct", &ma.diff_pct, &mut missing);
    }
    if c.bollinger_touch.is_none() && params.metrics.contains(&Metric::Bollinger) {
        missing.insert("bollinger_touch".to_string());
    }
    if let Some(peak) = c.peak_break {
        if peak.period_days.is_none() {
            missing.insert("peak_break.period_days".to_string());
        }
    }
    if let Some(peak) = c.peak_low {
        if peak.period_days.is_none() {
            missing.insert("peak_low.period_days".to_string());
        }
    }
    if let Some(off) = c.off_peak {
        if off.period_days.is_none() {
            missing.insert("off_peak.period_days".to_string());
        }
        if off.min.is_none() {
            missing.insert("off_peak.min".to_string());
        }
    }

    if c.has_single_day_leaf() && params.date.is_none() {
        missing.insert("date".to_string());
    }
    if (c.pct_change_range.is_some() || c.consecutive_change.is_some()) && (params.date_from.is_none() || params.date_to.is_none()) {
        missing.insert("date_from".to_string());
        missing.insert("date_to".to_string());
    }
    if let Some(range) = c.pct_change_range {
        range_missing("pct_change_range", &range, &mut missing);
    }

    missing
}

/// For `count_search` / `date_search`: a range and a resolved ticker plus
/// a `cross` or `three_pattern` leaf. A market-pool scan (no single ticker,
/// scanning `params.market` instead) satisfies the ticker requirement too.
fn count_date_search_missing(params: &QueryParameters) -> BTreeSet<String> {
    let mut missing = BTreeSet::new();
    if params.date_from.is_none() {
        missing.insert("date_from".to_string());
    }
    if params.date_to.is_none() {
        missing.insert("date_to".to_string());
    }
    if params.tickers.is_empty() && params.market.is_none() {
        missing.insert("tickers".to_string());
    }
    if params.conditions.cross.is_none() && params.conditions.three_pattern.is_none() {
        missing.insert("conditions".to_string());
    }
    missing
}

/// Recomputes `_missing` for the task carried by `params`. Tasks without a
/// registered checker (including `unknown`) have no missing slots — the
/// router handles them as a terminal "could not understand" answer instead
/// of opening a session.
pub fn missing_slots(params: &QueryParameters) -> BTreeSet<String> {
    match params.task {
        Some(Task::SimpleLookup) => simple_lookup_missing(params),
        Some(Task::MarketRank) => market_rank_missing(params),
        Some(Task::AdvancersCount) | Some(Task::DeclinersCount) | Some(Task::TradedCount) => count_missing(params),
        Some(Task::StockSearch) => stock_search_missing(params),
        Some(Task::CountSearch) | Some(Task::DateSearch) => count_date_search_missing(params),
        _ => BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Conditions;
    use chrono::NaiveDate;

    #[test]
    fn simple_lookup_requires_date_and_metrics() {
        let params = QueryParameters {
            task: Some(Task::SimpleLookup),
            ..Default::default()
        };
        let missing = missing_slots(&params);
        assert!(missing.contains("date"));
        assert!(missing.contains("metrics"));
    }

    #[test]
    fn simple_lookup_allows_missing_tickers_for_index_and_turnover() {
        let params = QueryParameters {
            task: Some(Task::SimpleLookup),
            date: Some(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()),
            metrics: vec![Metric::Turnover],
            market: Some(agent_core::Market::Kospi),
            ..Default::default()
        };
        let missing = missing_slots(&params);
        assert!(!missing.contains("tickers"));
    }

    #[test]
    fn stock_search_surfaces_dotted_hole_for_under_specified_leaf() {
        let params = QueryParameters {
            task: Some(Task::StockSearch),
            date: Some(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()),
            conditions: Conditions {
                moving_avg: Some(agent_core::MovingAvgCondition {
                    window: Some(20),
                    diff_pct: Range::default(),
                }),
                ..Default::default()
            },
            ..Default::default()
        };
        let missing = missing_slots(&params);
        assert!(missing.contains("moving_avg.diff_pct.min"));
    }

    #[test]
    fn idempotent_when_no_new_information_is_merged() {
        let params = QueryParameters {
            task: Some(Task::SimpleLookup),
            ..Default::default()
        };
        let first = missing_slots(&params);
        let second = missing_slots(&params);
        assert_eq!(first, second);
    }
}
