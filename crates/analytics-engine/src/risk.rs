use agent_core::{Market, RankOrder};
use chrono::NaiveDate;

use crate::indicators::{sma, simple_returns, stddev};
use crate::slab::Slab;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized standard deviation of daily simple returns over the last
/// `lookback` trading days.
pub fn volatility(slab: &Slab, ticker: &str, date: NaiveDate, lookback: usize) -> Option<f64> {
    let history = slab.window_including(ticker, date, lookback + 1);
    if history.len() < 2 {
        return None;
    }
    let closes: Vec<f64> = history.iter().map(|b| b.adj_close).collect();
    let returns = simple_returns(&closes);
    stddev(&returns).map(|sigma| sigma * TRADING_DAYS_PER_YEAR.sqrt())
}

fn index_ticker_for(market_hint: Option<Market>, ticker: &str) -> String {
    let market = market_hint.or_else(|| Market::from_ticker_suffix(ticker)).unwrap_or(Market::Kospi);
    market.index_ticker().to_string()
}

/// `cov(r_ticker, r_index) / var(r_index)` over the last `lookback`
/// returns. Index choice follows `market_hint`, then the ticker's own
/// market suffix, then falls back to KOSPI.
pub fn beta(slab: &Slab, ticker: &str, date: NaiveDate, market_hint: Option<Market>, lookback: usize) -> Option<f64> {
    let index_ticker = index_ticker_for(market_hint, ticker);
    let ticker_history = slab.window_including(ticker, date, lookback + 1);
    let index_history = slab.window_including(&index_ticker, date, lookback + 1);
    if ticker_history.len() < 2 || index_history.len() < 2 {
        return None;
    }
    let n = ticker_history.len().min(index_history.len());
    let ticker_closes: Vec<f64> = ticker_history[ticker_history.len() - n..].iter().map(|b| b.adj_close).collect();
    let index_closes: Vec<f64> = index_history[index_history.len() - n..].iter().map(|b| b.adj_close).collect();

    let r_ticker = simple_returns(&ticker_closes);
    let r_index = simple_returns(&index_closes);
    if r_ticker.len() != r_index.len() || r_ticker.is_empty() {
        return None;
    }

    let mean_ticker = sma(&r_ticker)?;
    let mean_index = sma(&r_index)?;
    let covariance = r_ticker
        .iter()
        .zip(&r_index)
        .map(|(t, i)| (t - mean_ticker) * (i - mean_index))
        .sum::<f64>()
        / r_ticker.len() as f64;
    let variance = r_index.iter().map(|i| (i - mean_index).powi(2)).sum::<f64>() / r_index.len() as f64;
    if variance == 0.0 {
        return None;
    }
    Some(covariance / variance)
}

pub fn sort_by_order(mut ranked: Vec<(String, f64)>, order: RankOrder, n: usize) -> Vec<(String, f64)> {
    ranked.sort_by(|a, b| match order {
        RankOrder::High => b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal),
        RankOrder::Low => a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal),
    });
    ranked.truncate(n);
    ranked
}

pub fn top_volatility(slab: &Slab, tickers: &[String], date: NaiveDate, n: usize, order: RankOrder, lookback: usize) -> Vec<(String, f64)> {
    let ranked: Vec<(String, f64)> = tickers
        .iter()
        .filter_map(|ticker| volatility(slab, ticker, date, lookback).map(|v| (ticker.clone(), v)))
        .collect();
    sort_by_order(ranked, order, n)
}

pub fn top_beta(slab: &Slab, tickers: &[String], date: NaiveDate, n: usize, order: RankOrder, lookback: usize) -> Vec<(String, f64)> {
    let ranked: Vec<(String, f64)> = tickers
        .iter()
        .filter_map(|ticker| beta(slab, ticker, date, None, lookback).map(|v| (ticker.clone(), v)))
        .collect();
    sort_by_order(ranked, order, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Bar;
    use std::collections::HashMap;

    fn bar(date: &str, close: f64) -> Bar {
        Bar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: 1000.0,
        }
    }

    #[test]
    fn volatility_of_constant_series_is_zero() {
        let mut bars = HashMap::new();
        let series: Vec<Bar> = ["2025-06-09", "2025-06-10", "2025-06-11"]
            .iter()
            .map(|d| bar(d, 100.0))
            .collect();
        bars.insert("X".to_string(), series);
        let slab = Slab::new(bars);
        let date = NaiveDate::parse_from_str("2025-06-11", "%Y-%m-%d").unwrap();
        assert_eq!(volatility(&slab, "X", date, 2), Some(0.0));
    }
}
