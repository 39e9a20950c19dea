use agent_core::{CalendarProvider, Market, Metric, OhlcvProvider, QueryParameters};
use analytics_engine::{risk, Slab};
use chrono::NaiveDate;
use universe::UniverseCatalog;

use crate::error::{RouterError, RouterResult};
use crate::messages;

const PCT_CHANGE_LOOKBACK: u32 = 7;
const RISK_LOOKBACK: u32 = 60;

fn lookback_for(metrics: &[Metric]) -> u32 {
    if metrics.iter().any(|m| m.is_risk_metric()) {
        RISK_LOOKBACK + PCT_CHANGE_LOOKBACK
    } else if metrics.contains(&Metric::PctChange) {
        PCT_CHANGE_LOOKBACK
    } else {
        1
    }
}

fn ticker_value(slab: &Slab, ticker: &str, metric: Metric, date: NaiveDate) -> Option<f64> {
    match metric {
        Metric::Close | Metric::Price | Metric::Index => slab.bar_on(ticker, date).map(|b| b.close),
        Metric::Open => slab.bar_on(ticker, date).map(|b| b.open),
        Metric::High => slab.bar_on(ticker, date).map(|b| b.high),
        Metric::Low => slab.bar_on(ticker, date).map(|b| b.low),
        Metric::Volume => slab.bar_on(ticker, date).map(|b| b.volume),
        Metric::Turnover => slab.bar_on(ticker, date).map(|b| b.close * b.volume),
        Metric::PctChange => {
            let today = slab.bar_on(ticker, date)?.close;
            let (_, prior) = slab.prior_close_walk(ticker, date, PCT_CHANGE_LOOKBACK as usize)?;
            if prior == 0.0 {
                None
            } else {
                Some((today - prior) / prior * 100.0)
            }
        }
        Metric::Volatility => risk::volatility(slab, ticker, date, RISK_LOOKBACK as usize),
        Metric::Beta => risk::beta(slab, ticker, date, None, RISK_LOOKBACK as usize),
        _ => None,
    }
}

fn resolve_tickers(params: &QueryParameters, catalog: &UniverseCatalog) -> Vec<String> {
    let market_level_only = !params.metrics.is_empty() && params.metrics.iter().all(|m| m.is_market_level());
    if market_level_only {
        if params.metrics.contains(&Metric::Index) {
            let market = params.market.unwrap_or(Market::Kospi);
            vec![market.index_ticker().to_string()]
        } else {
            catalog.tickers(params.market)
        }
    } else {
        params.tickers.clone()
    }
}

/// Single-ticker single-metric reports the value directly; a risk metric,
/// or more than one ticker/metric, routes to the vectorized multi-lookup
/// that reports one sentence per (ticker, metric) pair.
pub async fn handle(
    params: &QueryParameters,
    calendar: &dyn CalendarProvider,
    ohlcv: &dyn OhlcvProvider,
    catalog: &UniverseCatalog,
) -> RouterResult<String> {
    let date = params
        .date
        .ok_or_else(|| RouterError::Internal("simple_lookup dispatched without date".into()))?;
    if !calendar.is_trading_day(date) {
        return Ok(messages::holiday_message(date));
    }

    let depth = lookback_for(&params.metrics);
    let start = calendar.nth_prev_trading_day(date, depth);
    let end = calendar.next_trading_day(date);

    let tickers = resolve_tickers(params, catalog);
    let mut fetch_list = tickers.clone();
    if params.metrics.iter().any(|m| m.is_risk_metric()) {
        fetch_list.push(Market::Kospi.index_ticker().to_string());
        fetch_list.push(Market::Kosdaq.index_ticker().to_string());
    }

    let table = ohlcv.load_many(&fetch_list, start, end).await?;
    let slab = Slab::new(table);

    let metrics = if params.metrics.is_empty() {
        vec![Metric::Close]
    } else {
        params.metrics.clone()
    };

    let single = metrics.len() == 1 && tickers.len() == 1 && !metrics[0].is_risk_metric();
    if single {
        let ticker = &tickers[0];
        let metric = metrics[0];
        let name = catalog.official_name(ticker).unwrap_or(ticker).to_string();
        return match ticker_value(&slab, ticker, metric, date) {
            Some(value) => Ok(messages::simple_lookup_answer(date, &name, metric, value)),
            None => Ok(messages::data_unavailable_message(date)),
        };
    }

    let mut sentences = Vec::new();
    for ticker in &tickers {
        let name = catalog.official_name(ticker).unwrap_or(ticker).to_string();
        for metric in &metrics {
            if let Some(value) = ticker_value(&slab, ticker, *metric, date) {
                sentences.push(messages::simple_lookup_answer(date, &name, *metric, value));
            }
        }
    }

    if sentences.is_empty() {
        Ok(messages::data_unavailable_message(date))
    } else {
        Ok(sentences.join(" "))
    }
}
