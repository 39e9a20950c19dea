use agent_core::{CalendarProvider, Metric, OhlcvProvider, QueryParameters, RankOrder};
use analytics_engine::{aggregates, risk, Slab};

use crate::error::{RouterError, RouterResult};
use crate::messages;

const DEFAULT_N: u32 = 10;
const MOVER_LOOKBACK: u32 = 7;
const RISK_LOOKBACK: usize = 60;

pub async fn handle(
    params: &QueryParameters,
    calendar: &dyn CalendarProvider,
    ohlcv: &dyn OhlcvProvider,
    catalog: &universe::UniverseCatalog,
) -> RouterResult<String> {
    let date = params
        .date
        .ok_or_else(|| RouterError::Internal("market_rank dispatched without date".into()))?;
    if !calendar.is_trading_day(date) {
        return Ok(messages::holiday_message(date));
    }

    let metric = params
        .metrics
        .first()
        .copied()
        .ok_or_else(|| RouterError::Internal("market_rank dispatched without a metric".into()))?;
    let n = params.rank_n.unwrap_or(DEFAULT_N) as usize;
    let order = params.conditions.order.unwrap_or(RankOrder::High);

    let depth = if metric.is_risk_metric() { RISK_LOOKBACK as u32 + MOVER_LOOKBACK } else { MOVER_LOOKBACK };
    let start = calendar.nth_prev_trading_day(date, depth);
    let end = calendar.next_trading_day(date);

    let tickers = catalog.tickers(params.market);
    let mut fetch_list = tickers.clone();
    if metric == Metric::Beta {
        fetch_list.push(agent_core::Market::Kospi.index_ticker().to_string());
        fetch_list.push(agent_core::Market::Kosdaq.index_ticker().to_string());
    }

    let table = ohlcv.load_many(&fetch_list, start, end).await?;
    let slab = Slab::new(table);

    let ranked = match metric {
        Metric::Volume => aggregates::top_volume(&slab, &tickers, date, n),
        Metric::Price => aggregates::top_price(&slab, &tickers, date, n),
        Metric::AscendRate => aggregates::top_mover(&slab, &tickers, date, n, aggregates::MoverDirection::Ascending),
        Metric::DescendRate => aggregates::top_mover(&slab, &tickers, date, n, aggregates::MoverDirection::Descending),
        Metric::Volatility => risk::top_volatility(&slab, &tickers, date, n, order, RISK_LOOKBACK),
        Metric::Beta => risk::top_beta(&slab, &tickers, date, n, order, RISK_LOOKBACK),
        _ => Vec::new(),
    };

    if ranked.is_empty() {
        return Ok(messages::data_unavailable_message(date));
    }

    let names: Vec<String> = ranked
        .into_iter()
        .map(|(ticker, _)| catalog.official_name(&ticker).unwrap_or(&ticker).to_string())
        .collect();

    Ok(messages::rank_list_answer(&names))
}
