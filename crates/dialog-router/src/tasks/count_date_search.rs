use agent_core::{CalendarProvider, CrossSide, Market, OhlcvProvider, QueryParameters, Task};
use analytics_engine::{filters, Slab};

use crate::error::{RouterError, RouterResult};
use crate::messages;
use crate::preflight;

fn market_phrase(market: Option<Market>) -> &'static str {
    match market {
        Some(Market::Kospi) => "KOSPI",
        Some(Market::Kosdaq) => "KOSDAQ",
        None => "전체 시장",
    }
}

/// Count/date search for patterns operate on a single resolved ticker, or,
/// for the supplementary market-pool primitives, every ticker in
/// `params.market` when no ticker was resolved. Either way the result is
/// an occurrence count (`count_search`) or the list of occurrence dates /
/// occurrence tickers (`date_search`).
pub async fn handle(
    params: &QueryParameters,
    calendar: &dyn CalendarProvider,
    ohlcv: &dyn OhlcvProvider,
    catalog: &universe::UniverseCatalog,
) -> RouterResult<String> {
    let date_from = params
        .date_from
        .ok_or_else(|| RouterError::Internal("count/date search dispatched without date_from".into()))?;
    let date_to = params
        .date_to
        .ok_or_else(|| RouterError::Internal("count/date search dispatched without date_to".into()))?;

    let (start, end) = preflight::range_window(calendar, date_from, date_to);
    let is_count = matches!(params.task, Some(Task::CountSearch));

    let Some(ticker) = params.tickers.first() else {
        return handle_market_pool(params, catalog, ohlcv, date_from, date_to, start, end, is_count).await;
    };

    let table = ohlcv.load_many(std::slice::from_ref(ticker), start, end).await?;
    let slab = Slab::new(table);

    if let Some(side) = params.conditions.cross {
        return if is_count {
            let (golden, dead) = filters::count_crosses(&slab, ticker, date_from, date_to);
            Ok(match side {
                CrossSide::Dead => messages::dead_cross_count_answer(dead),
                CrossSide::Golden => messages::cross_count_answer(golden),
                CrossSide::Both => messages::cross_count_answer(golden + dead),
            })
        } else {
            let dates = filters::cross_dates(&slab, ticker, date_from, date_to, side);
            Ok(messages::date_list_answer(&dates))
        };
    }

    if let Some(pattern) = params.conditions.three_pattern {
        return if is_count {
            let count = filters::three_pattern_counts(&slab, ticker, date_from, date_to, pattern);
            Ok(messages::three_pattern_count_answer(count))
        } else {
            let dates = filters::three_pattern_dates(&slab, ticker, date_from, date_to, pattern);
            Ok(messages::date_list_answer(&dates))
        };
    }

    Ok(messages::could_not_understand_message())
}

/// Scans every ticker in `params.market` rather than a single resolved
/// ticker, via `list_crossed_stocks`/`three_pattern_tickers`.
async fn handle_market_pool(
    params: &QueryParameters,
    catalog: &universe::UniverseCatalog,
    ohlcv: &dyn OhlcvProvider,
    date_from: chrono::NaiveDate,
    date_to: chrono::NaiveDate,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    is_count: bool,
) -> RouterResult<String> {
    let pool = catalog.tickers(params.market);
    let table = ohlcv.load_many(&pool, start, end).await?;
    let slab = Slab::new(table);

    let resolve_names = |matched: Vec<String>| -> Vec<String> {
        let mut names: Vec<String> = matched.iter().map(|t| catalog.official_name(t).unwrap_or(t).to_string()).collect();
        names.sort();
        names
    };

    if let Some(side) = params.conditions.cross {
        let matched = filters::list_crossed_stocks(&slab, &pool, date_from, date_to, side);
        let names = resolve_names(matched);
        return Ok(if is_count {
            messages::count_answer(market_phrase(params.market), "크로스가 발생한 종목 수", names.len())
        } else {
            messages::crossed_stocks_answer(&names)
        });
    }

    if let Some(pattern) = params.conditions.three_pattern {
        let matched = filters::three_pattern_tickers(&slab, &pool, date_from, date_to, pattern);
        let names = resolve_names(matched);
        return Ok(if is_count {
            messages::count_answer(market_phrase(params.market), "패턴이 발생한 종목 수", names.len())
        } else {
            messages::pattern_stocks_answer(&names)
        });
    }

    Ok(messages::could_not_understand_message())
}
