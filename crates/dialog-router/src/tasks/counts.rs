use agent_core::{CalendarProvider, OhlcvProvider, QueryParameters, Task};
use analytics_engine::{aggregates, Slab};

use crate::error::{RouterError, RouterResult};
use crate::messages;

const PRIOR_WALK_DAYS: u32 = 7;

fn market_phrase(market: Option<agent_core::Market>) -> &'static str {
    match market {
        Some(agent_core::Market::Kospi) => "KOSPI",
        Some(agent_core::Market::Kosdaq) => "KOSDAQ",
        None => "전체 시장",
    }
}

pub async fn handle(
    params: &QueryParameters,
    calendar: &dyn CalendarProvider,
    ohlcv: &dyn OhlcvProvider,
    catalog: &universe::UniverseCatalog,
) -> RouterResult<String> {
    let date = params
        .date
        .ok_or_else(|| RouterError::Internal("count task dispatched without date".into()))?;
    if !calendar.is_trading_day(date) {
        return Ok(messages::holiday_message(date));
    }

    let start = calendar.nth_prev_trading_day(date, PRIOR_WALK_DAYS);
    let end = calendar.next_trading_day(date);
    let tickers = catalog.tickers(params.market);
    let table = ohlcv.load_many(&tickers, start, end).await?;
    let slab = Slab::new(table);

    let phrase = market_phrase(params.market);
    let task = params.task.unwrap_or(Task::TradedCount);
    let (label, count) = match task {
        Task::AdvancersCount => ("상승 종목 수", aggregates::market_breadth(&slab, &tickers, date).advancers),
        Task::DeclinersCount => ("하락 종목 수", aggregates::market_breadth(&slab, &tickers, date).decliners),
        _ => ("거래된 종목 수", aggregates::traded_count(&slab, &tickers, date)),
    };

    Ok(messages::count_answer(phrase, label, count))
}
