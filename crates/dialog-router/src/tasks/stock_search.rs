use agent_core::{CalendarProvider, OhlcvProvider, QueryParameters};
use analytics_engine::{filters, Slab};

use crate::error::{RouterError, RouterResult};
use crate::messages;
use crate::preflight;

/// Point-in-time search starts from `universe(market)` and intersects
/// successive filters implied by `conditions`; range leaves (if also
/// present) narrow the same running subset against a separately-fetched
/// range slab.
pub async fn handle(
    params: &QueryParameters,
    calendar: &dyn CalendarProvider,
    ohlcv: &dyn OhlcvProvider,
    catalog: &universe::UniverseCatalog,
) -> RouterResult<String> {
    let conditions = &params.conditions;
    let universe_tickers = catalog.tickers(params.market);
    let mut subset: Option<Vec<String>> = None;

    if conditions.has_single_day_leaf() {
        let date = params
            .date
            .ok_or_else(|| RouterError::Internal("stock_search dispatched without date".into()))?;
        if !calendar.is_trading_day(date) {
            return Ok(messages::holiday_message(date));
        }

        let depth = preflight::conditions_depth(conditions);
        let (start, end) = preflight::point_in_time_window(calendar, date, depth);
        let table = ohlcv.load_many(&universe_tickers, start, end).await?;
        let slab = Slab::new(table);

        let mut pool = universe_tickers.clone();
        if let Some(range) = conditions.price_close {
            pool = filters::price_close(&slab, &pool, date, range);
        }
        if let Some(range) = conditions.volume {
            pool = filters::volume(&slab, &pool, date, range);
        }
        if let Some(range) = conditions.pct_change {
            pool = filters::pct_change(&slab, &pool, date, range, calendar);
        }
        if let Some(range) = conditions.volume_pct {
            pool = filters::volume_pct(&slab, &pool, date, range, calendar);
        }
        if let Some(range) = conditions.gap_pct {
            pool = filters::gap_pct(&slab, &pool, date, range, calendar);
        }
        if let Some(rsi) = conditions.rsi {
            pool = filters::rsi_filter(&slab, &pool, date, rsi.window.unwrap_or(14) as usize, rsi.range);
        }
        if let Some(spike) = conditions.volume_spike {
            pool = filters::volume_spike(&slab, &pool, date, spike.window.unwrap_or(20) as usize, spike.ratio_min.unwrap_or(0.0));
        }
        if let Some(ma) = conditions.moving_avg {
            pool = filters::moving_avg(&slab, &pool, date, ma.window.unwrap_or(20) as usize, ma.diff_pct);
        }
        if let Some(band) = conditions.bollinger_touch {
            pool = filters::bollinger_touch(&slab, &pool, date, band);
        }
        if let Some(peak) = conditions.peak_break {
            pool = filters::peak_break(&slab, &pool, date, peak.period_days.unwrap_or(260) as usize);
        }
        if let Some(peak) = conditions.peak_low {
            pool = filters::peak_low(&slab, &pool, date, peak.period_days.unwrap_or(260) as usize);
        }
        if let Some(off) = conditions.off_peak {
            pool = filters::off_peak(&slab, &pool, date, off.period_days.unwrap_or(260) as usize, off.min.unwrap_or(0.0));
        }
        subset = Some(pool);
    }

    if conditions.has_range_leaf() {
        let date_from = params
            .date_from
            .ok_or_else(|| RouterError::Internal("stock_search dispatched without date_from".into()))?;
        let date_to = params
            .date_to
            .ok_or_else(|| RouterError::Internal("stock_search dispatched without date_to".into()))?;

        let (start, end) = preflight::range_window(calendar, date_from, date_to);
        let table = ohlcv.load_many(&universe_tickers, start, end).await?;
        let slab = Slab::new(table);

        let mut pool = subset.unwrap_or_else(|| universe_tickers.clone());
        if let Some(range) = conditions.pct_change_range {
            pool = filters::pct_change_range(&slab, &pool, date_from, date_to, range);
        }
        if let Some(direction) = conditions.consecutive_change {
            pool = filters::consecutive_change(&slab, &pool, date_from, date_to, direction);
        }
        subset = Some(pool);
    }

    let tickers = subset.unwrap_or_default();
    let mut names: Vec<String> = tickers.iter().map(|t| catalog.official_name(t).unwrap_or(t).to_string()).collect();
    names.sort();

    let description = messages::conditions_description(conditions);
    Ok(messages::stock_search_answer(&description, &names))
}
