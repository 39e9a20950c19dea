use agent_core::{CalendarProvider, Conditions};
use chrono::NaiveDate;

const SINGLE_DAY_LOOKBACK: u32 = 1;
const DEFAULT_RSI_WINDOW: u32 = 14;
const DEFAULT_VOLUME_SPIKE_WINDOW: u32 = 20;
const DEFAULT_MOVING_AVG_WINDOW: u32 = 20;
const BOLLINGER_WINDOW: u32 = 20;
const DEFAULT_PEAK_WINDOW: u32 = 260;
const RISK_LOOKBACK: u32 = 60;
const RISK_PCT_CHANGE_LOOKBACK: u32 = 7;

/// Max over every present leaf's own lookback requirement, per the
/// component design's preflight rule. An empty tree still needs one prior
/// day for the implicit pct_change/gap guard (a single calendar-previous
/// trading day, not a multi-day walk).
pub fn conditions_depth(conditions: &Conditions) -> u32 {
    let mut depth = SINGLE_DAY_LOOKBACK;
    if let Some(rsi) = &conditions.rsi {
        depth = depth.max(rsi.window.unwrap_or(DEFAULT_RSI_WINDOW));
    }
    if let Some(spike) = &conditions.volume_spike {
        depth = depth.max(spike.window.unwrap_or(DEFAULT_VOLUME_SPIKE_WINDOW));
    }
    if let Some(ma) = &conditions.moving_avg {
        depth = depth.max(ma.window.unwrap_or(DEFAULT_MOVING_AVG_WINDOW));
    }
    if conditions.bollinger_touch.is_some() {
        depth = depth.max(BOLLINGER_WINDOW);
    }
    if let Some(peak) = &conditions.peak_break {
        depth = depth.max(peak.period_days.unwrap_or(DEFAULT_PEAK_WINDOW));
    }
    if let Some(peak) = &conditions.peak_low {
        depth = depth.max(peak.period_days.unwrap_or(DEFAULT_PEAK_WINDOW));
    }
    if let Some(off) = &conditions.off_peak {
        depth = depth.max(off.period_days.unwrap_or(DEFAULT_PEAK_WINDOW));
    }
    depth
}

pub fn risk_metric_depth() -> u32 {
    RISK_LOOKBACK + RISK_PCT_CHANGE_LOOKBACK
}

/// `[nth_prev_trading_day(date, depth), next_trading_day(date)]` — the
/// window a point-in-time task fetches once before running its primitives.
pub fn point_in_time_window(calendar: &dyn CalendarProvider, date: NaiveDate, depth: u32) -> (NaiveDate, NaiveDate) {
    (calendar.nth_prev_trading_day(date, depth), calendar.next_trading_day(date))
}

/// `[date_from, next_trading_day(date_to)]` — range tasks fetch exactly
/// the slice they operate on, plus one trailing day so an inclusive
/// `date_to` bar is never clipped by an off-by-one in the provider.
pub fn range_window(calendar: &dyn CalendarProvider, date_from: NaiveDate, date_to: NaiveDate) -> (NaiveDate, NaiveDate) {
    (date_from, calendar.next_trading_day(date_to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{MovingAvgCondition, Range};

    #[test]
    fn depth_takes_the_max_of_present_leaves() {
        let conditions = Conditions {
            moving_avg: Some(MovingAvgCondition {
                window: Some(40),
                diff_pct: Range::default(),
            }),
            ..Default::default()
        };
        assert_eq!(conditions_depth(&conditions), 40);
    }

    #[test]
    fn empty_tree_still_needs_one_prior_day() {
        assert_eq!(conditions_depth(&Conditions::default()), SINGLE_DAY_LOOKBACK);
    }
}
