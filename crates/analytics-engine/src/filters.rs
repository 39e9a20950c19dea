use agent_core::{BollingerBand, CalendarProvider, ConsecutiveDirection, CrossSide, Range, ThreePattern};
use chrono::NaiveDate;

use crate::indicators::{bollinger_bands, rsi, sma};
use crate::slab::Slab;

fn same_day_trade(slab: &Slab, ticker: &str, date: NaiveDate) -> Option<(f64, f64)> {
    let bar = slab.bar_on(ticker, date)?;
    if bar.close.is_finite() && bar.volume.is_finite() && bar.volume > 0.0 {
        Some((bar.close, bar.volume))
    } else {
        None
    }
}

pub fn price_close(slab: &Slab, tickers: &[String], date: NaiveDate, range: Range) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            same_day_trade(slab, ticker, date)
                .map(|(close, _)| range.contains(close))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

pub fn volume(slab: &Slab, tickers: &[String], date: NaiveDate, range: Range) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            same_day_trade(slab, ticker, date)
                .map(|(_, volume)| range.contains(volume))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

pub fn pct_change(slab: &Slab, tickers: &[String], date: NaiveDate, range: Range, calendar: &dyn CalendarProvider) -> Vec<String> {
    let prior_date = calendar.prev_trading_day(date);
    tickers
        .iter()
        .filter(|ticker| {
            let Some((today_close, _)) = same_day_trade(slab, ticker, date) else {
                return false;
            };
            let Some(prior) = slab.bar_on(ticker, prior_date) else {
                return false;
            };
            if !prior.close.is_finite() || prior.close == 0.0 {
                return false;
            }
            let delta = (today_close - prior.close) / prior.close * 100.0;
            range.contains(delta)
        })
        .cloned()
        .collect()
}

pub fn volume_pct(slab: &Slab, tickers: &[String], date: NaiveDate, range: Range, calendar: &dyn CalendarProvider) -> Vec<String> {
    let prior_date = calendar.prev_trading_day(date);
    tickers
        .iter()
        .filter(|ticker| {
            let Some((_, today_volume)) = same_day_trade(slab, ticker, date) else {
                return false;
            };
            let Some(prior) = slab.bar_on(ticker, prior_date) else {
                return false;
            };
            if !prior.volume.is_finite() || prior.volume == 0.0 {
                return false;
            }
            let delta = (today_volume - prior.volume) / prior.volume * 100.0;
            range.contains(delta)
        })
        .cloned()
        .collect()
}

pub fn gap_pct(slab: &Slab, tickers: &[String], date: NaiveDate, range: Range, calendar: &dyn CalendarProvider) -> Vec<String> {
    let prior_date = calendar.prev_trading_day(date);
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            if !bar.open.is_finite() || !bar.volume.is_finite() || bar.volume <= 0.0 {
                return false;
            }
            let Some(prior) = slab.bar_on(ticker, prior_date) else {
                return false;
            };
            if !prior.close.is_finite() || prior.close == 0.0 {
                return false;
            }
            let delta = (bar.open - prior.close) / prior.close * 100.0;
            range.contains(delta)
        })
        .cloned()
        .collect()
}

pub fn rsi_filter(slab: &Slab, tickers: &[String], date: NaiveDate, window: usize, range: Range) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            if !bar.volume.is_finite() || bar.volume <= 0.0 {
                return false;
            }
            let history = slab.window_including(ticker, date, window + 1);
            if history.len() < window + 1 {
                return false;
            }
            let closes: Vec<f64> = history.iter().map(|b| b.adj_close).collect();
            rsi(&closes, window).map(|v| range.contains(v)).unwrap_or(false)
        })
        .cloned()
        .collect()
}

pub fn volume_spike(slab: &Slab, tickers: &[String], date: NaiveDate, window: usize, min_ratio: f64) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            if !bar.volume.is_finite() || bar.volume <= 0.0 {
                return false;
            }
            let prior = slab.window_before(ticker, date, window);
            if prior.len() < window {
                return false;
            }
            let avg = sma(&prior.iter().map(|b| b.volume).collect::<Vec<_>>()).unwrap_or(0.0);
            if avg <= 0.0 {
                return false;
            }
            let ratio = (bar.volume / avg - 1.0) * 100.0;
            ratio >= min_ratio
        })
        .cloned()
        .collect()
}

pub fn moving_avg(slab: &Slab, tickers: &[String], date: NaiveDate, window: usize, diff_pct: Range) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            let history = slab.window_including(ticker, date, window);
            if history.len() < window {
                return false;
            }
            let ma = sma(&history.iter().map(|b| b.adj_close).collect::<Vec<_>>()).unwrap_or(0.0);
            if ma == 0.0 {
                return false;
            }
            let diff = (bar.adj_close - ma) / ma * 100.0;
            diff_pct.contains(diff)
        })
        .cloned()
        .collect()
}

pub fn bollinger_touch(slab: &Slab, tickers: &[String], date: NaiveDate, band: BollingerBand) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            let history = slab.window_including(ticker, date, 20);
            if history.len() < 20 {
                return false;
            }
            let closes: Vec<f64> = history.iter().map(|b| b.adj_close).collect();
            let Some(bands) = bollinger_bands(&closes, 20, 2.0) else {
                return false;
            };
            match band {
                BollingerBand::Upper => bar.adj_close >= bands.upper,
                BollingerBand::Lower => bar.adj_close <= bands.lower,
            }
        })
        .cloned()
        .collect()
}

pub fn peak_break(slab: &Slab, tickers: &[String], date: NaiveDate, period_days: usize) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            let history = slab.window_including(ticker, date, period_days);
            if history.is_empty() {
                return false;
            }
            let peak = history.iter().fold(f64::MIN, |acc, b| acc.max(b.close));
            bar.close >= peak
        })
        .cloned()
        .collect()
}

pub fn peak_low(slab: &Slab, tickers: &[String], date: NaiveDate, period_days: usize) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            let history = slab.window_including(ticker, date, period_days);
            if history.is_empty() {
                return false;
            }
            let trough = history.iter().fold(f64::MAX, |acc, b| acc.min(b.close));
            bar.close <= trough
        })
        .cloned()
        .collect()
}

pub fn off_peak(slab: &Slab, tickers: &[String], date: NaiveDate, period_days: usize, drop_min: f64) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let Some(bar) = slab.bar_on(ticker, date) else {
                return false;
            };
            let history = slab.window_including(ticker, date, period_days);
            if history.is_empty() {
                return false;
            }
            let peak = history.iter().fold(f64::MIN, |acc, b| acc.max(b.close));
            if peak <= 0.0 {
                return false;
            }
            let drop = (peak - bar.close) / peak * 100.0;
            drop >= drop_min
        })
        .cloned()
        .collect()
}

pub fn pct_change_range(slab: &Slab, tickers: &[String], date_from: NaiveDate, date_to: NaiveDate, range: Range) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let start = slab.bar_on(ticker, date_from);
            let end = slab.bar_on(ticker, date_to);
            let (Some(start), Some(end)) = (start, end) else {
                return false;
            };
            if !start.close.is_finite() || start.close == 0.0 || !end.close.is_finite() {
                return false;
            }
            let delta = (end.close - start.close) / start.close * 100.0;
            range.contains(delta)
        })
        .cloned()
        .collect()
}

/// Strict monotone close differences across the entire slice (every
/// day-over-day step shares the requested sign), not merely "some day".
pub fn consecutive_change(
    slab: &Slab,
    tickers: &[String],
    date_from: NaiveDate,
    date_to: NaiveDate,
    direction: ConsecutiveDirection,
) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let series = slab.range(ticker, date_from, date_to);
            if series.len() < 2 {
                return false;
            }
            series.windows(2).all(|pair| match direction {
                ConsecutiveDirection::Up => pair[1].close > pair[0].close,
                ConsecutiveDirection::Down => pair[1].close < pair[0].close,
            })
        })
        .cloned()
        .collect()
}

fn ma_series(series: &[agent_core::Bar], window: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                sma(&series[i + 1 - window..=i].iter().map(|b| b.adj_close).collect::<Vec<_>>())
            }
        })
        .collect()
}

fn crossings(series: &[agent_core::Bar]) -> Vec<(chrono::NaiveDate, bool)> {
    let ma5 = ma_series(series, 5);
    let ma20 = ma_series(series, 20);
    let mut prev_sign: Option<f64> = None;
    let mut result = Vec::new();
    for (i, bar) in series.iter().enumerate() {
        let (Some(m5), Some(m20)) = (ma5[i], ma20[i]) else {
            continue;
        };
        let diff = m5 - m20;
        let sign = diff.signum();
        if let Some(prev) = prev_sign {
            if prev < 0.0 && sign > 0.0 {
                result.push((bar.date, true));
            } else if prev > 0.0 && sign < 0.0 {
                result.push((bar.date, false));
            }
        }
        if sign != 0.0 {
            prev_sign = Some(sign);
        }
    }
    result
}

pub fn cross(slab: &Slab, tickers: &[String], date_from: NaiveDate, date_to: NaiveDate, side: CrossSide) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let series = slab.series(ticker);
            let start = series.partition_point(|b| b.date < date_from);
            let end = series.partition_point(|b| b.date <= date_to);
            if start >= end {
                return false;
            }
            crossings(series)
                .into_iter()
                .filter(|(date, _)| *date >= date_from && *date <= date_to)
                .any(|(_, golden)| match side {
                    CrossSide::Golden => golden,
                    CrossSide::Dead => !golden,
                    CrossSide::Both => true,
                })
        })
        .cloned()
        .collect()
}

/// Every date in the range at which MA5 crosses MA20 in the requested
/// direction (`CrossSide::Both` matches either).
pub fn cross_dates(slab: &Slab, ticker: &str, date_from: NaiveDate, date_to: NaiveDate, side: CrossSide) -> Vec<NaiveDate> {
    crossings(slab.series(ticker))
        .into_iter()
        .filter(|(date, _)| *date >= date_from && *date <= date_to)
        .filter(|(_, golden)| match side {
            CrossSide::Golden => *golden,
            CrossSide::Dead => !*golden,
            CrossSide::Both => true,
        })
        .map(|(date, _)| date)
        .collect()
}

/// Counts golden/dead crossings of MA5 over MA20 across the range.
pub fn count_crosses(slab: &Slab, ticker: &str, date_from: NaiveDate, date_to: NaiveDate) -> (usize, usize) {
    let series = slab.series(ticker);
    let crossings: Vec<_> = crossings(series)
        .into_iter()
        .filter(|(date, _)| *date >= date_from && *date <= date_to)
        .collect();
    let golden = crossings.iter().filter(|(_, g)| *g).count();
    let dead = crossings.len() - golden;
    (golden, dead)
}

pub fn list_crossed_stocks(
    slab: &Slab,
    tickers: &[String],
    date_from: NaiveDate,
    date_to: NaiveDate,
    side: CrossSide,
) -> Vec<String> {
    cross(slab, tickers, date_from, date_to, side)
}

fn is_white(window: &[agent_core::Bar]) -> bool {
    window.iter().all(|b| b.adj_close > b.open) && window.windows(2).all(|p| p[1].adj_close > p[0].adj_close)
}

fn is_black(window: &[agent_core::Bar]) -> bool {
    window.iter().all(|b| b.adj_close < b.open) && window.windows(2).all(|p| p[1].adj_close < p[0].adj_close)
}

fn three_pattern_match(series: &[agent_core::Bar], pattern: ThreePattern) -> Vec<chrono::NaiveDate> {
    let mut dates = Vec::new();
    for window in series.windows(3) {
        let matched = match pattern {
            ThreePattern::White => is_white(window),
            ThreePattern::Black => is_black(window),
        };
        if matched {
            dates.push(window[2].date);
        }
    }
    dates
}

pub fn three_pattern(slab: &Slab, tickers: &[String], date_from: NaiveDate, date_to: NaiveDate, pattern: ThreePattern) -> Vec<String> {
    tickers
        .iter()
        .filter(|ticker| {
            let series = slab.range(ticker, date_from, date_to);
            !three_pattern_match(series, pattern).is_empty()
        })
        .cloned()
        .collect()
}

pub fn three_pattern_dates(slab: &Slab, ticker: &str, date_from: NaiveDate, date_to: NaiveDate, pattern: ThreePattern) -> Vec<chrono::NaiveDate> {
    let series = slab.range(ticker, date_from, date_to);
    three_pattern_match(series, pattern)
}

pub fn three_pattern_counts(slab: &Slab, ticker: &str, date_from: NaiveDate, date_to: NaiveDate, pattern: ThreePattern) -> usize {
    three_pattern_dates(slab, ticker, date_from, date_to, pattern).len()
}

pub fn three_pattern_tickers(slab: &Slab, tickers: &[String], date_from: NaiveDate, date_to: NaiveDate, pattern: ThreePattern) -> Vec<String> {
    three_pattern(slab, tickers, date_from, date_to, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Bar;
    use std::collections::HashMap;

    fn bar(date: &str, open: f64, close: f64, volume: f64) -> Bar {
        Bar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open,
            high: close.max(open),
            low: close.min(open),
            close,
            adj_close: close,
            volume,
        }
    }

    #[test]
    fn consecutive_change_requires_every_step_to_match() {
        let mut bars = HashMap::new();
        bars.insert(
            "X".to_string(),
            vec![
                bar("2025-06-09", 100.0, 100.0, 10.0),
                bar("2025-06-10", 100.0, 105.0, 10.0),
                bar("2025-06-11", 105.0, 103.0, 10.0),
            ],
        );
        let slab = Slab::new(bars);
        let from = NaiveDate::parse_from_str("2025-06-09", "%Y-%m-%d").unwrap();
        let to = NaiveDate::parse_from_str("2025-06-11", "%Y-%m-%d").unwrap();
        let result = consecutive_change(&slab, &["X".to_string()], from, to, ConsecutiveDirection::Up);
        assert!(result.is_empty(), "one down-day should break an up run");
    }

    #[test]
    fn three_white_soldiers_requires_strictly_rising_closes() {
        let mut bars = HashMap::new();
        bars.insert(
            "X".to_string(),
            vec![
                bar("2025-06-09", 100.0, 102.0, 10.0),
                bar("2025-06-10", 102.0, 105.0, 10.0),
                bar("2025-06-11", 105.0, 109.0, 10.0),
            ],
        );
        let slab = Slab::new(bars);
        let from = NaiveDate::parse_from_str("2025-06-09", "%Y-%m-%d").unwrap();
        let to = NaiveDate::parse_from_str("2025-06-11", "%Y-%m-%d").unwrap();
        let dates = three_pattern_dates(&slab, "X", from, to, ThreePattern::White);
        assert_eq!(dates.len(), 1);
    }
}
