use chrono::NaiveDate;

use crate::slab::Slab;

const PRIOR_WALK_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketBreadth {
    pub advancers: usize,
    pub decliners: usize,
    pub unchanged: usize,
}

/// For every ticker with a finite same-day close and positive volume,
/// compares against the last-known prior close (walking up to 7 trading
/// days back); buckets into advancers / decliners / unchanged.
pub fn market_breadth(slab: &Slab, tickers: &[String], date: NaiveDate) -> MarketBreadth {
    let mut breadth = MarketBreadth::default();
    for ticker in tickers {
        let Some(bar) = slab.bar_on(ticker, date) else {
            continue;
        };
        if !bar.close.is_finite() || !bar.volume.is_finite() || bar.volume <= 0.0 {
            continue;
        }
        let Some((_, prior_close)) = slab.prior_close_walk(ticker, date, PRIOR_WALK_DAYS) else {
            continue;
        };
        if bar.close > prior_close {
            breadth.advancers += 1;
        } else if bar.close < prior_close {
            breadth.decliners += 1;
        } else {
            breadth.unchanged += 1;
        }
    }
    breadth
}

pub fn traded_count(slab: &Slab, tickers: &[String], date: NaiveDate) -> usize {
    tickers
        .iter()
        .filter(|ticker| {
            slab.bar_on(ticker, date)
                .map(|bar| bar.volume.is_finite() && bar.volume > 0.0)
                .unwrap_or(false)
        })
        .count()
}

pub fn top_volume(slab: &Slab, tickers: &[String], date: NaiveDate, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = tickers
        .iter()
        .filter_map(|ticker| {
            let bar = slab.bar_on(ticker, date)?;
            if bar.volume.is_finite() && bar.volume > 0.0 {
                Some((ticker.clone(), bar.volume))
            } else {
                None
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(n);
    ranked
}

pub fn top_price(slab: &Slab, tickers: &[String], date: NaiveDate, n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = tickers
        .iter()
        .filter_map(|ticker| {
            let bar = slab.bar_on(ticker, date)?;
            if bar.close.is_finite() && bar.volume.is_finite() && bar.volume > 0.0 {
                Some((ticker.clone(), bar.close))
            } else {
                None
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverDirection {
    Ascending,
    Descending,
}

/// `(close_t - close_prev) / close_prev * 100`, ranked ascending for
/// decliners and descending for advancers.
pub fn top_mover(slab: &Slab, tickers: &[String], date: NaiveDate, n: usize, direction: MoverDirection) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = tickers
        .iter()
        .filter_map(|ticker| {
            let bar = slab.bar_on(ticker, date)?;
            if !bar.close.is_finite() || !bar.volume.is_finite() || bar.volume <= 0.0 {
                return None;
            }
            let (_, prior_close) = slab.prior_close_walk(ticker, date, PRIOR_WALK_DAYS)?;
            if prior_close == 0.0 {
                return None;
            }
            Some((ticker.clone(), (bar.close - prior_close) / prior_close * 100.0))
        })
        .collect();
    ranked.sort_by(|a, b| match direction {
        MoverDirection::Ascending => b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal),
        MoverDirection::Descending => a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal),
    });
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Bar;
    use std::collections::HashMap;

    fn bar(date: &str, close: f64, volume: f64) -> Bar {
        Bar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume,
        }
    }

    #[test]
    fn breadth_buckets_sum_to_traded_count() {
        let mut bars = HashMap::new();
        bars.insert(
            "A".to_string(),
            vec![bar("2025-06-10", 100.0, 10.0), bar("2025-06-11", 110.0, 10.0)],
        );
        bars.insert(
            "B".to_string(),
            vec![bar("2025-06-10", 100.0, 10.0), bar("2025-06-11", 90.0, 10.0)],
        );
        let slab = Slab::new(bars);
        let date = NaiveDate::parse_from_str("2025-06-11", "%Y-%m-%d").unwrap();
        let tickers = vec!["A".to_string(), "B".to_string()];
        let breadth = market_breadth(&slab, &tickers, date);
        assert_eq!(breadth.advancers + breadth.decliners + breadth.unchanged, traded_count(&slab, &tickers, date));
    }
}
