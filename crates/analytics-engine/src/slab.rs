use std::collections::HashMap;

use agent_core::Bar;
use chrono::NaiveDate;

/// A date-indexed OHLCV table across a set of tickers, covering exactly the
/// window a task handler's preflight computed. Every primitive in this
/// crate is a pure function of a `Slab`.
#[derive(Debug, Clone, Default)]
pub struct Slab {
    bars: HashMap<String, Vec<Bar>>,
}

impl Slab {
    pub fn new(mut bars: HashMap<String, Vec<Bar>>) -> Self {
        for series in bars.values_mut() {
            series.sort_by_key(|bar| bar.date);
        }
        Self { bars }
    }

    pub fn tickers(&self) -> impl Iterator<Item = &String> {
        self.bars.keys()
    }

    pub fn series(&self, ticker: &str) -> &[Bar] {
        self.bars.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bar_on(&self, ticker: &str, date: NaiveDate) -> Option<&Bar> {
        self.series(ticker).iter().find(|bar| bar.date == date)
    }

    fn position_on(&self, ticker: &str, date: NaiveDate) -> Option<usize> {
        self.series(ticker).iter().position(|bar| bar.date == date)
    }

    /// The `n` bars strictly preceding `date` (not including `date` itself),
    /// in ascending date order. Fewer than `n` if history is short.
    pub fn window_before(&self, ticker: &str, date: NaiveDate, n: usize) -> &[Bar] {
        let series = self.series(ticker);
        match self.position_on(ticker, date) {
            Some(idx) => {
                let start = idx.saturating_sub(n);
                &series[start..idx]
            }
            None => &[],
        }
    }

    /// The `n` most recent bars up to and including `date`.
    pub fn window_including(&self, ticker: &str, date: NaiveDate, n: usize) -> &[Bar] {
        let series = self.series(ticker);
        match self.position_on(ticker, date) {
            Some(idx) => {
                let start = (idx + 1).saturating_sub(n);
                &series[start..=idx]
            }
            None => &[],
        }
    }

    /// Inclusive slice of bars with `date_from <= date <= date_to`.
    pub fn range(&self, ticker: &str, date_from: NaiveDate, date_to: NaiveDate) -> &[Bar] {
        let series = self.series(ticker);
        let start = series.partition_point(|bar| bar.date < date_from);
        let end = series.partition_point(|bar| bar.date <= date_to);
        if start >= end {
            &[]
        } else {
            &series[start..end]
        }
    }

    /// Last known prior close/volume before `date`, walking back up to
    /// `max_days` trading days to skip suspended (NaN or zero-volume) rows.
    pub fn prior_close_walk(&self, ticker: &str, date: NaiveDate, max_days: usize) -> Option<(NaiveDate, f64)> {
        let idx = self.position_on(ticker, date)?;
        let series = self.series(ticker);
        let start = idx.saturating_sub(max_days);
        for bar in series[start..idx].iter().rev() {
            if bar.close.is_finite() && bar.close != 0.0 && bar.volume.is_finite() && bar.volume > 0.0 {
                return Some((bar.date, bar.close));
            }
        }
        None
    }

    pub fn prior_volume_walk(&self, ticker: &str, date: NaiveDate, max_days: usize) -> Option<(NaiveDate, f64)> {
        let idx = self.position_on(ticker, date)?;
        let series = self.series(ticker);
        let start = idx.saturating_sub(max_days);
        for bar in series[start..idx].iter().rev() {
            if bar.volume.is_finite() && bar.volume > 0.0 && bar.close.is_finite() && bar.close != 0.0 {
                return Some((bar.date, bar.volume));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn prior_close_walk_skips_suspended_days() {
        let mut bars = HashMap::new();
        bars.insert(
            "005930.KS".to_string(),
            vec![
                bar("2025-06-09", 100.0, 1000.0),
                bar("2025-06-10", f64::NAN, 0.0),
                bar("2025-06-11", 110.0, 1200.0),
            ],
        );
        let slab = Slab::new(bars);
        let date = NaiveDate::parse_from_str("2025-06-11", "%Y-%m-%d").unwrap();
        let (prior_date, prior_close) = slab.prior_close_walk("005930.KS", date, 7).unwrap();
        assert_eq!(prior_date.to_string(), "2025-06-09");
        assert_eq!(prior_close, 100.0);
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let mut bars = HashMap::new();
        bars.insert(
            "005930.KS".to_string(),
            vec![
                bar("2025-06-09", 100.0, 1000.0),
                bar("2025-06-10", 105.0, 1000.0),
                bar("2025-06-11", 110.0, 1000.0),
            ],
        );
        let slab = Slab::new(bars);
        let from = NaiveDate::parse_from_str("2025-06-09", "%Y-%m-%d").unwrap();
        let to = NaiveDate::parse_from_str("2025-06-10", "%Y-%m-%d").unwrap();
        assert_eq!(slab.range("005930.KS", from, to).len(), 2);
    }
}
