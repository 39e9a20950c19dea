use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreResult;
use crate::types::{Bar, Session};

/// Trading-day arithmetic. Implemented externally (out of scope per the
/// specification); the core only depends on this interface.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn is_trading_day(&self, date: NaiveDate) -> bool;
    fn prev_trading_day(&self, date: NaiveDate) -> NaiveDate;
    fn next_trading_day(&self, date: NaiveDate) -> NaiveDate;
    fn nth_prev_trading_day(&self, date: NaiveDate, n: u32) -> NaiveDate;

    /// Most recent trading day at or before `today` — today itself if it is
    /// a trading day, otherwise the previous one. Used by the relative-date
    /// auto-fill rule.
    fn most_recent_trading_day(&self, today: NaiveDate) -> NaiveDate {
        if self.is_trading_day(today) {
            today
        } else {
            self.prev_trading_day(today)
        }
    }
}

/// Batched daily-bar retrieval. The core treats this as a pure read of a
/// date-indexed OHLCV slab; caching is the provider's responsibility.
#[async_trait]
pub trait OhlcvProvider: Send + Sync {
    async fn load(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<Bar>>;

    async fn load_many(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<std::collections::HashMap<String, Vec<Bar>>> {
        let mut out = std::collections::HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            let bars = self.load(ticker, start, end).await?;
            out.insert(ticker.clone(), bars);
        }
        Ok(out)
    }
}

/// Concurrent-safe session state, keyed by an opaque session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<Session>;
    async fn set(&self, session_id: &str, session: Session);
    async fn clear(&self, session_id: &str);
}
