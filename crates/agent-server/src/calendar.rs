use agent_core::CalendarProvider;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};

/// Weekend-only trading calendar. The real Korean Exchange calendar (with
/// its holiday table) is an external collaborator per the specification;
/// this stand-in exists only so the binary has something to run against
/// without that dependency.
#[derive(Debug, Default)]
pub struct WeekendCalendar;

impl WeekendCalendar {
    fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[async_trait]
impl CalendarProvider for WeekendCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date)
    }

    fn prev_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.pred_opt().expect("NaiveDate underflow");
        while Self::is_weekend(cursor) {
            cursor = cursor.pred_opt().expect("NaiveDate underflow");
        }
        cursor
    }

    fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut cursor = date.succ_opt().expect("NaiveDate overflow");
        while Self::is_weekend(cursor) {
            cursor = cursor.succ_opt().expect("NaiveDate overflow");
        }
        cursor
    }

    fn nth_prev_trading_day(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut cursor = date;
        for _ in 0..n {
            cursor = self.prev_trading_day(cursor);
        }
        cursor
    }
}
