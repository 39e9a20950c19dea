use std::path::PathBuf;

use agent_core::{Bar, CoreError, CoreResult, OhlcvProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BarRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    adj_close: f64,
    volume: f64,
}

/// Reads one `{ticker}.csv` file per ticker from a configured directory.
/// The real daily-bar data source (with its columnar on-disk cache) is an
/// external collaborator per the specification; this stand-in exists only
/// so the binary has something to run against without that dependency.
pub struct CsvOhlcvProvider {
    dir: PathBuf,
}

impl CsvOhlcvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl OhlcvProvider for CsvOhlcvProvider {
    async fn load(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> CoreResult<Vec<Bar>> {
        let path = self.dir.join(format!("{ticker}.csv"));
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .from_path(&path)
            .map_err(|source| CoreError::Internal(format!("failed to open {}: {source}", path.display())))?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<BarRow>() {
            let row = row.map_err(|source| CoreError::Internal(format!("malformed row in {}: {source}", path.display())))?;
            if row.date >= start && row.date <= end {
                bars.push(Bar {
                    date: row.date,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    adj_close: row.adj_close,
                    volume: row.volume,
                });
            }
        }
        bars.sort_by_key(|bar| bar.date);
        Ok(bars)
    }
}
