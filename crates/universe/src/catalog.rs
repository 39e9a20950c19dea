use std::collections::HashMap;
use std::path::Path;

use agent_core::Market;
use serde::Deserialize;

use crate::error::{UniverseError, UniverseResult};

#[derive(Debug, Deserialize)]
struct TickerRow {
    #[serde(rename = "종목코드")]
    ticker: String,
    #[serde(rename = "종목명")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    alias: String,
    ticker: String,
}

fn load_ticker_csv(path: &Path) -> UniverseResult<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|source| UniverseError::Csv {
            path: path.display().to_string(),
            source,
        })?;

    let mut by_name = HashMap::new();
    for row in reader.deserialize::<TickerRow>() {
        let row = row.map_err(|source| UniverseError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let ticker = row.ticker.trim().to_uppercase();
        let mut name = row.name.trim().to_string();
        if by_name.contains_key(&name) {
            let code_part = ticker.split('.').next().unwrap_or(&ticker);
            name = format!("{name}({code_part})");
        }
        by_name.insert(name, ticker);
    }
    Ok(by_name)
}

fn load_alias_csv(path: &Path) -> UniverseResult<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|source| UniverseError::Csv {
            path: path.display().to_string(),
            source,
        })?;

    let mut aliases = HashMap::new();
    for row in reader.deserialize::<AliasRow>() {
        let row = row.map_err(|source| UniverseError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let alias = row.alias.trim().to_string();
        let ticker = row.ticker.trim().to_uppercase();
        if !alias.is_empty() && !ticker.is_empty() {
            aliases.insert(alias, ticker);
        }
    }
    Ok(aliases)
}

/// Static maps loaded once at startup: code↔name, alias→code, per-market
/// ticker lists. Immutable after construction; shared freely across
/// requests behind an `Arc`.
#[derive(Debug, Default)]
pub struct UniverseCatalog {
    kospi_by_name: HashMap<String, String>,
    kosdaq_by_name: HashMap<String, String>,
    name_by_ticker: HashMap<String, String>,
    alias_by_text: HashMap<String, String>,
}

impl UniverseCatalog {
    pub fn load(
        kospi_csv: impl AsRef<Path>,
        kosdaq_csv: impl AsRef<Path>,
        alias_csv: impl AsRef<Path>,
    ) -> UniverseResult<Self> {
        let kospi_by_name = load_ticker_csv(kospi_csv.as_ref())?;
        let kosdaq_by_name = load_ticker_csv(kosdaq_csv.as_ref())?;
        let alias_by_text = load_alias_csv(alias_csv.as_ref())?;

        let mut name_by_ticker = HashMap::with_capacity(kospi_by_name.len() + kosdaq_by_name.len());
        for (name, ticker) in kospi_by_name.iter().chain(kosdaq_by_name.iter()) {
            name_by_ticker.insert(ticker.clone(), name.clone());
        }

        tracing::info!(
            kospi = kospi_by_name.len(),
            kosdaq = kosdaq_by_name.len(),
            aliases = alias_by_text.len(),
            "loaded universe catalog"
        );

        Ok(Self {
            kospi_by_name,
            kosdaq_by_name,
            name_by_ticker,
            alias_by_text,
        })
    }

    /// Every display name → ticker pair, across both markets. This is the
    /// base of the disambiguator's static alias table before the
    /// alias-CSV overlay and particle-stripped variants are added.
    pub fn name_map(&self) -> HashMap<String, String> {
        let mut combined = self.kospi_by_name.clone();
        combined.extend(self.kosdaq_by_name.clone());
        combined
    }

    pub fn alias_map(&self) -> &HashMap<String, String> {
        &self.alias_by_text
    }

    pub fn official_name(&self, ticker: &str) -> Option<&str> {
        self.name_by_ticker.get(ticker).map(String::as_str)
    }

    pub fn tickers(&self, market: Option<Market>) -> Vec<String> {
        match market {
            Some(Market::Kospi) => self.kospi_by_name.values().cloned().collect(),
            Some(Market::Kosdaq) => self.kosdaq_by_name.values().cloned().collect(),
            None => self
                .kospi_by_name
                .values()
                .chain(self.kosdaq_by_name.values())
                .cloned()
                .collect(),
        }
    }

    pub fn market_of(&self, ticker: &str) -> Option<Market> {
        Market::from_ticker_suffix(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &std::path::Path, file: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(file);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn duplicate_names_get_code_suffix() {
        let dir = tempfile_dir();
        let kospi = write_csv(
            &dir,
            "kospi.csv",
            "종목코드,종목명\n005930.KS,삼성전자\n000020.KS,삼성전자\n",
        );
        let kosdaq = write_csv(&dir, "kosdaq.csv", "종목코드,종목명\n");
        let alias = write_csv(&dir, "alias.csv", "alias,ticker\n");

        let catalog = UniverseCatalog::load(&kospi, &kosdaq, &alias).unwrap();
        let names = catalog.name_map();
        assert!(names.contains_key("삼성전자"));
        assert!(names.contains_key("삼성전자(000020)"));
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("universe-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
