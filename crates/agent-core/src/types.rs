use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily bar for one ticker. Carries both raw and adjusted close
/// since different primitives deliberately read different fields (see
/// `analytics-engine`'s filter implementations).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn is_finite_trade(&self) -> bool {
        self.close.is_finite() && self.volume.is_finite() && self.volume > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Kospi,
    Kosdaq,
}

impl Market {
    pub fn index_ticker(self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI-COMPOSITE",
            Market::Kosdaq => "KOSDAQ-COMPOSITE",
        }
    }

    pub fn from_ticker_suffix(ticker: &str) -> Option<Market> {
        if ticker.ends_with(".KS") {
            Some(Market::Kospi)
        } else if ticker.ends_with(".KQ") {
            Some(Market::Kosdaq)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    SimpleLookup,
    MarketRank,
    AdvancersCount,
    DeclinersCount,
    TradedCount,
    StockSearch,
    CountSearch,
    DateSearch,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Close,
    Open,
    High,
    Low,
    Volume,
    PctChange,
    Index,
    Turnover,
    AscendRate,
    DescendRate,
    Price,
    Volatility,
    Beta,
    ThreeWhite,
    ThreeBlack,
    Rsi,
    Bollinger,
    MovingAvg,
    VolumeSpike,
}

impl Metric {
    /// True for metrics that carry a ticker-agnostic market-level meaning.
    pub fn is_market_level(self) -> bool {
        matches!(self, Metric::Index | Metric::Turnover)
    }

    pub fn is_risk_metric(self) -> bool {
        matches!(self, Metric::Volatility | Metric::Beta)
    }

    /// "Naturally directional" metrics default to a single ranking direction;
    /// "bidirectional" ones (volatility, beta) require an explicit `order`.
    pub fn is_bidirectional(self) -> bool {
        matches!(self, Metric::Volatility | Metric::Beta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BollingerBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossSide {
    Golden,
    Dead,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsecutiveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreePattern {
    White,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    High,
    Low,
}

/// A `{min?, max?}` numeric range leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |m| value >= m) && self.max.map_or(true, |m| value <= m)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiCondition {
    pub window: Option<u32>,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpikeCondition {
    pub window: Option<u32>,
    pub ratio_min: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingAvgCondition {
    pub window: Option<u32>,
    pub diff_pct: Range,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakCondition {
    pub period_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OffPeakCondition {
    pub period_days: Option<u32>,
    pub min: Option<f64>,
}

/// The hierarchical `conditions` tree: a closed sum type, one field per leaf.
/// Every field is independently present/absent; the checker in
/// `dialog-router` walks this struct (not an untyped map) to compute holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub price_close: Option<Range>,
    pub volume: Option<Range>,
    pub pct_change: Option<Range>,
    pub volume_pct: Option<Range>,
    pub pct_change_range: Option<Range>,
    pub gap_pct: Option<Range>,
    pub rsi: Option<RsiCondition>,
    pub volume_spike: Option<VolumeSpikeCondition>,
    pub moving_avg: Option<MovingAvgCondition>,
    pub bollinger_touch: Option<BollingerBand>,
    pub peak_break: Option<PeakCondition>,
    pub peak_low: Option<PeakCondition>,
    pub off_peak: Option<OffPeakCondition>,
    pub cross: Option<CrossSide>,
    pub consecutive_change: Option<ConsecutiveDirection>,
    pub three_pattern: Option<ThreePattern>,
    pub order: Option<RankOrder>,
}

impl Conditions {
    pub fn is_empty(&self) -> bool {
        *self == Conditions::default()
    }

    /// Any leaf that implies a single-day (point-in-time) evaluation.
    pub fn has_single_day_leaf(&self) -> bool {
        self.price_close.is_some()
            || self.volume.is_some()
            || self.pct_change.is_some()
            || self.volume_pct.is_some()
            || self.gap_pct.is_some()
            || self.rsi.is_some()
            || self.volume_spike.is_some()
            || self.moving_avg.is_some()
            || self.bollinger_touch.is_some()
            || self.peak_break.is_some()
            || self.peak_low.is_some()
            || self.off_peak.is_some()
    }

    /// Any leaf that implies a range evaluation.
    pub fn has_range_leaf(&self) -> bool {
        self.pct_change_range.is_some()
            || self.consecutive_change.is_some()
            || self.cross.is_some()
            || self.three_pattern.is_some()
    }
}

/// The full intent record the router carries through a dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub task: Option<Task>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub market: Option<Market>,
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    pub rank_n: Option<u32>,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(skip)]
    pub missing: BTreeSet<String>,
}

impl QueryParameters {
    /// Merge `other` (freshly extracted from a follow-up reply) into `self`
    /// with ticker accumulation (dedup-preserving concatenation) and
    /// non-overwrite semantics for scalar fields already set.
    pub fn merge_non_overwrite(&mut self, other: QueryParameters) {
        if self.task.is_none() {
            self.task = other.task;
        }
        if self.date.is_none() {
            self.date = other.date;
        }
        if self.date_from.is_none() {
            self.date_from = other.date_from;
        }
        if self.date_to.is_none() {
            self.date_to = other.date_to;
        }
        if self.market.is_none() {
            self.market = other.market;
        }
        if self.rank_n.is_none() {
            self.rank_n = other.rank_n;
        }
        for ticker in other.tickers {
            if !self.tickers.contains(&ticker) {
                self.tickers.push(ticker);
            }
        }
        for metric in other.metrics {
            if !self.metrics.contains(&metric) {
                self.metrics.push(metric);
            }
        }
        self.merge_conditions(other.conditions);
    }

    fn merge_conditions(&mut self, other: Conditions) {
        macro_rules! fill {
            ($field:ident) => {
                if self.conditions.$field.is_none() {
                    self.conditions.$field = other.$field;
                }
            };
        }
        fill!(price_close);
        fill!(volume);
        fill!(pct_change);
        fill!(volume_pct);
        fill!(pct_change_range);
        fill!(gap_pct);
        fill!(rsi);
        fill!(volume_spike);
        fill!(moving_avg);
        fill!(bollinger_touch);
        fill!(peak_break);
        fill!(peak_low);
        fill!(off_peak);
        fill!(cross);
        fill!(consecutive_change);
        fill!(three_pattern);
        fill!(order);
    }

    pub fn remove_ticker(&mut self, alias: &str) {
        self.tickers.retain(|t| t != alias);
    }
}

/// Session lifecycle state: a pending record plus the slots still required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub parameters: QueryParameters,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentResponse {
    pub answer: String,
    pub session_id: String,
}
