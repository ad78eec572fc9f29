//! Closed set of filterable trade attributes.
//!
//! Every dimension maps to exactly one trade field through an exhaustive
//! `match`, so adding a field without wiring its filter fails to compile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JournalError;
use crate::models::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoricalDimension {
    Symbol,
    Setup,
    MainTrend,
    InternalTrend,
    EntryType,
    EntryLevel,
    Liquidation,
    Location,
    AccountType,
    Session,
    Trend,
    InternalTrendNew,
    MicroTrend,
    Structure,
    TimeframeEntry,
    UnmitZone,
    MarketPhase,
    SlType,
}

impl CategoricalDimension {
    pub const COUNT: usize = 18;

    pub const ALL: [CategoricalDimension; Self::COUNT] = [
        CategoricalDimension::Symbol,
        CategoricalDimension::Setup,
        CategoricalDimension::MainTrend,
        CategoricalDimension::InternalTrend,
        CategoricalDimension::EntryType,
        CategoricalDimension::EntryLevel,
        CategoricalDimension::Liquidation,
        CategoricalDimension::Location,
        CategoricalDimension::AccountType,
        CategoricalDimension::Session,
        CategoricalDimension::Trend,
        CategoricalDimension::InternalTrendNew,
        CategoricalDimension::MicroTrend,
        CategoricalDimension::Structure,
        CategoricalDimension::TimeframeEntry,
        CategoricalDimension::UnmitZone,
        CategoricalDimension::MarketPhase,
        CategoricalDimension::SlType,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            CategoricalDimension::Symbol => "symbol",
            CategoricalDimension::Setup => "setup",
            CategoricalDimension::MainTrend => "mainTrend",
            CategoricalDimension::InternalTrend => "internalTrend",
            CategoricalDimension::EntryType => "entryType",
            CategoricalDimension::EntryLevel => "entryLevel",
            CategoricalDimension::Liquidation => "liquidation",
            CategoricalDimension::Location => "location",
            CategoricalDimension::AccountType => "accountType",
            CategoricalDimension::Session => "session",
            CategoricalDimension::Trend => "trend",
            CategoricalDimension::InternalTrendNew => "internalTrendNew",
            CategoricalDimension::MicroTrend => "microTrend",
            CategoricalDimension::Structure => "structure",
            CategoricalDimension::TimeframeEntry => "timeframeEntry",
            CategoricalDimension::UnmitZone => "unmitZone",
            CategoricalDimension::MarketPhase => "marketPhase",
            CategoricalDimension::SlType => "slType",
        }
    }

    /// The trade's value for this dimension. Blank strings count as absent.
    pub fn value_of(self, trade: &Trade) -> Option<&str> {
        let raw = match self {
            CategoricalDimension::Symbol => &trade.symbol,
            CategoricalDimension::Setup => &trade.setup,
            CategoricalDimension::MainTrend => &trade.main_trend,
            CategoricalDimension::InternalTrend => &trade.internal_trend,
            CategoricalDimension::EntryType => &trade.entry_type,
            CategoricalDimension::EntryLevel => &trade.entry_level,
            CategoricalDimension::Liquidation => &trade.liquidation,
            CategoricalDimension::Location => &trade.location,
            CategoricalDimension::AccountType => &trade.account_type,
            CategoricalDimension::Session => &trade.session,
            CategoricalDimension::Trend => &trade.trend,
            CategoricalDimension::InternalTrendNew => &trade.internal_trend_new,
            CategoricalDimension::MicroTrend => &trade.micro_trend,
            CategoricalDimension::Structure => &trade.structure,
            CategoricalDimension::TimeframeEntry => &trade.timeframe_entry,
            CategoricalDimension::UnmitZone => &trade.unmit_zone,
            CategoricalDimension::MarketPhase => &trade.market_phase,
            CategoricalDimension::SlType => &trade.sl_type,
        };
        raw.as_deref().filter(|v| !v.trim().is_empty())
    }
}

impl fmt::Display for CategoricalDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CategoricalDimension {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.key() == s)
            .ok_or_else(|| JournalError::InvalidFilter(format!("Unknown categorical dimension: {}", s)))
    }
}

/// Named numeric sub-range, half-open: `min <= v < max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub label: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bucket {
    const fn new(label: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self { label, min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        let above_min = self.min.is_none_or(|min| value >= min);
        let below_max = self.max.is_none_or(|max| value < max);
        above_min && below_max
    }
}

const RISK_REWARD_BUCKETS: [Bucket; 4] = [
    Bucket::new("< 1", None, Some(1.0)),
    Bucket::new("1-2", Some(1.0), Some(2.0)),
    Bucket::new("2-3", Some(2.0), Some(3.0)),
    Bucket::new("3+", Some(3.0), None),
];

const PROFIT_LOSS_BUCKETS: [Bucket; 4] = [
    Bucket::new("< 0", None, Some(0.0)),
    Bucket::new("0-100", Some(0.0), Some(100.0)),
    Bucket::new("100-500", Some(100.0), Some(500.0)),
    Bucket::new("500+", Some(500.0), None),
];

const RISK_SUM_BUCKETS: [Bucket; 4] = [
    Bucket::new("< 50", None, Some(50.0)),
    Bucket::new("50-100", Some(50.0), Some(100.0)),
    Bucket::new("100-200", Some(100.0), Some(200.0)),
    Bucket::new("200+", Some(200.0), None),
];

const SL_POINTS_BUCKETS: [Bucket; 4] = [
    Bucket::new("< 10", None, Some(10.0)),
    Bucket::new("10-20", Some(10.0), Some(20.0)),
    Bucket::new("20-50", Some(20.0), Some(50.0)),
    Bucket::new("50+", Some(50.0), None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeDimension {
    RiskReward,
    ProfitLoss,
    RiskSum,
    SlPoints,
}

impl RangeDimension {
    pub const COUNT: usize = 4;

    pub const ALL: [RangeDimension; Self::COUNT] = [
        RangeDimension::RiskReward,
        RangeDimension::ProfitLoss,
        RangeDimension::RiskSum,
        RangeDimension::SlPoints,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            RangeDimension::RiskReward => "rrRanges",
            RangeDimension::ProfitLoss => "profitLossRanges",
            RangeDimension::RiskSum => "riskSumRanges",
            RangeDimension::SlPoints => "slPointsRanges",
        }
    }

    pub fn buckets(self) -> &'static [Bucket] {
        match self {
            RangeDimension::RiskReward => &RISK_REWARD_BUCKETS,
            RangeDimension::ProfitLoss => &PROFIT_LOSS_BUCKETS,
            RangeDimension::RiskSum => &RISK_SUM_BUCKETS,
            RangeDimension::SlPoints => &SL_POINTS_BUCKETS,
        }
    }

    pub fn bucket(self, label: &str) -> Option<&'static Bucket> {
        self.buckets().iter().find(|b| b.label == label)
    }

    /// The trade's numeric value for this dimension. `NaN` counts as absent.
    pub fn value_of(self, trade: &Trade) -> Option<f64> {
        let raw = match self {
            RangeDimension::RiskReward => trade.rr_achieved,
            RangeDimension::ProfitLoss => trade.profit_loss,
            RangeDimension::RiskSum => trade.risk_sum,
            RangeDimension::SlPoints => trade.sl_points,
        };
        raw.filter(|v| !v.is_nan())
    }
}

impl fmt::Display for RangeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RangeDimension {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.key() == s)
            .ok_or_else(|| JournalError::InvalidFilter(format!("Unknown range dimension: {}", s)))
    }
}

/// Any set-valued dimension of the filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Categorical(CategoricalDimension),
    Range(RangeDimension),
}

impl Dimension {
    pub fn all() -> impl Iterator<Item = Dimension> {
        CategoricalDimension::ALL
            .into_iter()
            .map(Dimension::Categorical)
            .chain(RangeDimension::ALL.into_iter().map(Dimension::Range))
    }

    pub fn key(self) -> &'static str {
        match self {
            Dimension::Categorical(d) => d.key(),
            Dimension::Range(d) => d.key(),
        }
    }
}

impl From<CategoricalDimension> for Dimension {
    fn from(d: CategoricalDimension) -> Self {
        Dimension::Categorical(d)
    }
}

impl From<RangeDimension> for Dimension {
    fn from(d: RangeDimension) -> Self {
        Dimension::Range(d)
    }
}
