//! Per-trade inclusion predicate.
//!
//! A trade is included only if every dimension passes. Within a set-valued
//! dimension any selected value (or bucket) is enough.
//!
//! Null policy: categorical and ranged dimensions are permissive. A trade with
//! no recorded value for an actively filtered dimension is NOT excluded by
//! that dimension. The win/loss dimension is strict: an active win/loss filter
//! only passes trades whose outcome is recorded and equal.

use serde::Serialize;

use super::dates::parse_trade_date;
use super::dimension::{CategoricalDimension, RangeDimension};
use super::state::FilterState;
use crate::models::Trade;

/// Result of a date test, kept separate so a filter pass can report anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCheck {
    Inside,
    Outside,
    Unparseable,
}

/// Trade whose date could not be normalized and was passed through unfiltered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAnomaly {
    pub trade_id: i64,
    pub raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub trades: Vec<Trade>,
    pub anomalies: Vec<DateAnomaly>,
}

pub fn matches(trade: &Trade, state: &FilterState) -> bool {
    matches_non_date(trade, state) && check_date(trade, state) != DateCheck::Outside
}

fn matches_non_date(trade: &Trade, state: &FilterState) -> bool {
    CategoricalDimension::ALL
        .into_iter()
        .all(|d| categorical_passes(trade, state, d))
        && RangeDimension::ALL
            .into_iter()
            .all(|d| range_passes(trade, state, d))
        && win_passes(trade, state)
}

pub fn categorical_passes(trade: &Trade, state: &FilterState, dimension: CategoricalDimension) -> bool {
    let selected = state.categorical(dimension);
    if selected.is_empty() {
        return true;
    }
    match dimension.value_of(trade) {
        Some(value) => selected.contains(value),
        None => true,
    }
}

pub fn range_passes(trade: &Trade, state: &FilterState, dimension: RangeDimension) -> bool {
    let selected = state.ranges(dimension);
    if selected.is_empty() {
        return true;
    }
    let Some(value) = dimension.value_of(trade) else {
        return true;
    };
    selected
        .iter()
        .filter_map(|label| dimension.bucket(label))
        .any(|bucket| bucket.contains(value))
}

pub fn win_passes(trade: &Trade, state: &FilterState) -> bool {
    match state.is_win() {
        None => true,
        Some(wanted) => trade.is_win == Some(wanted),
    }
}

pub fn check_date(trade: &Trade, state: &FilterState) -> DateCheck {
    let range = state.date_range();
    if range.is_all() {
        return DateCheck::Inside;
    }
    match parse_trade_date(&trade.date) {
        Ok(instant) if range.contains(instant) => DateCheck::Inside,
        Ok(_) => DateCheck::Outside,
        Err(_) => DateCheck::Unparseable,
    }
}

/// Run the predicate over a whole collection, preserving order.
///
/// A trade with an unparseable date is kept and reported, never fatal to the pass.
pub fn evaluate(trades: &[Trade], state: &FilterState) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for trade in trades {
        if !matches_non_date(trade, state) {
            continue;
        }
        match check_date(trade, state) {
            DateCheck::Inside => outcome.trades.push(trade.clone()),
            DateCheck::Outside => {}
            DateCheck::Unparseable => {
                log::warn!(
                    "Trade {} has unparseable date {:?}; skipping date filter for it",
                    trade.id,
                    trade.date
                );
                outcome.anomalies.push(DateAnomaly {
                    trade_id: trade.id,
                    raw: trade.date.clone(),
                });
                outcome.trades.push(trade.clone());
            }
        }
    }

    outcome
}
