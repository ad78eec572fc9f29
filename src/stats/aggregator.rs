//! Summary statistics over any trade collection.
//!
//! Every function is total: an empty collection yields zero, never a division
//! by zero. Missing numeric values count as 0 in sums but still count as trades.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Trade;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeStats {
    pub count: usize,
    pub win_rate: f64,
    pub average_risk_reward: f64,
    pub total_profit_loss: f64,
    pub average_profit_loss: f64,
    pub distinct_setup_count: usize,
}

pub fn count(trades: &[Trade]) -> usize {
    trades.len()
}

/// Percentage of trades with a recorded win. Unrecorded outcomes count against.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win == Some(true)).count();
    (wins as f64 / trades.len() as f64) * 100.0
}

pub fn total_profit_loss(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| recorded(t.profit_loss)).sum()
}

pub fn average_profit_loss(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    total_profit_loss(trades) / trades.len() as f64
}

pub fn average_risk_reward(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let sum: f64 = trades.iter().map(|t| recorded(t.rr_achieved)).sum();
    sum / trades.len() as f64
}

pub fn distinct_setup_count(trades: &[Trade]) -> usize {
    trades
        .iter()
        .filter_map(|t| t.setup.as_deref())
        .filter(|s| !s.trim().is_empty())
        .collect::<HashSet<_>>()
        .len()
}

pub fn summarize(trades: &[Trade]) -> TradeStats {
    TradeStats {
        count: count(trades),
        win_rate: win_rate(trades),
        average_risk_reward: average_risk_reward(trades),
        total_profit_loss: total_profit_loss(trades),
        average_profit_loss: average_profit_loss(trades),
        distinct_setup_count: distinct_setup_count(trades),
    }
}

/// Missing (or NaN) contributes nothing to a sum.
fn recorded(value: Option<f64>) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(0.0)
}
