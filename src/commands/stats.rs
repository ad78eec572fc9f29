use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::settings::get_settings;
use crate::commands::trades::get_trades;
use crate::db::Database;
use crate::error::Result;
use crate::filters::{evaluate, parse_trade_date, CategoricalDimension, DateRange, FilterState, SingleValue};
use crate::models::{Trade, TradeQuery};
use crate::stats::{summarize, TradeStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(flatten)]
    pub summary: TradeStats,
    pub wins: usize,
    pub losses: usize,
    pub unrecorded: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityCurvePoint {
    pub date: String,
    pub cumulative_pnl: f64,
    pub daily_pnl: f64,
    pub trade_count: usize,
}

/// Per-value statistics for one categorical dimension (heatmaps, summary cards).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub value: String,
    pub stats: TradeStats,
}

pub fn dashboard_stats(trades: &[Trade]) -> DashboardStats {
    let wins = trades.iter().filter(|t| t.is_win == Some(true)).count();
    let losses = trades.iter().filter(|t| t.is_win == Some(false)).count();

    let pnls: Vec<f64> = trades
        .iter()
        .filter_map(|t| t.profit_loss)
        .filter(|p| !p.is_nan())
        .collect();

    let gross_profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|p| **p < 0.0).sum::<f64>().abs();

    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let best_trade = pnls.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let worst_trade = pnls.iter().copied().reduce(f64::min).unwrap_or(0.0);

    DashboardStats {
        summary: summarize(trades),
        wins,
        losses,
        unrecorded: trades.len() - wins - losses,
        gross_profit,
        gross_loss,
        profit_factor,
        best_trade,
        worst_trade,
    }
}

/// Daily P/L with running total, oldest day first. Trades without a
/// parseable date or a recorded P/L are left out.
pub fn equity_curve(trades: &[Trade]) -> Vec<EquityCurvePoint> {
    let mut daily_map: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for trade in trades {
        let Some(pnl) = trade.profit_loss.filter(|p| !p.is_nan()) else {
            continue;
        };
        let date = match parse_trade_date(&trade.date) {
            Ok(dt) => dt.date(),
            Err(e) => {
                log::warn!("Equity curve skips trade {}: {}", trade.id, e);
                continue;
            }
        };

        let entry = daily_map.entry(date).or_insert((0.0, 0));
        entry.0 += pnl;
        entry.1 += 1;
    }

    let mut cumulative_pnl = 0.0;
    daily_map
        .into_iter()
        .map(|(date, (daily_pnl, trade_count))| {
            cumulative_pnl += daily_pnl;
            EquityCurvePoint {
                date: date.format("%Y-%m-%d").to_string(),
                cumulative_pnl,
                daily_pnl,
                trade_count,
            }
        })
        .collect()
}

/// Group by the trade's value for `dimension`, ordered by value. Trades without
/// a value are grouped under an empty string.
pub fn breakdown_by(trades: &[Trade], dimension: CategoricalDimension) -> Vec<GroupStats> {
    let mut groups: HashMap<String, Vec<Trade>> = HashMap::new();
    for trade in trades {
        let key = dimension.value_of(trade).unwrap_or_default().to_string();
        groups.entry(key).or_default().push(trade.clone());
    }

    let mut result: Vec<GroupStats> = groups
        .into_iter()
        .map(|(value, group)| GroupStats {
            value,
            stats: summarize(&group),
        })
        .collect();
    result.sort_by(|a, b| a.value.cmp(&b.value));
    result
}

/// Map a dashboard preset ("today", "week", "month", "3months", "6months",
/// "year") to a day range ending today. Anything else means no date limit.
pub fn preset_date_range(preset: Option<&str>, today: NaiveDate) -> Option<DateRange> {
    let days_back = match preset? {
        "today" => 0,
        "week" => 7,
        "month" => 30,
        "3months" => 90,
        "6months" => 180,
        "year" => 365,
        _ => return None,
    };
    DateRange::new(today - Duration::days(days_back), today).ok()
}

pub fn get_dashboard_stats(
    db: &Database,
    user_id: i64,
    date_range: Option<&str>,
) -> Result<DashboardStats> {
    let trades = load_in_range(db, user_id, date_range)?;
    Ok(dashboard_stats(&trades))
}

pub fn get_equity_curve(
    db: &Database,
    user_id: i64,
    date_range: Option<&str>,
) -> Result<Vec<EquityCurvePoint>> {
    let trades = load_in_range(db, user_id, date_range)?;
    Ok(equity_curve(&trades))
}

/// Without an explicit preset the journal's `default_date_range` applies.
fn load_in_range(db: &Database, user_id: i64, date_range: Option<&str>) -> Result<Vec<Trade>> {
    let preset = match date_range {
        Some(preset) => preset.to_string(),
        None => get_settings(db)?.default_date_range,
    };
    let trades = get_trades(db, user_id, &TradeQuery::default())?;

    let Some(range) = preset_date_range(Some(&preset), Utc::now().date_naive()) else {
        return Ok(trades);
    };

    let mut state = FilterState::new();
    state.set_single_value(SingleValue::DateRange(range))?;
    Ok(evaluate(&trades, &state).trades)
}
