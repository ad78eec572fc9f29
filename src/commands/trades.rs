use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{CreateTradeInput, Trade, TradeQuery, UpdateTradeInput};

pub(crate) const TRADE_COLUMNS: &str = "id, user_id, date, \
    symbol, setup, main_trend, internal_trend, entry_type, entry_level, liquidation, location, \
    account_type, session, trend, internal_trend_new, micro_trend, structure, timeframe_entry, \
    unmit_zone, market_phase, sl_type, \
    rr_achieved, rr_potential, profit_loss, range_points, sl_points, risk_sum, size, \
    is_win, gpt_feedback, chart_image, created_at, updated_at";

/// Helper function to map a database row to a Trade struct.
/// Column order follows `TRADE_COLUMNS`.
pub(crate) fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        symbol: row.get(3)?,
        setup: row.get(4)?,
        main_trend: row.get(5)?,
        internal_trend: row.get(6)?,
        entry_type: row.get(7)?,
        entry_level: row.get(8)?,
        liquidation: row.get(9)?,
        location: row.get(10)?,
        account_type: row.get(11)?,
        session: row.get(12)?,
        trend: row.get(13)?,
        internal_trend_new: row.get(14)?,
        micro_trend: row.get(15)?,
        structure: row.get(16)?,
        timeframe_entry: row.get(17)?,
        unmit_zone: row.get(18)?,
        market_phase: row.get(19)?,
        sl_type: row.get(20)?,
        rr_achieved: row.get(21)?,
        rr_potential: row.get(22)?,
        profit_loss: row.get(23)?,
        range_points: row.get(24)?,
        sl_points: row.get(25)?,
        risk_sum: row.get(26)?,
        size: row.get(27)?,
        is_win: row.get(28)?,
        gpt_feedback: row.get(29)?,
        chart_image: row.get(30)?,
        created_at: row.get(31)?,
        updated_at: row.get(32)?,
    })
}

/// List a user's trades in insertion order.
pub fn get_trades(db: &Database, user_id: i64, query: &TradeQuery) -> Result<Vec<Trade>> {
    let conn = db.conn.lock()?;

    let mut sql = format!("SELECT {} FROM trades WHERE user_id = ?", TRADE_COLUMNS);
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

    if let Some(symbol) = query.symbol.as_deref().filter(|s| !s.trim().is_empty()) {
        sql.push_str(" AND symbol LIKE ?");
        params.push(Box::new(format!("%{}%", symbol.trim())));
    }

    sql.push_str(" ORDER BY id ASC");

    if let (Some(page), Some(limit)) = (query.page, query.limit) {
        let limit = limit.max(1);
        let offset = (page.max(1) - 1) * limit;
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Box::new(limit));
        params.push(Box::new(offset));
    }

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let trades = stmt
        .query_map(param_refs.as_slice(), map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<Trade>>>()?;

    Ok(trades)
}

pub fn get_trade(db: &Database, user_id: i64, id: i64) -> Result<Trade> {
    let conn = db.conn.lock()?;
    find_trade(&conn, user_id, id)
}

fn find_trade(conn: &Connection, user_id: i64, id: i64) -> Result<Trade> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ? AND user_id = ?", TRADE_COLUMNS),
        params![id, user_id],
        map_row_to_trade,
    )
    .optional()?
    .ok_or(JournalError::TradeNotFound(id))
}

pub fn create_trade(db: &Database, user_id: i64, trade: &CreateTradeInput) -> Result<Trade> {
    let conn = db.conn.lock()?;
    let id = insert_trade(&conn, user_id, trade, None)?;
    log::info!("Created trade {} for user {}", id, user_id);
    find_trade(&conn, user_id, id)
}

/// Insert one trade row and return its id. Shared by manual creation and import.
pub(crate) fn insert_trade(
    conn: &Connection,
    user_id: i64,
    trade: &CreateTradeInput,
    import_fingerprint: Option<&str>,
) -> Result<i64> {
    if trade.date.trim().is_empty() {
        return Err(JournalError::InvalidInput("Trade date is required".to_string()));
    }

    let now = Utc::now().timestamp();

    conn.execute(
        "INSERT INTO trades (
            user_id, date,
            symbol, setup, main_trend, internal_trend, entry_type, entry_level, liquidation, location,
            account_type, session, trend, internal_trend_new, micro_trend, structure, timeframe_entry,
            unmit_zone, market_phase, sl_type,
            rr_achieved, rr_potential, profit_loss, range_points, sl_points, risk_sum, size,
            is_win, gpt_feedback, chart_image, import_fingerprint, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            user_id, trade.date,
            trade.symbol, trade.setup, trade.main_trend, trade.internal_trend, trade.entry_type,
            trade.entry_level, trade.liquidation, trade.location, trade.account_type, trade.session,
            trade.trend, trade.internal_trend_new, trade.micro_trend, trade.structure,
            trade.timeframe_entry, trade.unmit_zone, trade.market_phase, trade.sl_type,
            trade.rr_achieved, trade.rr_potential, trade.profit_loss, trade.range_points,
            trade.sl_points, trade.risk_sum, trade.size,
            trade.is_win, trade.gpt_feedback, trade.chart_image, import_fingerprint, now, now
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

// Appends `column = ?` for every provided field of the update.
macro_rules! push_updates {
    ($update:expr, $updates:expr, $values:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$update.$field {
                $updates.push(concat!(stringify!($field), " = ?"));
                $values.push(Box::new(value.clone()));
            }
        )+
    };
}

/// Partial update: only the fields present in `trade_update` are written.
pub fn update_trade(
    db: &Database,
    user_id: i64,
    id: i64,
    trade_update: &UpdateTradeInput,
) -> Result<Trade> {
    if trade_update.date.as_deref().is_some_and(|d| d.trim().is_empty()) {
        return Err(JournalError::InvalidInput("Trade date cannot be empty".to_string()));
    }

    let conn = db.conn.lock()?;

    if trade_update.is_empty() {
        return find_trade(&conn, user_id, id);
    }

    let now = Utc::now().timestamp();

    // Build dynamic UPDATE query based on provided fields
    let mut updates = vec!["updated_at = ?"];
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now)];

    push_updates!(
        trade_update, updates, values,
        date,
        symbol, setup, main_trend, internal_trend, entry_type, entry_level,
        liquidation, location, account_type, session, trend, internal_trend_new,
        micro_trend, structure, timeframe_entry, unmit_zone, market_phase, sl_type,
        rr_achieved, rr_potential, profit_loss, range_points, sl_points, risk_sum, size,
        is_win, gpt_feedback, chart_image,
    );

    let query = format!(
        "UPDATE trades SET {} WHERE id = ? AND user_id = ?",
        updates.join(", ")
    );
    values.push(Box::new(id));
    values.push(Box::new(user_id));

    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let changed = conn.execute(&query, params.as_slice())?;
    if changed == 0 {
        return Err(JournalError::TradeNotFound(id));
    }

    find_trade(&conn, user_id, id)
}

/// Copy a trade under a new id. The import fingerprint is not carried over.
pub fn duplicate_trade(db: &Database, user_id: i64, id: i64) -> Result<Trade> {
    let conn = db.conn.lock()?;
    let now = Utc::now().timestamp();

    let columns = "user_id, date, \
        symbol, setup, main_trend, internal_trend, entry_type, entry_level, liquidation, location, \
        account_type, session, trend, internal_trend_new, micro_trend, structure, timeframe_entry, \
        unmit_zone, market_phase, sl_type, \
        rr_achieved, rr_potential, profit_loss, range_points, sl_points, risk_sum, size, \
        is_win, gpt_feedback, chart_image";

    let copied = conn.execute(
        &format!(
            "INSERT INTO trades ({columns}, created_at, updated_at)
             SELECT {columns}, ?, ? FROM trades WHERE id = ? AND user_id = ?"
        ),
        params![now, now, id, user_id],
    )?;
    if copied == 0 {
        return Err(JournalError::TradeNotFound(id));
    }

    let new_id = conn.last_insert_rowid();
    find_trade(&conn, user_id, new_id)
}

/// Irreversibly delete a trade. Refused unless the caller confirmed.
pub fn delete_trade(db: &Database, user_id: i64, id: i64, confirmed: bool) -> Result<()> {
    if !confirmed {
        return Err(JournalError::ConfirmationRequired(id));
    }

    let conn = db.conn.lock()?;
    let deleted = conn.execute(
        "DELETE FROM trades WHERE id = ? AND user_id = ?",
        params![id, user_id],
    )?;
    if deleted == 0 {
        return Err(JournalError::TradeNotFound(id));
    }

    log::info!("Deleted trade {} for user {}", id, user_id);
    Ok(())
}
