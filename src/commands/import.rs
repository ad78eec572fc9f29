use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::commands::settings::read_settings;
use crate::commands::trades::{insert_trade, map_row_to_trade, TRADE_COLUMNS};
use crate::db::Database;
use crate::error::Result;
use crate::filters::parse_trade_date;
use crate::models::{CreateTradeInput, Settings, Trade};

const BACKUP_VERSION: &str = "1.0.0";

// "$1,250.50", "-90.35USD", "2R", "12 pts"
static NUMERIC_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-+]?)\s*\$?\s*([\d,]*\.?\d+)\s*[A-Za-z%]*$").expect("numeric pattern is valid")
});

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates: usize,
    pub errors: Vec<String>,
}

/// One CSV row as text. Headers match the camelCase JSON field names; unknown
/// columns are ignored and missing ones read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CsvTradeRow {
    date: Option<String>,
    symbol: Option<String>,
    setup: Option<String>,
    main_trend: Option<String>,
    internal_trend: Option<String>,
    entry_type: Option<String>,
    entry_level: Option<String>,
    liquidation: Option<String>,
    location: Option<String>,
    account_type: Option<String>,
    session: Option<String>,
    trend: Option<String>,
    internal_trend_new: Option<String>,
    micro_trend: Option<String>,
    structure: Option<String>,
    timeframe_entry: Option<String>,
    unmit_zone: Option<String>,
    market_phase: Option<String>,
    sl_type: Option<String>,
    rr_achieved: Option<String>,
    rr_potential: Option<String>,
    profit_loss: Option<String>,
    range_points: Option<String>,
    sl_points: Option<String>,
    risk_sum: Option<String>,
    size: Option<String>,
    is_win: Option<String>,
    gpt_feedback: Option<String>,
    chart_image: Option<String>,
}

impl CsvTradeRow {
    fn into_input(self) -> std::result::Result<CreateTradeInput, String> {
        let date = text(self.date).ok_or("Missing date")?;

        Ok(CreateTradeInput {
            date,
            symbol: text(self.symbol),
            setup: text(self.setup),
            main_trend: text(self.main_trend),
            internal_trend: text(self.internal_trend),
            entry_type: text(self.entry_type),
            entry_level: text(self.entry_level),
            liquidation: text(self.liquidation),
            location: text(self.location),
            account_type: text(self.account_type),
            session: text(self.session),
            trend: text(self.trend),
            internal_trend_new: text(self.internal_trend_new),
            micro_trend: text(self.micro_trend),
            structure: text(self.structure),
            timeframe_entry: text(self.timeframe_entry),
            unmit_zone: text(self.unmit_zone),
            market_phase: text(self.market_phase),
            sl_type: text(self.sl_type),
            rr_achieved: parse_numeric_value("rrAchieved", self.rr_achieved)?,
            rr_potential: parse_numeric_value("rrPotential", self.rr_potential)?,
            profit_loss: parse_numeric_value("profitLoss", self.profit_loss)?,
            range_points: parse_numeric_value("rangePoints", self.range_points)?,
            sl_points: parse_numeric_value("slPoints", self.sl_points)?,
            risk_sum: parse_numeric_value("riskSum", self.risk_sum)?,
            size: parse_numeric_value("size", self.size)?,
            is_win: parse_outcome(self.is_win)?,
            gpt_feedback: text(self.gpt_feedback),
            chart_image: text(self.chart_image),
        })
    }
}

fn text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_numeric_value(column: &str, value: Option<String>) -> std::result::Result<Option<f64>, String> {
    let Some(raw) = text(value) else {
        return Ok(None);
    };

    let caps = NUMERIC_VALUE
        .captures(raw.trim())
        .ok_or_else(|| format!("{}: '{}' is not a number", column, raw))?;
    let sign = caps.get(1).map_or("", |m| m.as_str());
    let digits = caps.get(2).map_or("", |m| m.as_str()).replace(',', "");

    format!("{}{}", sign, digits)
        .parse::<f64>()
        .map(Some)
        .map_err(|e| format!("{}: '{}' {}", column, raw, e))
}

fn parse_outcome(value: Option<String>) -> std::result::Result<Option<bool>, String> {
    let Some(raw) = text(value) else {
        return Ok(None);
    };

    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "win" | "w" | "1" => Ok(Some(true)),
        "false" | "no" | "n" | "loss" | "l" | "0" => Ok(Some(false)),
        _ => Err(format!("isWin: '{}' is not a win/loss value", raw)),
    }
}

fn generate_fingerprint(trade: &CreateTradeInput) -> String {
    fn number(value: Option<f64>) -> String {
        value.map(|v| format!("{:.8}", v)).unwrap_or_default()
    }

    format!(
        "journal|{}|{}|{}|{}|{}|{}",
        trade.date.trim(),
        trade.symbol.as_deref().unwrap_or_default().to_lowercase(),
        trade.setup.as_deref().unwrap_or_default().to_lowercase(),
        number(trade.profit_loss),
        number(trade.rr_achieved),
        trade.is_win.map(|w| w.to_string()).unwrap_or_default(),
    )
}

/// Fingerprints already present for the user: the stored import fingerprints
/// plus one computed from the current content of every trade.
fn known_fingerprints(conn: &Connection, user_id: i64) -> Result<HashSet<String>> {
    let mut known = HashSet::new();

    let mut stmt = conn.prepare(
        "SELECT import_fingerprint FROM trades WHERE user_id = ? AND import_fingerprint IS NOT NULL",
    )?;
    for fingerprint in stmt.query_map([user_id], |row| row.get::<_, String>(0))? {
        known.insert(fingerprint?);
    }

    let mut stmt = conn.prepare(&format!("SELECT {} FROM trades WHERE user_id = ?", TRADE_COLUMNS))?;
    for trade in stmt.query_map([user_id], map_row_to_trade)? {
        known.insert(generate_fingerprint(&CreateTradeInput::from(&trade?)));
    }

    Ok(known)
}

/// Insert `trade` unless an identical one is already known. Returns whether it was inserted.
fn insert_unless_known(
    conn: &Connection,
    user_id: i64,
    trade: &CreateTradeInput,
    known: &mut HashSet<String>,
) -> Result<bool> {
    let fingerprint = generate_fingerprint(trade);
    if known.contains(&fingerprint) {
        return Ok(false);
    }

    if parse_trade_date(&trade.date).is_err() {
        log::warn!("Importing trade with unrecognised date '{}'", trade.date);
    }

    insert_trade(conn, user_id, trade, Some(&fingerprint))?;
    known.insert(fingerprint);
    Ok(true)
}

/// Import trades from CSV text. Bad rows are reported and skipped; rows that
/// match an existing trade count as duplicates.
pub fn import_trades_csv(db: &Database, user_id: i64, csv_content: &str) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_content.as_bytes());
    let headers = reader.headers()?.clone();

    let mut result = ImportResult::default();

    let conn = db.conn.lock()?;
    let tx = conn.unchecked_transaction()?;
    let mut known = known_fingerprints(&tx, user_id)?;

    for (index, record) in reader.records().enumerate() {
        // Header is line 1
        let mut line = index + 2;

        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|record| {
                if let Some(position) = record.position() {
                    line = position.line() as usize;
                }
                record
                    .deserialize::<CsvTradeRow>(Some(&headers))
                    .map_err(|e| e.to_string())
            })
            .and_then(CsvTradeRow::into_input);

        match parsed {
            Ok(trade) => {
                if insert_unless_known(&tx, user_id, &trade, &mut known)? {
                    result.imported += 1;
                } else {
                    result.duplicates += 1;
                }
            }
            Err(e) => {
                log::warn!("Skipping CSV line {}: {}", line, e);
                result.errors.push(format!("Line {}: {}", line, e));
            }
        }
    }

    tx.commit()?;

    log::info!(
        "CSV import for user {}: {} imported, {} duplicates, {} errors",
        user_id,
        result.imported,
        result.duplicates,
        result.errors.len()
    );
    Ok(result)
}

// Data Export/Import

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupData {
    pub settings: Settings,
    pub trades: Vec<Trade>,
    pub export_date: String,
    pub version: String,
}

/// Export the journal settings and the user's trades to JSON.
pub fn export_all_data(db: &Database, user_id: i64) -> Result<String> {
    let conn = db.conn.lock()?;

    let settings = read_settings(&conn)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades WHERE user_id = ? ORDER BY id ASC",
        TRADE_COLUMNS
    ))?;
    let trades = stmt
        .query_map([user_id], map_row_to_trade)?
        .collect::<rusqlite::Result<Vec<Trade>>>()?;

    let backup = BackupData {
        settings,
        trades,
        export_date: Utc::now().to_rfc3339(),
        version: BACKUP_VERSION.to_string(),
    };

    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Restore a JSON backup for `user_id`. Settings are overwritten; trades are
/// added under new ids, skipping any the user already has.
pub fn import_all_data(db: &Database, user_id: i64, json_data: &str) -> Result<ImportResult> {
    let backup: BackupData = serde_json::from_str(json_data)?;

    let conn = db.conn.lock()?;
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "UPDATE settings SET page_size = ?, currency = ?, initial_capital = ?, default_date_range = ?, updated_at = ? WHERE id = 1",
        params![
            backup.settings.page_size,
            backup.settings.currency,
            backup.settings.initial_capital,
            backup.settings.default_date_range,
            Utc::now().timestamp(),
        ],
    )?;

    let mut result = ImportResult::default();
    let mut known = known_fingerprints(&tx, user_id)?;

    for trade in &backup.trades {
        let input = CreateTradeInput::from(trade);
        if input.date.trim().is_empty() {
            result.errors.push(format!("Trade {}: Missing date", trade.id));
            continue;
        }
        if insert_unless_known(&tx, user_id, &input, &mut known)? {
            result.imported += 1;
        } else {
            result.duplicates += 1;
        }
    }

    tx.commit()?;

    log::info!(
        "Backup {} restored for user {}: {} trades imported, {} duplicates",
        backup.version,
        user_id,
        result.imported,
        result.duplicates
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::settings::{get_settings, update_settings};
    use crate::commands::trades::{create_trade, get_trades};
    use crate::models::{TradeQuery, UpdateSettingsInput};

    const SAMPLE_CSV: &str = "\
date,symbol,setup,session,rrAchieved,profitLoss,isWin,extraColumn
3/14/2024 10:30 AM,NQ,OZEM,London,2R,\"$1,250.50\",win,ignored
2024-03-15,ES,BREAKER,NY,0,-90.35USD,no,
2024-03-16,NQ,,,,,,
";

    #[test]
    fn test_parse_numeric_value() {
        let parse = |raw: &str| parse_numeric_value("x", Some(raw.to_string()));
        assert_eq!(parse("$1,250.50"), Ok(Some(1250.5)));
        assert_eq!(parse("-90.35USD"), Ok(Some(-90.35)));
        assert_eq!(parse("2R"), Ok(Some(2.0)));
        assert_eq!(parse("0"), Ok(Some(0.0)));
        assert_eq!(parse("-$50"), Ok(Some(-50.0)));
        assert_eq!(parse("  "), Ok(None));
        assert!(parse("n/a").is_err());
    }

    #[test]
    fn test_parse_outcome() {
        assert_eq!(parse_outcome(Some("WIN".to_string())), Ok(Some(true)));
        assert_eq!(parse_outcome(Some("0".to_string())), Ok(Some(false)));
        assert_eq!(parse_outcome(None), Ok(None));
        assert!(parse_outcome(Some("maybe".to_string())).is_err());
    }

    #[test]
    fn test_import_csv() {
        let db = Database::open_in_memory().unwrap();
        let result = import_trades_csv(&db, 1, SAMPLE_CSV).unwrap();

        assert_eq!(result.imported, 3);
        assert_eq!(result.duplicates, 0);
        assert!(result.errors.is_empty(), "Unexpected errors: {:?}", result.errors);

        let trades = get_trades(&db, 1, &TradeQuery::default()).unwrap();
        assert_eq!(trades[0].profit_loss, Some(1250.5));
        assert_eq!(trades[0].rr_achieved, Some(2.0));
        assert_eq!(trades[0].is_win, Some(true));
        assert_eq!(trades[1].rr_achieved, Some(0.0), "Zero must be kept distinct from missing");
        assert_eq!(trades[1].is_win, Some(false));
        assert_eq!(trades[2].setup, None, "Blank cells import as missing");
        assert_eq!(trades[2].is_win, None);
    }

    #[test]
    fn test_reimport_counts_duplicates() {
        let db = Database::open_in_memory().unwrap();
        import_trades_csv(&db, 1, SAMPLE_CSV).unwrap();

        let again = import_trades_csv(&db, 1, SAMPLE_CSV).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.duplicates, 3);

        // Another user's journal is independent
        let other = import_trades_csv(&db, 2, SAMPLE_CSV).unwrap();
        assert_eq!(other.imported, 3);
    }

    #[test]
    fn test_bad_rows_are_reported_with_line_numbers() {
        let db = Database::open_in_memory().unwrap();
        let csv = "date,symbol,profitLoss,isWin\n2024-03-01,NQ,abc,win\n,ES,10,win\n2024-03-02,ES,10,loss\n";

        let result = import_trades_csv(&db, 1, csv).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("Line 2:"), "{}", result.errors[0]);
        assert!(result.errors[1].starts_with("Line 3:"), "{}", result.errors[1]);
    }

    #[test]
    fn test_backup_round_trip_into_another_user() {
        let db = Database::open_in_memory().unwrap();
        update_settings(&db, &UpdateSettingsInput { page_size: Some(20), ..Default::default() }).unwrap();
        create_trade(
            &db,
            1,
            &CreateTradeInput {
                date: "2024-03-01".to_string(),
                symbol: Some("NQ".to_string()),
                profit_loss: Some(150.0),
                ..Default::default()
            },
        )
        .unwrap();

        let json = export_all_data(&db, 1).unwrap();
        let backup: BackupData = serde_json::from_str(&json).unwrap();
        assert_eq!(backup.version, BACKUP_VERSION);
        assert_eq!(backup.trades.len(), 1);

        update_settings(&db, &UpdateSettingsInput { page_size: Some(5), ..Default::default() }).unwrap();
        let restored = import_all_data(&db, 2, &json).unwrap();
        assert_eq!(restored.imported, 1);
        assert_eq!(get_settings(&db).unwrap().page_size, 20);

        let trades = get_trades(&db, 2, &TradeQuery::default()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].user_id, 2);
        assert_eq!(trades[0].profit_loss, Some(150.0));
    }

    #[test]
    fn test_restoring_backup_over_same_user_skips_existing() {
        let db = Database::open_in_memory().unwrap();
        create_trade(
            &db,
            1,
            &CreateTradeInput { date: "2024-03-01".to_string(), ..Default::default() },
        )
        .unwrap();

        let json = export_all_data(&db, 1).unwrap();
        let restored = import_all_data(&db, 1, &json).unwrap();

        assert_eq!(restored.imported, 0);
        assert_eq!(restored.duplicates, 1);
        assert_eq!(get_trades(&db, 1, &TradeQuery::default()).unwrap().len(), 1);
    }
}
