use rusqlite::Connection;

use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{Settings, UpdateSettingsInput, DATE_RANGE_PRESETS};

pub fn get_settings(db: &Database) -> Result<Settings> {
    let conn = db.conn.lock()?;
    read_settings(&conn)
}

pub(crate) fn read_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT id, page_size, currency, initial_capital, default_date_range, created_at, updated_at FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                page_size: row.get(1)?,
                currency: row.get(2)?,
                initial_capital: row.get(3)?,
                default_date_range: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        },
    )?;

    Ok(settings)
}

pub fn update_settings(db: &Database, settings: &UpdateSettingsInput) -> Result<Settings> {
    if settings.page_size.is_some_and(|size| size < 1) {
        return Err(JournalError::InvalidInput("Page size must be at least 1".to_string()));
    }

    if let Some(range) = &settings.default_date_range {
        if !DATE_RANGE_PRESETS.contains(&range.as_str()) {
            return Err(JournalError::InvalidInput(format!(
                "Unknown date range '{}', expected one of {}",
                range,
                DATE_RANGE_PRESETS.join(", ")
            )));
        }
    }

    let conn = db.conn.lock()?;

    // Build dynamic UPDATE query
    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(val) = settings.page_size {
        updates.push("page_size = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = &settings.currency {
        updates.push("currency = ?");
        values.push(Box::new(val.clone()));
    }
    if let Some(val) = settings.initial_capital {
        updates.push("initial_capital = ?");
        values.push(Box::new(val));
    }
    if let Some(val) = &settings.default_date_range {
        updates.push("default_date_range = ?");
        values.push(Box::new(val.clone()));
    }

    updates.push("updated_at = strftime('%s', 'now')");

    let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

    conn.execute(&query, params.as_slice())?;

    read_settings(&conn)
}
