//! Trade journal core: per-user trade storage, a multi-dimensional filter
//! engine over the resident trade collection, derived statistics and a
//! paginated, change-notifying table view.

pub mod commands;
pub mod db;
pub mod error;
pub mod filters;
pub mod models;
pub mod stats;
pub mod store;
pub mod view;

use std::path::Path;

pub use db::Database;
pub use error::{JournalError, Result};
pub use store::{SqliteTradeStore, TradeStore};
pub use view::TradeTableView;

pub const DATABASE_FILE: &str = "trading_journal.db";

/// Open (creating and migrating as needed) the journal database inside `app_dir`.
pub fn open_journal(app_dir: &Path) -> Result<Database> {
    std::fs::create_dir_all(app_dir).map_err(|e| {
        JournalError::InvalidInput(format!("Cannot create {}: {}", app_dir.display(), e))
    })?;

    let db_path = app_dir.join(DATABASE_FILE);
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| JournalError::InvalidInput(format!("Non UTF-8 path: {}", db_path.display())))?;
    log::info!("Database path: {}", db_path_str);

    Database::new(db_path_str).inspect_err(|e| {
        log::error!("Database initialization failed: {}", e);
        log::error!("This might be due to a failed migration or database corruption.");
        log::error!("Backups are located at: {}", app_dir.join("backups").display());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::settings::get_settings;
    use crate::filters::CategoricalDimension;
    use crate::models::CreateTradeInput;

    #[test]
    fn test_open_journal_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();

        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("journal");
        let db = open_journal(&app_dir).unwrap();
        assert!(app_dir.join(DATABASE_FILE).exists());

        let store = SqliteTradeStore::new(&db);
        for (date, session) in [("2024-03-01", "London"), ("2024-03-02", "NY")] {
            store
                .create_trade(
                    1,
                    &CreateTradeInput {
                        date: date.to_string(),
                        session: Some(session.to_string()),
                        is_win: Some(true),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        let mut table = TradeTableView::with_settings(1, &get_settings(&db).unwrap());
        table.load(&store);
        table.toggle(CategoricalDimension::Session, "London").unwrap();

        assert_eq!(table.filtered().len(), 1);
        assert_eq!(table.stats().win_rate, 100.0);
    }
}
