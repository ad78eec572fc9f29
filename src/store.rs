use crate::commands::trades;
use crate::db::Database;
use crate::error::Result;
use crate::models::{CreateTradeInput, Trade, TradeQuery, UpdateTradeInput};

/// Trade supplier and persistence mutator consumed by the table view.
///
/// Every call is scoped to one user; implementations must never return or
/// touch another user's trades.
pub trait TradeStore {
    fn fetch_trades(&self, user_id: i64) -> Result<Vec<Trade>>;

    fn create_trade(&self, user_id: i64, input: &CreateTradeInput) -> Result<Trade>;

    fn update_trade(&self, user_id: i64, id: i64, update: &UpdateTradeInput) -> Result<Trade>;

    fn delete_trade(&self, user_id: i64, id: i64) -> Result<()>;
}

/// SQLite-backed store over the journal database.
pub struct SqliteTradeStore<'a> {
    db: &'a Database,
}

impl<'a> SqliteTradeStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl TradeStore for SqliteTradeStore<'_> {
    fn fetch_trades(&self, user_id: i64) -> Result<Vec<Trade>> {
        trades::get_trades(self.db, user_id, &TradeQuery::default())
    }

    fn create_trade(&self, user_id: i64, input: &CreateTradeInput) -> Result<Trade> {
        trades::create_trade(self.db, user_id, input)
    }

    fn update_trade(&self, user_id: i64, id: i64, update: &UpdateTradeInput) -> Result<Trade> {
        trades::update_trade(self.db, user_id, id, update)
    }

    fn delete_trade(&self, user_id: i64, id: i64) -> Result<()> {
        // Confirmation is collected by the caller before the intent reaches the store.
        trades::delete_trade(self.db, user_id, id, true)
    }
}
