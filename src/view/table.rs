//! Host-facing trade table: owns the resident collection, the filter state,
//! the paginator and the change notifier.
//!
//! Every mutation is applied in full, then the whole collection is
//! re-evaluated, then the notifier sees the finished result.

use crate::error::{JournalError, Result};
use crate::filters::{evaluate, DateAnomaly, Dimension, FilterState, SerializedFilterState, SingleValue};
use crate::models::{CreateTradeInput, Settings, Trade, UpdateTradeInput};
use crate::stats::{summarize, TradeStats};
use crate::store::TradeStore;

use super::notifier::{ChangeNotifier, FilterObserver, Notified};
use super::pagination::{PageInfo, Paginator};

pub struct TradeTableView {
    user_id: i64,
    trades: Vec<Trade>,
    data_generation: u64,
    filters: FilterState,
    filtered: Vec<Trade>,
    anomalies: Vec<DateAnomaly>,
    paginator: Paginator,
    notifier: ChangeNotifier,
    observers: Vec<Box<dyn FilterObserver>>,
    load_error: Option<String>,
}

impl TradeTableView {
    pub fn new(user_id: i64, page_size: usize) -> Self {
        Self {
            user_id,
            trades: Vec::new(),
            data_generation: 0,
            filters: FilterState::new(),
            filtered: Vec::new(),
            anomalies: Vec::new(),
            paginator: Paginator::new(page_size),
            notifier: ChangeNotifier::new(),
            observers: Vec::new(),
            load_error: None,
        }
    }

    /// Table paged by the journal's configured page size.
    pub fn with_settings(user_id: i64, settings: &Settings) -> Self {
        Self::new(user_id, settings.effective_page_size())
    }

    /// Register an observer. Once a pass has run, the newcomer is handed the
    /// current state right away; existing observers are not called again.
    pub fn subscribe(&mut self, mut observer: Box<dyn FilterObserver>) {
        if self.notifier.has_baseline() {
            observer.on_filtered_trades_change(&self.filtered);
            observer.on_active_filters_change(&self.filters.serialize());
        }
        self.observers.push(observer);
    }

    /// Fetch the user's trades. On failure the table is emptied and the error
    /// is kept for the host to display.
    pub fn load(&mut self, store: &dyn TradeStore) -> Notified {
        match store.fetch_trades(self.user_id) {
            Ok(trades) => {
                log::info!("Loaded {} trades for user {}", trades.len(), self.user_id);
                self.load_error = None;
                self.replace_trades(trades)
            }
            Err(e) => {
                log::error!("Failed to load trades for user {}: {}", self.user_id, e);
                self.load_error = Some(e.to_string());
                self.replace_trades(Vec::new())
            }
        }
    }

    pub fn replace_trades(&mut self, trades: Vec<Trade>) -> Notified {
        self.trades = trades;
        self.data_generation += 1;
        self.refresh()
    }

    pub fn toggle(&mut self, dimension: impl Into<Dimension>, value: &str) -> Result<Notified> {
        self.filters.toggle(dimension, value)?;
        Ok(self.refresh())
    }

    pub fn set_single_value(&mut self, value: SingleValue) -> Result<Notified> {
        self.filters.set_single_value(value)?;
        Ok(self.refresh())
    }

    pub fn reset_filters(&mut self) -> Notified {
        self.filters.reset();
        self.refresh()
    }

    /// Replace the whole filter state, e.g. from a replicated description.
    pub fn apply_serialized_filters(&mut self, serialized: &SerializedFilterState) -> Result<Notified> {
        let rebuilt = FilterState::from_serialized(serialized)?;
        self.filters.assign(&rebuilt);
        Ok(self.refresh())
    }

    /// Re-run the full filter pass and notify observers of real changes.
    pub fn refresh(&mut self) -> Notified {
        let outcome = evaluate(&self.trades, &self.filters);
        self.filtered = outcome.trades;
        self.anomalies = outcome.anomalies;
        self.paginator.sync(self.filters.generation(), self.filtered.len());

        self.notifier.notify(
            self.filters.generation(),
            self.data_generation,
            &self.filtered,
            &self.filters.serialize(),
            &mut self.observers,
        )
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn filtered(&self) -> &[Trade] {
        &self.filtered
    }

    pub fn anomalies(&self) -> &[DateAnomaly] {
        &self.anomalies
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn stats(&self) -> TradeStats {
        summarize(&self.filtered)
    }

    pub fn current_page(&self) -> &[Trade] {
        self.paginator.slice(&self.filtered)
    }

    pub fn page_info(&self) -> PageInfo {
        self.paginator.info(self.filtered.len())
    }

    pub fn go_to_page(&mut self, page_number: usize) {
        self.paginator.go_to(page_number, self.filtered.len());
    }

    pub fn next_page(&mut self) {
        self.paginator.next(self.filtered.len());
    }

    pub fn previous_page(&mut self) {
        self.paginator.previous(self.filtered.len());
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.paginator.set_page_size(page_size);
    }

    /// Select a row of the current page and hand it to observers.
    pub fn select_row(&mut self, row: usize) -> Option<Trade> {
        let trade = self.current_page().get(row)?.clone();
        for observer in self.observers.iter_mut() {
            observer.on_trade_select(&trade);
        }
        Some(trade)
    }

    /// Persist a new trade and append it to the resident collection.
    pub fn add_trade(&mut self, store: &dyn TradeStore, input: &CreateTradeInput) -> Result<Trade> {
        let created = store.create_trade(self.user_id, input).inspect_err(|e| {
            log::error!("Creating trade for user {} failed: {}", self.user_id, e);
        })?;

        self.trades.push(created.clone());
        self.data_generation += 1;
        self.refresh();
        Ok(created)
    }

    /// Persist a partial update, then patch the resident copy.
    pub fn update_trade(
        &mut self,
        store: &dyn TradeStore,
        id: i64,
        update: &UpdateTradeInput,
    ) -> Result<Trade> {
        let updated = store.update_trade(self.user_id, id, update).inspect_err(|e| {
            log::error!("Update of trade {} failed: {}", id, e);
        })?;

        match self.trades.iter_mut().find(|t| t.id == id) {
            Some(slot) => *slot = updated.clone(),
            None => {
                log::warn!("Updated trade {} was not loaded; adding it to the table", id);
                self.trades.push(updated.clone());
            }
        }
        self.data_generation += 1;
        self.refresh();
        Ok(updated)
    }

    /// Irreversibly delete a trade. Nothing happens without `confirmed`.
    pub fn delete_trade(&mut self, store: &dyn TradeStore, id: i64, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(JournalError::ConfirmationRequired(id));
        }
        store.delete_trade(self.user_id, id).inspect_err(|e| {
            log::error!("Delete of trade {} failed: {}", id, e);
        })?;

        self.trades.retain(|t| t.id != id);
        self.data_generation += 1;
        self.refresh();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{CategoricalDimension, RangeDimension};
    use crate::view::notifier::tests::recorder;
    use std::cell::RefCell;

    /// In-memory store; `fail` makes every call error out.
    #[derive(Default)]
    struct MemoryStore {
        trades: RefCell<Vec<Trade>>,
        fail: bool,
    }

    impl TradeStore for MemoryStore {
        fn fetch_trades(&self, user_id: i64) -> Result<Vec<Trade>> {
            if self.fail {
                return Err(JournalError::InvalidInput("store offline".to_string()));
            }
            Ok(self.trades.borrow().iter().filter(|t| t.user_id == user_id).cloned().collect())
        }

        fn create_trade(&self, user_id: i64, input: &CreateTradeInput) -> Result<Trade> {
            let mut trades = self.trades.borrow_mut();
            let mut trade = Trade::new(trades.len() as i64 + 1, user_id, input.date.clone());
            trade.setup = input.setup.clone();
            trades.push(trade.clone());
            Ok(trade)
        }

        fn update_trade(&self, user_id: i64, id: i64, update: &UpdateTradeInput) -> Result<Trade> {
            if self.fail {
                return Err(JournalError::InvalidInput("store offline".to_string()));
            }
            let mut trades = self.trades.borrow_mut();
            let trade = trades
                .iter_mut()
                .find(|t| t.id == id && t.user_id == user_id)
                .ok_or(JournalError::TradeNotFound(id))?;
            update.apply_to(trade);
            Ok(trade.clone())
        }

        fn delete_trade(&self, user_id: i64, id: i64) -> Result<()> {
            if self.fail {
                return Err(JournalError::InvalidInput("store offline".to_string()));
            }
            let mut trades = self.trades.borrow_mut();
            let before = trades.len();
            trades.retain(|t| !(t.id == id && t.user_id == user_id));
            if trades.len() == before {
                return Err(JournalError::TradeNotFound(id));
            }
            Ok(())
        }
    }

    fn trade(id: i64, setup: &str, is_win: bool, rr: f64, pnl: f64) -> Trade {
        let mut t = Trade::new(id, 1, format!("2024-03-0{}T10:00:00", id));
        t.setup = Some(setup.to_string());
        t.is_win = Some(is_win);
        t.rr_achieved = Some(rr);
        t.profit_loss = Some(pnl);
        t
    }

    fn store() -> MemoryStore {
        let mut other_user = trade(4, "BREAKER", true, 5.0, 900.0);
        other_user.user_id = 2;
        MemoryStore {
            trades: RefCell::new(vec![
                trade(1, "BREAKER", true, 2.0, 150.0),
                trade(2, "OZEM", false, 1.0, -80.0),
                trade(3, "BREAKER", true, 3.0, 300.0),
                other_user,
            ]),
            fail: false,
        }
    }

    fn ids(trades: &[Trade]) -> Vec<i64> {
        trades.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_load_only_sees_own_trades() {
        let store = store();
        let mut view = TradeTableView::new(1, 10);
        view.load(&store);
        assert_eq!(ids(view.filtered()), vec![1, 2, 3]);
        assert!(view.load_error().is_none());
    }

    #[test]
    fn test_failed_load_leaves_empty_table_and_error() {
        let store = MemoryStore { fail: true, ..store() };
        let mut view = TradeTableView::new(1, 10);
        view.load(&store);
        assert!(view.filtered().is_empty());
        assert_eq!(view.stats(), TradeStats::default());
        assert!(view.load_error().unwrap().contains("store offline"));
    }

    #[test]
    fn test_filtering_updates_stats_and_observers() {
        let store = store();
        let (observers, calls) = recorder();
        let mut view = TradeTableView::new(1, 10);
        for observer in observers {
            view.subscribe(observer);
        }
        view.load(&store);

        view.toggle(CategoricalDimension::Setup, "BREAKER").unwrap();
        let stats = view.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.win_rate, 100.0);
        assert_eq!(stats.average_risk_reward, 2.5);
        assert_eq!(stats.total_profit_loss, 450.0);
        assert_eq!(stats.average_profit_loss, 225.0);

        assert_eq!(calls.borrow().trades, vec![vec![1, 2, 3], vec![1, 3]]);
        assert_eq!(calls.borrow().filters.len(), 2);

        // A redundant refresh must not notify again.
        view.refresh();
        assert_eq!(calls.borrow().trades.len(), 2);
        assert_eq!(calls.borrow().filters.len(), 2);
    }

    #[test]
    fn test_late_subscriber_does_not_renotify_existing_observers() {
        let (first, first_calls) = recorder();
        let (second, second_calls) = recorder();
        let mut view = TradeTableView::new(1, 10);
        for observer in first {
            view.subscribe(observer);
        }
        view.replace_trades(vec![trade(1, "BREAKER", true, 2.0, 150.0)]);

        for observer in second {
            view.subscribe(observer);
        }
        view.refresh();

        assert_eq!(first_calls.borrow().trades.len(), 1);
        assert_eq!(first_calls.borrow().filters.len(), 1);
        assert_eq!(second_calls.borrow().trades, vec![vec![1]], "Newcomer gets the current state once");
        assert_eq!(second_calls.borrow().filters.len(), 1);

        // Later changes reach both.
        view.toggle(CategoricalDimension::Setup, "OZEM").unwrap();
        assert_eq!(first_calls.borrow().trades.len(), 2);
        assert_eq!(second_calls.borrow().trades.len(), 2);
    }

    #[test]
    fn test_blank_toggle_is_rejected_and_keeps_rows() {
        let mut view = TradeTableView::new(1, 10);
        view.replace_trades(vec![trade(1, "BREAKER", true, 2.0, 150.0)]);

        let result = view.toggle(CategoricalDimension::Setup, "");
        assert!(matches!(result, Err(JournalError::InvalidFilter(_))));
        assert!(!view.filters().is_any_active());
        assert_eq!(ids(view.filtered()), vec![1]);
    }

    #[test]
    fn test_update_of_trade_missing_from_table_adds_it() {
        let store = store();
        let mut view = TradeTableView::new(1, 10);
        view.replace_trades(vec![]);

        let update = UpdateTradeInput {
            session: Some("NY".to_string()),
            ..Default::default()
        };
        let updated = view.update_trade(&store, 2, &update).unwrap();
        assert_eq!(updated.session.as_deref(), Some("NY"));
        assert_eq!(ids(view.trades()), vec![2], "A saved update must show up in the table");
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut trades = Vec::new();
        for id in 1..=25 {
            let mut t = Trade::new(id, 1, "2024-03-01");
            t.session = Some(if id % 2 == 0 { "London" } else { "Asia" }.to_string());
            trades.push(t);
        }
        let mut view = TradeTableView::new(1, 10);
        view.replace_trades(trades);
        view.go_to_page(3);
        assert_eq!(view.page_info().page, 3);
        assert_eq!(view.current_page().len(), 5);

        view.toggle(CategoricalDimension::Session, "London").unwrap();
        assert_eq!(view.page_info().page, 1);
        assert_eq!(view.page_info().total, 12);
        assert_eq!(view.current_page().len(), 10);
    }

    #[test]
    fn test_select_row_notifies_observers() {
        let store = store();
        let (observers, calls) = recorder();
        let mut view = TradeTableView::new(1, 2);
        for observer in observers {
            view.subscribe(observer);
        }
        view.load(&store);
        view.next_page();

        let selected = view.select_row(0).unwrap();
        assert_eq!(selected.id, 3);
        assert_eq!(calls.borrow().selected, vec![3]);
        assert!(view.select_row(5).is_none());
    }

    #[test]
    fn test_update_preserves_other_fields_and_refilters() {
        let store = store();
        let mut view = TradeTableView::new(1, 10);
        view.load(&store);
        view.toggle(RangeDimension::RiskReward, "3+").unwrap();
        assert_eq!(ids(view.filtered()), vec![3]);

        let update = UpdateTradeInput {
            rr_achieved: Some(4.0),
            ..Default::default()
        };
        let updated = view.update_trade(&store, 1, &update).unwrap();

        assert_eq!(updated.setup.as_deref(), Some("BREAKER"));
        assert_eq!(updated.profit_loss, Some(150.0));
        assert_eq!(ids(view.filtered()), vec![1, 3]);
    }

    #[test]
    fn test_add_trade_joins_filtered_set() {
        let store = store();
        let mut view = TradeTableView::new(1, 10);
        view.load(&store);
        view.toggle(CategoricalDimension::Setup, "OZEM").unwrap();

        let input = CreateTradeInput {
            date: "2024-03-09".to_string(),
            setup: Some("OZEM".to_string()),
            ..Default::default()
        };
        let created = view.add_trade(&store, &input).unwrap();

        assert_eq!(ids(view.filtered()), vec![2, created.id]);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let store = store();
        let mut view = TradeTableView::new(1, 10);
        view.load(&store);

        let result = view.delete_trade(&store, 2, false);
        assert!(matches!(result, Err(JournalError::ConfirmationRequired(2))));
        assert_eq!(view.trades().len(), 3);

        view.delete_trade(&store, 2, true).unwrap();
        assert_eq!(ids(view.trades()), vec![1, 3]);
        assert_eq!(store.fetch_trades(1).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_delete_keeps_resident_trade() {
        let store = MemoryStore { fail: true, ..store() };
        let mut view = TradeTableView::new(1, 10);
        view.replace_trades(vec![trade(1, "BREAKER", true, 2.0, 150.0)]);

        assert!(view.delete_trade(&store, 1, true).is_err());
        assert_eq!(view.trades().len(), 1);
    }

    #[test]
    fn test_apply_serialized_filters() {
        let store = store();
        let mut view = TradeTableView::new(1, 10);
        view.load(&store);

        let mut source = FilterState::new();
        source.set_single_value(SingleValue::Win(Some(false))).unwrap();
        view.apply_serialized_filters(&source.serialize()).unwrap();

        assert_eq!(ids(view.filtered()), vec![2]);
        assert_eq!(view.stats().distinct_setup_count, 1);
        assert!(view.filters().generation() > 0);
    }
}
