//! Propagates the filtered collection and the active filter description to
//! observers only when they actually change.
//!
//! A pass first compares generation counters; if neither the filter nor the
//! underlying data moved, nothing is serialized. Otherwise the new value is
//! compared to the last notified snapshot (length + SHA-256 of its JSON form).

use sha2::{Digest, Sha256};

use crate::filters::SerializedFilterState;
use crate::models::Trade;

/// Consumer of table changes (heatmaps, summary cards, detail views).
pub trait FilterObserver {
    fn on_filtered_trades_change(&mut self, trades: &[Trade]);

    fn on_active_filters_change(&mut self, filters: &SerializedFilterState);

    fn on_trade_select(&mut self, _trade: &Trade) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    len: usize,
    digest: String,
}

impl Snapshot {
    fn of<T: serde::Serialize + ?Sized>(value: &T, len: usize) -> Option<Self> {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                let mut hasher = Sha256::new();
                hasher.update(&bytes);
                Some(Self {
                    len,
                    digest: format!("{:x}", hasher.finalize()),
                })
            }
            Err(e) => {
                log::warn!("Could not snapshot value for change detection: {}", e);
                None
            }
        }
    }
}

/// Which callbacks a pass fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Notified {
    pub trades: bool,
    pub filters: bool,
}

#[derive(Debug, Default)]
pub struct ChangeNotifier {
    last_generations: Option<(u64, u64)>,
    last_trades: Option<Snapshot>,
    last_filters: Option<Snapshot>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify `observers` of whatever differs from the previous pass.
    ///
    /// `filter_generation` and `data_generation` must move whenever the filter
    /// state or the resident collection changes.
    pub fn notify(
        &mut self,
        filter_generation: u64,
        data_generation: u64,
        trades: &[Trade],
        filters: &SerializedFilterState,
        observers: &mut [Box<dyn FilterObserver>],
    ) -> Notified {
        let generations = (filter_generation, data_generation);
        if self.last_generations == Some(generations) {
            log::debug!("Notifier skipped: generations unchanged {:?}", generations);
            return Notified::default();
        }
        self.last_generations = Some(generations);

        let mut notified = Notified::default();

        let trades_snapshot = Snapshot::of(trades, trades.len());
        if trades_snapshot.is_none() || trades_snapshot != self.last_trades {
            for observer in observers.iter_mut() {
                observer.on_filtered_trades_change(trades);
            }
            self.last_trades = trades_snapshot;
            notified.trades = true;
        }

        let filters_snapshot = Snapshot::of(filters, 0);
        if filters_snapshot.is_none() || filters_snapshot != self.last_filters {
            for observer in observers.iter_mut() {
                observer.on_active_filters_change(filters);
            }
            self.last_filters = filters_snapshot;
            notified.filters = true;
        }

        log::debug!(
            "Notifier pass: {} trades, trades changed: {}, filters changed: {}",
            trades.len(),
            notified.trades,
            notified.filters
        );
        notified
    }

    /// Whether any pass has run yet. Before the first pass every observer
    /// will be notified anyway.
    pub fn has_baseline(&self) -> bool {
        self.last_generations.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::filters::{CategoricalDimension, FilterState};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub(crate) struct Calls {
        pub trades: Vec<Vec<i64>>,
        pub filters: Vec<SerializedFilterState>,
        pub selected: Vec<i64>,
    }

    /// Observer recording every callback into shared storage.
    pub(crate) struct Recorder(pub Rc<RefCell<Calls>>);

    impl FilterObserver for Recorder {
        fn on_filtered_trades_change(&mut self, trades: &[Trade]) {
            self.0.borrow_mut().trades.push(trades.iter().map(|t| t.id).collect());
        }

        fn on_active_filters_change(&mut self, filters: &SerializedFilterState) {
            self.0.borrow_mut().filters.push(filters.clone());
        }

        fn on_trade_select(&mut self, trade: &Trade) {
            self.0.borrow_mut().selected.push(trade.id);
        }
    }

    pub(crate) fn recorder() -> (Vec<Box<dyn FilterObserver>>, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let observers: Vec<Box<dyn FilterObserver>> = vec![Box::new(Recorder(calls.clone()))];
        (observers, calls)
    }

    fn trades(ids: &[i64]) -> Vec<Trade> {
        ids.iter().map(|id| Trade::new(*id, 1, "2024-03-01")).collect()
    }

    #[test]
    fn test_unchanged_pass_notifies_once() {
        let (mut observers, calls) = recorder();
        let mut notifier = ChangeNotifier::new();
        let filters = FilterState::new().serialize();
        let list = trades(&[1, 2]);

        let first = notifier.notify(0, 0, &list, &filters, &mut observers);
        let second = notifier.notify(0, 0, &list, &filters, &mut observers);

        assert_eq!(first, Notified { trades: true, filters: true });
        assert_eq!(second, Notified::default());
        assert_eq!(calls.borrow().trades.len(), 1);
        assert_eq!(calls.borrow().filters.len(), 1);
    }

    #[test]
    fn test_value_comparison_after_generation_bump() {
        let (mut observers, calls) = recorder();
        let mut notifier = ChangeNotifier::new();
        let filters = FilterState::new().serialize();
        let list = trades(&[1, 2]);

        notifier.notify(0, 0, &list, &filters, &mut observers);
        // Data generation moved but the collection is identical by value.
        let pass = notifier.notify(0, 1, &list.clone(), &filters, &mut observers);

        assert_eq!(pass, Notified::default());
        assert_eq!(calls.borrow().trades.len(), 1);
    }

    #[test]
    fn test_filter_change_with_same_result_updates_filters_only() {
        let (mut observers, calls) = recorder();
        let mut notifier = ChangeNotifier::new();
        let mut state = FilterState::new();
        let list = trades(&[1]);

        notifier.notify(state.generation(), 0, &list, &state.serialize(), &mut observers);
        state.toggle(CategoricalDimension::Session, "London").unwrap();
        let pass = notifier.notify(state.generation(), 0, &list, &state.serialize(), &mut observers);

        assert_eq!(pass, Notified { trades: false, filters: true });
        assert_eq!(calls.borrow().filters.len(), 2);
        assert_eq!(calls.borrow().filters[1].categories["session"], vec!["London"]);
    }

    #[test]
    fn test_changed_collection_notifies() {
        let (mut observers, calls) = recorder();
        let mut notifier = ChangeNotifier::new();
        let filters = FilterState::new().serialize();

        notifier.notify(0, 0, &trades(&[1, 2]), &filters, &mut observers);
        notifier.notify(0, 1, &trades(&[1, 3]), &filters, &mut observers);

        assert_eq!(calls.borrow().trades, vec![vec![1, 2], vec![1, 3]]);
    }

    #[test]
    fn test_baseline_exists_after_first_pass() {
        let (mut observers, _calls) = recorder();
        let mut notifier = ChangeNotifier::new();
        assert!(!notifier.has_baseline());

        notifier.notify(0, 0, &trades(&[1]), &FilterState::new().serialize(), &mut observers);
        assert!(notifier.has_baseline());
    }
}
