pub mod notifier;
pub mod pagination;
pub mod table;

pub use notifier::{ChangeNotifier, FilterObserver, Notified};
pub use pagination::{page, page_count, PageInfo, Paginator};
pub use table::TradeTableView;
