pub mod aggregator;

pub use aggregator::{
    average_profit_loss, average_risk_reward, count, distinct_setup_count, summarize,
    total_profit_loss, win_rate, TradeStats,
};
