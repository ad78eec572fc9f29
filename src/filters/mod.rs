pub mod dates;
pub mod dimension;
pub mod evaluator;
pub mod state;

pub use dates::{parse_trade_date, DateRange};
pub use dimension::{Bucket, CategoricalDimension, Dimension, RangeDimension};
pub use evaluator::{evaluate, matches, DateAnomaly, FilterOutcome};
pub use state::{FilterState, SerializedFilterState, SingleValue};
