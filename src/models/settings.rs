use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Accepted values of `Settings::default_date_range`.
pub const DATE_RANGE_PRESETS: [&str; 7] = ["all", "today", "week", "month", "3months", "6months", "year"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: i32,
    pub page_size: i64,
    pub currency: String,
    pub initial_capital: f64,
    pub default_date_range: String, // one of DATE_RANGE_PRESETS
    pub created_at: i64,
    pub updated_at: i64,
}

impl Settings {
    /// Page size usable by the paginator; non-positive values fall back to the default.
    pub fn effective_page_size(&self) -> usize {
        if self.page_size > 0 {
            self.page_size as usize
        } else {
            DEFAULT_PAGE_SIZE
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsInput {
    pub page_size: Option<i64>,
    pub currency: Option<String>,
    pub initial_capital: Option<f64>,
    pub default_date_range: Option<String>,
}
