use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// One logged trading decision.
///
/// Optional fields distinguish "not recorded" (`None`) from a recorded zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: i64,
    pub user_id: i64,
    pub date: String, // Raw date-time text as supplied by the source

    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub setup: Option<String>,
    #[serde(default)]
    pub main_trend: Option<String>, // M15
    #[serde(default)]
    pub internal_trend: Option<String>, // M5
    #[serde(default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub entry_level: Option<String>,
    #[serde(default)]
    pub liquidation: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub internal_trend_new: Option<String>,
    #[serde(default)]
    pub micro_trend: Option<String>,
    #[serde(default)]
    pub structure: Option<String>,
    #[serde(default)]
    pub timeframe_entry: Option<String>,
    #[serde(default)]
    pub unmit_zone: Option<String>,
    #[serde(default)]
    pub market_phase: Option<String>,
    #[serde(default)]
    pub sl_type: Option<String>,

    #[serde(default)]
    pub rr_achieved: Option<f64>,
    #[serde(default)]
    pub rr_potential: Option<f64>,
    #[serde(default)]
    pub profit_loss: Option<f64>,
    #[serde(default)]
    pub range_points: Option<f64>,
    #[serde(default)]
    pub sl_points: Option<f64>,
    #[serde(default)]
    pub risk_sum: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,

    #[serde(default)]
    pub is_win: Option<bool>,

    #[serde(default)]
    pub gpt_feedback: Option<String>,
    #[serde(default)]
    pub chart_image: Option<String>, // URL or data: URI

    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Trade {
    /// Empty trade shell with only identity and date set.
    pub fn new(id: i64, user_id: i64, date: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            date: date.into(),
            symbol: None,
            setup: None,
            main_trend: None,
            internal_trend: None,
            entry_type: None,
            entry_level: None,
            liquidation: None,
            location: None,
            account_type: None,
            session: None,
            trend: None,
            internal_trend_new: None,
            micro_trend: None,
            structure: None,
            timeframe_entry: None,
            unmit_zone: None,
            market_phase: None,
            sl_type: None,
            rr_achieved: None,
            rr_potential: None,
            profit_loss: None,
            range_points: None,
            sl_points: None,
            risk_sum: None,
            size: None,
            is_win: None,
            gpt_feedback: None,
            chart_image: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn chart_image_kind(&self) -> Option<ChartImage> {
        self.chart_image.as_deref().map(ChartImage::classify)
    }
}

/// Chart attachment, either linked or embedded as a base64 data URI.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartImage {
    Url(String),
    Embedded { mime_type: String, payload: String },
}

impl ChartImage {
    pub fn classify(raw: &str) -> Self {
        // "data:image/png;base64,iVBORw0..." → Embedded
        if let Some(rest) = raw.strip_prefix("data:") {
            if let Some((header, payload)) = rest.split_once(',') {
                if let Some(mime_type) = header.strip_suffix(";base64") {
                    return ChartImage::Embedded {
                        mime_type: mime_type.to_string(),
                        payload: payload.to_string(),
                    };
                }
            }
        }
        ChartImage::Url(raw.to_string())
    }

    /// Decoded bytes of an embedded image; `None` for URLs or corrupt payloads.
    pub fn decode(&self) -> Option<Vec<u8>> {
        match self {
            ChartImage::Url(_) => None,
            ChartImage::Embedded { payload, .. } => general_purpose::STANDARD.decode(payload).ok(),
        }
    }
}

/// Fields accepted when a trade is added manually or imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTradeInput {
    pub date: String,

    pub symbol: Option<String>,
    pub setup: Option<String>,
    pub main_trend: Option<String>,
    pub internal_trend: Option<String>,
    pub entry_type: Option<String>,
    pub entry_level: Option<String>,
    pub liquidation: Option<String>,
    pub location: Option<String>,
    pub account_type: Option<String>,
    pub session: Option<String>,
    pub trend: Option<String>,
    pub internal_trend_new: Option<String>,
    pub micro_trend: Option<String>,
    pub structure: Option<String>,
    pub timeframe_entry: Option<String>,
    pub unmit_zone: Option<String>,
    pub market_phase: Option<String>,
    pub sl_type: Option<String>,

    pub rr_achieved: Option<f64>,
    pub rr_potential: Option<f64>,
    pub profit_loss: Option<f64>,
    pub range_points: Option<f64>,
    pub sl_points: Option<f64>,
    pub risk_sum: Option<f64>,
    pub size: Option<f64>,

    pub is_win: Option<bool>,

    pub gpt_feedback: Option<String>,
    pub chart_image: Option<String>,
}

impl From<&Trade> for CreateTradeInput {
    fn from(trade: &Trade) -> Self {
        Self {
            date: trade.date.clone(),
            symbol: trade.symbol.clone(),
            setup: trade.setup.clone(),
            main_trend: trade.main_trend.clone(),
            internal_trend: trade.internal_trend.clone(),
            entry_type: trade.entry_type.clone(),
            entry_level: trade.entry_level.clone(),
            liquidation: trade.liquidation.clone(),
            location: trade.location.clone(),
            account_type: trade.account_type.clone(),
            session: trade.session.clone(),
            trend: trade.trend.clone(),
            internal_trend_new: trade.internal_trend_new.clone(),
            micro_trend: trade.micro_trend.clone(),
            structure: trade.structure.clone(),
            timeframe_entry: trade.timeframe_entry.clone(),
            unmit_zone: trade.unmit_zone.clone(),
            market_phase: trade.market_phase.clone(),
            sl_type: trade.sl_type.clone(),
            rr_achieved: trade.rr_achieved,
            rr_potential: trade.rr_potential,
            profit_loss: trade.profit_loss,
            range_points: trade.range_points,
            sl_points: trade.sl_points,
            risk_sum: trade.risk_sum,
            size: trade.size,
            is_win: trade.is_win,
            gpt_feedback: trade.gpt_feedback.clone(),
            chart_image: trade.chart_image.clone(),
        }
    }
}

/// Partial update. `None` means "leave untouched", never "reset".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTradeInput {
    pub date: Option<String>,

    pub symbol: Option<String>,
    pub setup: Option<String>,
    pub main_trend: Option<String>,
    pub internal_trend: Option<String>,
    pub entry_type: Option<String>,
    pub entry_level: Option<String>,
    pub liquidation: Option<String>,
    pub location: Option<String>,
    pub account_type: Option<String>,
    pub session: Option<String>,
    pub trend: Option<String>,
    pub internal_trend_new: Option<String>,
    pub micro_trend: Option<String>,
    pub structure: Option<String>,
    pub timeframe_entry: Option<String>,
    pub unmit_zone: Option<String>,
    pub market_phase: Option<String>,
    pub sl_type: Option<String>,

    pub rr_achieved: Option<f64>,
    pub rr_potential: Option<f64>,
    pub profit_loss: Option<f64>,
    pub range_points: Option<f64>,
    pub sl_points: Option<f64>,
    pub risk_sum: Option<f64>,
    pub size: Option<f64>,

    pub is_win: Option<bool>,

    pub gpt_feedback: Option<String>,
    pub chart_image: Option<String>,
}

macro_rules! patch_fields {
    ($update:expr, $trade:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$update.$field {
                $trade.$field = Some(value.clone());
            }
        )+
    };
}

impl UpdateTradeInput {
    /// Apply to an in-memory trade, touching only the provided fields.
    pub fn apply_to(&self, trade: &mut Trade) {
        if let Some(date) = &self.date {
            trade.date = date.clone();
        }
        patch_fields!(
            self, trade,
            symbol, setup, main_trend, internal_trend, entry_type, entry_level,
            liquidation, location, account_type, session, trend, internal_trend_new,
            micro_trend, structure, timeframe_entry, unmit_zone, market_phase, sl_type,
            rr_achieved, rr_potential, profit_loss, range_points, sl_points, risk_sum, size,
            is_win, gpt_feedback, chart_image,
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == UpdateTradeInput::default()
    }
}

/// SQL-side prefilter for trade listing; the full filter engine runs in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeQuery {
    pub symbol: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
