//! Shared types for the EnzoWorks site service.
//!
//! The prediction snapshot is produced by an external job and is
//! read-only here. Everything in it is optional at the serde level so a
//! thin or partially broken feed still deserializes; structural checks
//! happen in [`Snapshot::validate`] and missing values surface as
//! placeholders during rendering.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// Forecasting models
// ---------------------------------------------------------------------------

/// The two models whose forecasts are compared on the sandbox page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiModel {
    Gpt,
    Gemini,
}

impl AiModel {
    /// Render order on the page.
    pub const ALL: &'static [AiModel] = &[AiModel::Gpt, AiModel::Gemini];

    /// Key of this model's forecast map inside `latest_forecast`.
    pub fn forecast_key(&self) -> &'static str {
        match self {
            AiModel::Gpt => "GPT",
            AiModel::Gemini => "Gemini",
        }
    }

    /// Name used in `overall_stats` and `today_judgement[].ai_model`.
    pub fn display_name(&self) -> &'static str {
        match self {
            AiModel::Gpt => "GPT-3.5",
            AiModel::Gemini => "Gemini",
        }
    }

    /// Prefix of the page element ids that carry this model's stats.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            AiModel::Gpt => "gpt",
            AiModel::Gemini => "gemini",
        }
    }

    /// Resolve a model from the name a judgement record carries.
    /// Accepts either the display name or the forecast key, ignoring case.
    pub fn from_record_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|m| {
            name.eq_ignore_ascii_case(m.display_name()) || name.eq_ignore_ascii_case(m.forecast_key())
        })
    }
}

impl fmt::Display for AiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Price tables
// ---------------------------------------------------------------------------

/// Asset name → price, in feed order.
///
/// JSON objects are unordered to serde's `HashMap`, but the page lists
/// assets in the order the feed wrote them, so entries are kept as a
/// vector. `null` prices are dropped on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable(Vec<(String, Decimal)>);

impl PriceTable {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the price for `asset`, keeping its original position.
    pub fn insert(&mut self, asset: impl Into<String>, price: Decimal) {
        let asset = asset.into();
        match self.0.iter_mut().find(|(name, _)| *name == asset) {
            Some(entry) => entry.1 = price,
            None => self.0.push((asset, price)),
        }
    }

    pub fn get(&self, asset: &str) -> Option<Decimal> {
        self.0
            .iter()
            .find(|(name, _)| name == asset)
            .map(|(_, price)| *price)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(name, price)| (name.as_str(), *price))
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut table = PriceTable::new();
        for (asset, price) in iter {
            table.insert(asset, price);
        }
        table
    }
}

impl<'de> Deserialize<'de> for PriceTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceTableVisitor;

        impl<'de> Visitor<'de> for PriceTableVisitor {
            type Value = PriceTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of asset name to price")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PriceTable, A::Error> {
                let mut table = PriceTable::new();
                while let Some((asset, price)) = access.next_entry::<String, Option<Decimal>>()? {
                    if let Some(price) = price {
                        table.insert(asset, price);
                    }
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(PriceTableVisitor)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The `ai_predictions.json` document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub overall_stats: HashMap<String, ModelStats>,
    #[serde(default)]
    pub latest_forecast: LatestForecast,
    #[serde(default, deserialize_with = "lenient_judgements")]
    pub today_judgement: Vec<Judgement>,
    #[serde(default)]
    pub market_status: HashMap<String, MarketStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub target_date: Option<String>,
}

/// Aggregate accuracy of one model across all settled predictions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelStats {
    /// Percentage of predictions whose direction was right.
    #[serde(default)]
    pub win_rate: Option<Decimal>,
    /// Mean absolute error, in percent.
    #[serde(default)]
    pub avg_error: Option<Decimal>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Current prices plus one forecast map per known model. Any other key
/// the predictor writes alongside them is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawLatestForecast")]
pub struct LatestForecast {
    pub current_prices: Option<PriceTable>,
    /// Keyed by `AiModel::forecast_key`.
    pub forecasts: HashMap<String, PriceTable>,
}

#[derive(Deserialize)]
struct RawLatestForecast {
    #[serde(default)]
    current_prices: Option<PriceTable>,
    #[serde(flatten)]
    rest: HashMap<String, serde_json::Value>,
}

impl TryFrom<RawLatestForecast> for LatestForecast {
    type Error = serde_json::Error;

    fn try_from(raw: RawLatestForecast) -> Result<Self, Self::Error> {
        let mut forecasts = HashMap::new();
        for model in AiModel::ALL {
            let key = model.forecast_key();
            match raw.rest.get(key) {
                None | Some(serde_json::Value::Null) => {}
                Some(value) => {
                    forecasts.insert(key.to_string(), PriceTable::deserialize(value)?);
                }
            }
        }
        Ok(Self {
            current_prices: raw.current_prices,
            forecasts,
        })
    }
}

/// Settlement state of a past prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgementStatus {
    Settled,
    #[default]
    Pending,
    #[serde(other)]
    Unknown,
}

/// A past prediction compared with the realised price.
#[derive(Debug, Clone, Deserialize)]
pub struct Judgement {
    pub asset_name: String,
    pub ai_model: String,
    /// Settlement date; pending records often have none yet.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: JudgementStatus,
    #[serde(default)]
    pub direction_correct: Option<bool>,
    /// Absolute error of the prediction, in percent.
    #[serde(default)]
    pub error_rate: Option<Decimal>,
    #[serde(default)]
    pub predicted_price: Option<Decimal>,
    #[serde(default)]
    pub actual_price: Option<Decimal>,
}

/// Decode each record on its own and drop the ones that don't fit, so a
/// single bad record costs only its own settlement row.
fn lenient_judgements<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Judgement>, D::Error> {
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match Judgement::deserialize(value) {
            Ok(judgement) => Some(judgement),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable judgement record");
                None
            }
        })
        .collect())
}

impl Judgement {
    pub fn is_settled(&self) -> bool {
        self.status == JudgementStatus::Settled
    }

    pub fn model(&self) -> Option<AiModel> {
        AiModel::from_record_name(&self.ai_model)
    }
}

/// Trading-session indicator for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarketStatus {
    #[serde(default = "market_open_default")]
    pub is_open: bool,
    #[serde(default)]
    pub message: String,
}

fn market_open_default() -> bool {
    true
}

impl Default for MarketStatus {
    fn default() -> Self {
        Self {
            is_open: true,
            message: String::new(),
        }
    }
}

impl Snapshot {
    /// Check the keys the renderer cannot do without.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.latest_forecast.current_prices.is_none() {
            return Err(FeedError::Shape(
                "latest_forecast.current_prices is missing".to_string(),
            ));
        }
        for model in AiModel::ALL {
            if self.forecast(*model).is_none() {
                return Err(FeedError::Shape(format!(
                    "latest_forecast.{} is missing",
                    model.forecast_key()
                )));
            }
        }
        Ok(())
    }

    /// Current prices; empty if the feed has none.
    pub fn current_prices(&self) -> &PriceTable {
        static EMPTY: PriceTable = PriceTable(Vec::new());
        self.latest_forecast.current_prices.as_ref().unwrap_or(&EMPTY)
    }

    pub fn forecast(&self, model: AiModel) -> Option<&PriceTable> {
        self.latest_forecast.forecasts.get(model.forecast_key())
    }

    /// Aggregate stats, looked up by display name and then by forecast key.
    pub fn stats(&self, model: AiModel) -> Option<&ModelStats> {
        self.overall_stats
            .get(model.display_name())
            .or_else(|| self.overall_stats.get(model.forecast_key()))
    }

    /// Session status for an asset; open when the feed says nothing.
    pub fn market_status(&self, asset: &str) -> MarketStatus {
        self.market_status.get(asset).cloned().unwrap_or_default()
    }

    /// Snapshot used across unit tests.
    #[cfg(test)]
    pub fn sample() -> Self {
        serde_json::from_str(SAMPLE_SNAPSHOT_JSON).expect("sample snapshot parses")
    }
}

#[cfg(test)]
pub const SAMPLE_SNAPSHOT_JSON: &str = r#"{
    "metadata": { "last_updated": "2026-10-16 07:00:00", "target_date": "2026-10-21" },
    "overall_stats": {
        "GPT-3.5": { "win_rate": 55.0, "avg_error": 1.2, "count": 40 },
        "Gemini": { "win_rate": 60.5, "avg_error": 0.9, "count": 40 }
    },
    "latest_forecast": {
        "current_prices": { "USD/JPY": 150.0, "Nikkei 225": 38500.0, "S&P 500": 5800.0 },
        "GPT": { "USD/JPY": 151.5, "Nikkei 225": 38692.5, "S&P 500": 5800.0 },
        "Gemini": { "USD/JPY": 148.0, "Nikkei 225": 38500.0, "S&P 500": 5829.0 }
    },
    "today_judgement": [
        {
            "asset_name": "Nikkei 225", "ai_model": "GPT-3.5", "date": "2026-10-15",
            "status": "settled", "direction_correct": true, "error_rate": 0.42,
            "predicted_price": 38400.0, "actual_price": 38561.28
        },
        {
            "asset_name": "Nikkei 225", "ai_model": "Gemini", "date": "2026-10-15",
            "status": "settled", "direction_correct": false, "error_rate": 1.1,
            "predicted_price": 38137.0, "actual_price": 38561.28
        }
    ],
    "market_status": {
        "Nikkei 225": { "is_open": false, "message": "Closed for holiday" }
    }
}"#;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure of a generative-language provider call.
///
/// Carries full diagnostic detail for logs; callers of the chat endpoint
/// only ever see a generic message.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned no generated text")]
    Empty { provider: &'static str },
}

/// Failure to obtain a usable snapshot. All variants render the same way.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Snapshot request failed: {0}")]
    Transport(String),

    #[error("Snapshot request returned HTTP {0}")]
    Status(u16),

    #[error("Snapshot read failed ({path}): {message}")]
    Io { path: String, message: String },

    #[error("Snapshot could not be decoded: {0}")]
    Decode(String),

    #[error("Snapshot is missing required data: {0}")]
    Shape(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
