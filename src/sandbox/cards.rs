//! Per-asset card models.
//!
//! Turns a validated snapshot into one `AssetCard` per current price:
//! formatted price, market badge, latest settlement per model and the
//! forward forecast with its trend. Nothing here touches markup.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::fmt;

use crate::types::{AiModel, Judgement, MarketStatus, Snapshot};

/// Moves within ±this many percent are reported as flat.
pub const TREND_DEAD_ZONE_PCT: Decimal = dec!(0.2);

/// The one asset quoted in dollars; everything else is in yen.
const DOLLAR_ASSET: &str = "S&P 500";

/// The one asset quoted to three decimals; everything else uses two.
const THREE_DECIMAL_ASSET: &str = "USD/JPY";

// ---------------------------------------------------------------------------
// Price formatting
// ---------------------------------------------------------------------------

pub fn currency_symbol(asset: &str) -> &'static str {
    if asset == DOLLAR_ASSET {
        "$"
    } else {
        "¥"
    }
}

pub fn price_decimals(asset: &str) -> u32 {
    if asset == THREE_DECIMAL_ASSET {
        3
    } else {
        2
    }
}

/// `¥38,500.00`, `$5,800.00`, `¥150.000`.
pub fn format_price(asset: &str, value: Decimal) -> String {
    format!(
        "{}{}",
        currency_symbol(asset),
        format_grouped(value, price_decimals(asset))
    )
}

/// Fixed-point with `,` thousands separators, rounding half away from zero.
pub fn format_grouped(value: Decimal, decimals: u32) -> String {
    let fixed = format_fixed(value, decimals);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Round and pad to exactly `decimals` places. Never yields `-0.00`.
fn format_fixed(value: Decimal, decimals: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    format!("{:.*}", decimals as usize, rounded)
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl TrendDirection {
    pub fn icon(&self) -> &'static str {
        match self {
            TrendDirection::Up => "▲",
            TrendDirection::Down => "▼",
            TrendDirection::Flat => "▶",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

/// Forecast versus current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Percentage change, rounded to two places.
    pub change_pct: Decimal,
}

impl Trend {
    /// `None` when the current price is zero or the change overflows.
    pub fn between(current: Decimal, forecast: Decimal) -> Option<Trend> {
        if current.is_zero() {
            return None;
        }
        let raw = forecast
            .checked_sub(current)?
            .checked_div(current)?
            .checked_mul(dec!(100))?;
        let mut change_pct = raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if change_pct.is_zero() {
            change_pct = Decimal::ZERO;
        }

        // Classified on the rounded value so label and figure agree.
        let direction = if change_pct > TREND_DEAD_ZONE_PCT {
            TrendDirection::Up
        } else if change_pct < -TREND_DEAD_ZONE_PCT {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        };

        Some(Trend {
            direction,
            change_pct,
        })
    }

    /// `+1.00%`, `-1.33%`, `0.00%`.
    pub fn formatted_pct(&self) -> String {
        let figure = format_fixed(self.change_pct, 2);
        if self.change_pct.is_sign_positive() && !self.change_pct.is_zero() {
            format!("+{figure}%")
        } else {
            format!("{figure}%")
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.formatted_pct())
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Latest settled record per (asset, model).
///
/// The feed sometimes repeats a record; the one with the latest date
/// wins, and among equal dates the one later in the feed. Undated
/// records are skipped.
pub fn latest_settlements(records: &[Judgement]) -> HashMap<(&str, AiModel), &Judgement> {
    let mut latest: HashMap<(&str, AiModel), &Judgement> = HashMap::new();
    for record in records.iter().filter(|r| r.is_settled() && r.date.is_some()) {
        let Some(model) = record.model() else {
            continue;
        };
        let key = (record.asset_name.as_str(), model);
        match latest.get(&key) {
            Some(existing) if existing.date > record.date => {}
            _ => {
                latest.insert(key, record);
            }
        }
    }
    latest
}

/// One model's settled result for an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementResult {
    pub date: NaiveDate,
    /// `direction_correct`; `None` when the feed left it out.
    pub hit: Option<bool>,
    pub error_rate: Option<Decimal>,
    pub predicted: Option<Decimal>,
    pub actual: Option<Decimal>,
}

impl SettlementResult {
    /// `None` for a record without a settlement date.
    pub fn from_judgement(j: &Judgement) -> Option<Self> {
        Some(Self {
            date: j.date?,
            hit: j.direction_correct,
            error_rate: j.error_rate,
            predicted: j.predicted_price,
            actual: j.actual_price,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRow {
    pub model: AiModel,
    pub result: Option<SettlementResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementView {
    /// No settled record for any model yet.
    Accumulating,
    /// One row per model, in `AiModel::ALL` order.
    Settled(Vec<SettlementRow>),
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRow {
    pub model: AiModel,
    pub predicted: Option<Decimal>,
    pub trend: Option<Trend>,
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCard {
    pub asset: String,
    pub current: Decimal,
    pub market: MarketStatus,
    pub settlement: SettlementView,
    pub forecasts: Vec<ForecastRow>,
}

impl AssetCard {
    pub fn current_display(&self) -> String {
        format_price(&self.asset, self.current)
    }

    pub fn price_display(&self, value: Decimal) -> String {
        format_price(&self.asset, value)
    }

    pub fn forecast(&self, model: AiModel) -> Option<&ForecastRow> {
        self.forecasts.iter().find(|f| f.model == model)
    }
}

/// One card per asset in `current_prices`, in feed order.
pub fn build_cards(snapshot: &Snapshot) -> Vec<AssetCard> {
    let settlements = latest_settlements(&snapshot.today_judgement);

    snapshot
        .current_prices()
        .iter()
        .map(|(asset, current)| {
            let rows: Vec<SettlementRow> = AiModel::ALL
                .iter()
                .map(|model| SettlementRow {
                    model: *model,
                    result: settlements
                        .get(&(asset, *model))
                        .and_then(|j| SettlementResult::from_judgement(j)),
                })
                .collect();
            let settlement = if rows.iter().all(|r| r.result.is_none()) {
                SettlementView::Accumulating
            } else {
                SettlementView::Settled(rows)
            };

            let forecasts = AiModel::ALL
                .iter()
                .map(|model| {
                    let predicted = snapshot.forecast(*model).and_then(|t| t.get(asset));
                    ForecastRow {
                        model: *model,
                        predicted,
                        trend: predicted.and_then(|p| Trend::between(current, p)),
                    }
                })
                .collect();

            AssetCard {
                asset: asset.to_string(),
                current,
                market: snapshot.market_status(asset),
                settlement,
                forecasts,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
