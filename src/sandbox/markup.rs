//! HTML emission for asset cards and mount-point states.
//!
//! All feed-supplied text passes through [`escape`].

use std::borrow::Cow;
use std::fmt::Write;

use super::cards::{AssetCard, ForecastRow, SettlementRow, SettlementView};

pub const ACCUMULATING_TEXT: &str = "Data accumulating... results appear after the first settlement.";
pub const LOADING_HTML: &str = r#"<p class="loading-msg">Loading predictions...</p>"#;
pub const ERROR_HTML: &str =
    r#"<p class="loading-msg error">Data Syncing... Please wait for the next update.</p>"#;

/// Placeholder for any value the feed did not supply.
pub const NO_DATA: &str = "--";

/// Escape text for HTML element and attribute context.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Markup for a full card grid.
pub fn render_cards(cards: &[AssetCard]) -> String {
    cards.iter().map(render_card).collect()
}

pub fn render_card(card: &AssetCard) -> String {
    let mut html = String::with_capacity(2048);
    let asset = escape(&card.asset);

    let _ = write!(
        html,
        r#"<div class="asset-card" data-asset="{asset}"><div class="asset-header"><span class="asset-name">{asset}</span>"#
    );

    let (badge_class, badge_text) = if card.market.is_open {
        ("open", "OPEN")
    } else {
        ("closed", "CLOSED")
    };
    let _ = write!(html, r#"<span class="market-badge {badge_class}">{badge_text}"#);
    if !card.market.message.is_empty() {
        let _ = write!(
            html,
            r#" <small class="market-message">{}</small>"#,
            escape(&card.market.message)
        );
    }
    html.push_str("</span>");

    let _ = write!(
        html,
        r#"<span class="current-price">NOW: {}</span></div>"#,
        escape(&card.current_display())
    );

    render_settlement(&mut html, card);
    render_forecasts(&mut html, card);

    html.push_str("</div>");
    html
}

fn render_settlement(html: &mut String, card: &AssetCard) {
    html.push_str(r#"<div class="settlement"><div class="section-title">LAST RESULT</div>"#);
    match &card.settlement {
        SettlementView::Accumulating => {
            let _ = write!(html, r#"<p class="accumulating">{ACCUMULATING_TEXT}</p>"#);
        }
        SettlementView::Settled(rows) => {
            for row in rows {
                render_settlement_row(html, card, row);
            }
        }
    }
    html.push_str("</div>");
}

fn render_settlement_row(html: &mut String, card: &AssetCard, row: &SettlementRow) {
    let _ = write!(
        html,
        r#"<div class="settle-row {}-row"><span class="ai-label">{}</span>"#,
        row.model.id_prefix(),
        row.model.display_name()
    );

    match &row.result {
        None => {
            let _ = write!(html, r#"<span class="verdict none">{NO_DATA}</span>"#);
        }
        Some(result) => {
            let (class, label) = match result.hit {
                Some(true) => ("hit", "HIT"),
                Some(false) => ("miss", "MISS"),
                None => ("none", NO_DATA),
            };
            let error = result
                .error_rate
                .map(|e| format!("{}%", super::cards::format_grouped(e, 2)))
                .unwrap_or_else(|| NO_DATA.to_string());
            let predicted = result
                .predicted
                .map(|p| card.price_display(p))
                .unwrap_or_else(|| NO_DATA.to_string());
            let actual = result
                .actual
                .map(|p| card.price_display(p))
                .unwrap_or_else(|| NO_DATA.to_string());

            let _ = write!(
                html,
                r#"<span class="verdict {class}">{label}</span><span class="error-rate">ERR {}</span><span class="prices">{} &rarr; {}</span><small class="settled-on">{}</small>"#,
                escape(&error),
                escape(&predicted),
                escape(&actual),
                result.date.format("%Y-%m-%d"),
            );
        }
    }
    html.push_str("</div>");
}

fn render_forecasts(html: &mut String, card: &AssetCard) {
    html.push_str(r#"<div class="forecast"><div class="section-title">FORECAST</div>"#);
    for row in &card.forecasts {
        render_forecast_row(html, card, row);
    }
    html.push_str("</div>");
}

fn render_forecast_row(html: &mut String, card: &AssetCard, row: &ForecastRow) {
    let value = row
        .predicted
        .map(|p| card.price_display(p))
        .unwrap_or_else(|| NO_DATA.to_string());

    let _ = write!(
        html,
        r#"<div class="prediction-row {}-row"><div class="ai-label">{}</div><div class="pred-data"><span class="pred-val">{}</span>"#,
        row.model.id_prefix(),
        row.model.display_name(),
        escape(&value),
    );

    match row.trend {
        Some(trend) => {
            let _ = write!(
                html,
                r#"<span class="trend {}">{} {}</span>"#,
                trend.direction,
                trend.direction.icon(),
                trend.formatted_pct(),
            );
        }
        None => {
            let _ = write!(html, r#"<span class="trend none">{NO_DATA}</span>"#);
        }
    }
    html.push_str("</div></div>");
}
