//! Finance tool catalog: curated tools over Sina and AKShare plus one
//! passthrough tool per AKShare function.

pub mod economic;
pub mod fund;
pub mod futures;
pub mod library;
pub mod sina;
pub mod stock;

use std::sync::Arc;

use serde_json::Value;

use crate::registry::ToolRegistry;

pub fn register_curated(registry: &mut ToolRegistry) {
    registry.register(Arc::new(stock::StockHistoricalTool));
    registry.register(Arc::new(stock::StockRealtimeTool));
    registry.register(Arc::new(stock::StockListTool));
    registry.register(Arc::new(stock::SearchStockTool));
    registry.register(Arc::new(fund::FundListTool));
    registry.register(Arc::new(fund::FundInfoTool));
    registry.register(Arc::new(futures::FuturesInfoTool));
    registry.register(Arc::new(economic::EconomicDataTool));
}

/// Digits of a date-like string, at most 8 (`2024-01-05` → `20240105`,
/// `2024年第1季度` → `20241`). Accepts `YYYYMMDD` or a four-digit year
/// followed by `-`, `/` or `年`; anything else is not a date.
pub(crate) fn date_key(s: &str) -> Option<String> {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let plausible_year = s[..4].parse::<u16>().map_or(false, |y| (1900..=2100).contains(&y));
    let compact = bytes.len() == 8 && bytes.iter().all(u8::is_ascii_digit) && plausible_year;
    let separated = s[4..].starts_with(&['-', '/', '年'][..]);
    if !compact && !separated {
        return None;
    }
    Some(
        s.chars()
            .take_while(|c| !matches!(c, 'T' | ' '))
            .filter(char::is_ascii_digit)
            .take(8)
            .collect(),
    )
}

/// Whether `date` falls within the optional inclusive bounds. Comparison is
/// on the common digit prefix, so a month key matches a day bound.
pub(crate) fn within_dates(date: &str, start: Option<&str>, end: Option<&str>) -> bool {
    let Some(key) = date_key(date) else {
        return true;
    };
    let cmp = |bound: &str| -> Option<std::cmp::Ordering> {
        let bound = date_key(bound)?;
        let n = key.len().min(bound.len());
        Some(key[..n].cmp(&bound[..n]))
    };
    let after_start = start.and_then(cmp).map_or(true, |o| o.is_ge());
    let before_end = end.and_then(cmp).map_or(true, |o| o.is_le());
    after_start && before_end
}

/// First string field of a record that looks like a date.
pub(crate) fn record_date(record: &Value) -> Option<&str> {
    record
        .as_object()?
        .values()
        .filter_map(Value::as_str)
        .find(|s| date_key(s).is_some())
}

/// Keep records whose date falls in range. Records without a date are kept.
pub(crate) fn filter_by_dates(payload: Value, start: Option<&str>, end: Option<&str>) -> Value {
    if start.is_none() && end.is_none() {
        return payload;
    }
    match payload {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|r| record_date(r).map_or(true, |d| within_dates(d, start, end)))
                .collect(),
        ),
        other => other,
    }
}
