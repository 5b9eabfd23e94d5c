//! Shapes raw upstream payloads into stable JSON.
//!
//! The Sina feeds are undocumented plain-text formats, so every parser here is
//! a pure function over a literal input and degrades by dropping what it
//! cannot read instead of failing the call.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static QUOTED_PAYLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"="([^"]*)""#).expect("quoted payload regex is valid")
});

/// How a successful adapter payload should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Already structured JSON; only cleaned.
    Json,
    /// `code,name` lines.
    Listing,
    /// `code,name[,type]` lines.
    FundListing,
    /// A JSON array embedded somewhere in a larger text body.
    BracketLiteral,
    /// `var hq_str_xxx="f0,f1,...";` quote line.
    RealtimeQuote,
    /// `var suggestvalue="a,b,c,...;...";` suggestion list.
    SearchSuggestions,
}

/// Apply `format` if the payload is still raw text, then clean it.
///
/// Structured payloads are only cleaned, so running this twice is a no-op.
pub fn normalize_payload(format: PayloadFormat, payload: Value) -> Value {
    let shaped = match (format, payload) {
        (PayloadFormat::Json, value) => value,
        (format, Value::String(text)) => parse_text(format, &text),
        (_, value) => value,
    };
    clean_value(shaped)
}

fn parse_text(format: PayloadFormat, text: &str) -> Value {
    match format {
        PayloadFormat::Json => Value::String(text.to_string()),
        PayloadFormat::Listing => to_json(parse_listing(text)),
        PayloadFormat::FundListing => to_json(parse_fund_listing(text, "ETF")),
        PayloadFormat::BracketLiteral => extract_bracket_literal(text),
        PayloadFormat::RealtimeQuote => parse_realtime_quote(text).map(to_json).unwrap_or(Value::Null),
        PayloadFormat::SearchSuggestions => to_json(parse_search_suggestions(text)),
    }
}

fn to_json<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ─── Line listings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub code: String,
    pub name: String,
}

/// Parse `code,name` lines. Lines without both fields are dropped.
pub fn parse_listing(text: &str) -> Vec<ListingRecord> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split(',');
            let code = parts.next()?.trim();
            let name = parts.next()?.trim();
            if code.is_empty() || name.is_empty() {
                return None;
            }
            Some(ListingRecord {
                code: code.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundRecord {
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub fund_type: String,
}

/// Parse `code,name[,type]` lines; a missing type becomes `default_type`.
pub fn parse_fund_listing(text: &str, default_type: &str) -> Vec<FundRecord> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split(',');
            let code = parts.next()?.trim();
            let name = parts.next()?.trim();
            if code.is_empty() || name.is_empty() {
                return None;
            }
            let fund_type = parts
                .next()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(default_type);
            Some(FundRecord {
                code: code.to_string(),
                name: name.to_string(),
                fund_type: fund_type.to_string(),
            })
        })
        .collect()
}

// ─── Embedded JSON ──────────────────────────────────────────────────────────

/// Parse the array between the first `[` and its matching `]`.
///
/// Brackets inside string literals are skipped. Anything unparseable yields an
/// empty array.
pub fn extract_bracket_literal(text: &str) -> Value {
    let empty = Value::Array(Vec::new());
    let Some(start) = text.find('[') else {
        return empty;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset);
                    break;
                }
            }
            _ => {}
        }
    }

    match end {
        Some(end) => match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(value @ Value::Array(_)) => value,
            _ => empty,
        },
        None => empty,
    }
}

// ─── Real-time quote line ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRecord {
    pub name: String,
    pub open: f64,
    pub previous_close: f64,
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub amount: f64,
    /// `price - previous_close`.
    pub change: f64,
    /// Percent change against the previous close; 0 without one.
    #[serde(rename = "changePercent")]
    pub change_percent: f64,
    /// Quote date and time as `YYYY-MM-DDTHH:MM:SS`, empty when the line
    /// carries neither.
    pub time: String,
}

pub(crate) fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}

/// Parse the first `var hq_str_...="..."` line.
///
/// Field positions: 0 name, 1 open, 2 previous close, 3 price, 4 high, 5 low,
/// 8 volume, 9 amount, 30 date, 31 time. Unreadable numbers become 0.
/// Returns `None` when no quote line is present or the quoted payload is
/// empty (unknown symbol).
pub fn parse_realtime_quote(text: &str) -> Option<QuoteRecord> {
    let line = text.lines().find(|l| l.contains("hq_str_"))?;
    let payload = QUOTED_PAYLOAD.captures(line)?.get(1)?.as_str();
    if payload.trim().is_empty() {
        return None;
    }
    let values: Vec<&str> = payload.split(',').collect();
    let num = |i: usize| -> f64 {
        values
            .get(i)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    };
    let text_at = |i: usize| values.get(i).map(|v| v.trim()).unwrap_or_default();
    let volume = num(8);
    let (price, previous_close) = (num(3), num(2));
    let change_percent = if previous_close > 0.0 {
        round_to((price - previous_close) / previous_close * 100.0, 2)
    } else {
        0.0
    };
    let time = match (text_at(30), text_at(31)) {
        ("", _) => String::new(),
        (date, "") => date.to_string(),
        (date, clock) => format!("{}T{}", date, clock),
    };
    Some(QuoteRecord {
        name: text_at(0).to_string(),
        open: num(1),
        previous_close,
        price,
        high: num(4),
        low: num(5),
        volume: if volume > 0.0 { volume as u64 } else { 0 },
        amount: num(9),
        change: round_to(price - previous_close, 3),
        change_percent,
        time,
    })
}

// ─── Search suggestions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRecord {
    pub code: String,
    pub name: String,
    pub market: String,
}

/// Parse `="name,type,code,symbol,...;..."`. Entries with fewer than three
/// fields are dropped. The market is the symbol prefix (`sh600000` → `sh`)
/// when a symbol is present, otherwise the type field.
pub fn parse_search_suggestions(text: &str) -> Vec<SearchRecord> {
    let Some(payload) = QUOTED_PAYLOAD.captures(text).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    payload
        .as_str()
        .split(';')
        .filter_map(|item| {
            let parts: Vec<&str> = item.split(',').map(str::trim).collect();
            if parts.len() < 3 || parts[0].is_empty() || parts[2].is_empty() {
                return None;
            }
            let market = parts
                .get(3)
                .filter(|s| s.len() > 2 && s.is_char_boundary(2))
                .map(|s| s[..2].to_string())
                .unwrap_or_else(|| parts[1].to_string());
            Some(SearchRecord {
                code: parts[2].to_string(),
                name: parts[0].to_string(),
                market,
            })
        })
        .collect()
}

// ─── Generic cleanup ────────────────────────────────────────────────────────

/// Rewrite `YYYY-MM-DD HH:MM:SS[.fff]` strings as ISO-8601, recursively.
pub fn clean_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(clean_value).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, clean_value(v))).collect()),
        Value::String(s) => match iso_datetime(&s) {
            Some(iso) => Value::String(iso),
            None => Value::String(s),
        },
        other => other,
    }
}

fn iso_datetime(s: &str) -> Option<String> {
    if !(19..=29).contains(&s.len()) || s.as_bytes().get(10) != Some(&b' ') {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Replace bare `NaN`, `Infinity` and `-Infinity` tokens outside string
/// literals with `null`, so Python-style JSON parses.
pub fn sanitize_non_finite(text: &str) -> Cow<'_, str> {
    if !text.contains("NaN") && !text.contains("Infinity") {
        return Cow::Borrowed(text);
    }

    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut flushed = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }
        let at_boundary = i == 0 || !is_word_byte(bytes[i - 1]);
        let token = TOKENS.iter().find(|t| {
            let end = i + t.len();
            at_boundary
                && text.as_bytes()[i..].starts_with(t.as_bytes())
                && bytes.get(end).map_or(true, |next| !is_word_byte(*next))
        });
        match token {
            Some(t) => {
                out.push_str(&text[flushed..i]);
                out.push_str("null");
                i += t.len();
                flushed = i;
            }
            None => i += 1,
        }
    }
    out.push_str(&text[flushed..]);
    Cow::Owned(out)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Keep at most `max` records. Returns the original length when truncated.
pub fn truncate_records(value: Value, max: usize) -> (Value, Option<usize>) {
    match value {
        Value::Array(mut items) if items.len() > max => {
            let total = items.len();
            items.truncate(max);
            (Value::Array(items), Some(total))
        }
        other => (other, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_drops_malformed_lines() {
        let records = parse_listing("600000,Pudong Bank\nmalformed\n000001,Ping An");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ListingRecord { code: "600000".into(), name: "Pudong Bank".into() });
        assert_eq!(records[1].code, "000001");
        assert_eq!(records[1].name, "Ping An");
    }

    #[test]
    fn test_listing_trims_and_skips_empty_fields() {
        let records = parse_listing("  600036 , 招商银行 \r\n,missing code\n600519,\n\n");
        assert_eq!(records, vec![ListingRecord { code: "600036".into(), name: "招商银行".into() }]);
    }

    #[test]
    fn test_fund_listing_default_type() {
        let funds = parse_fund_listing("510050,50ETF\n160105,南方积极,LOF\nbad", "ETF");
        assert_eq!(funds.len(), 2);
        assert_eq!(funds[0].fund_type, "ETF");
        assert_eq!(funds[1].fund_type, "LOF");
        assert_eq!(to_json(&funds[1])["type"], "LOF");
    }

    #[test]
    fn test_bracket_literal_embedded() {
        let text = r#"/*<script>*/ var kline = [{"day":"2024-01-02","close":"10.50"},{"day":"2024-01-03","close":"10.61"}]; done"#;
        let value = extract_bracket_literal(text);
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(value[1]["close"], "10.61");
    }

    #[test]
    fn test_bracket_literal_ignores_brackets_in_strings() {
        let text = r#"x=[{"note":"a]b"},[1,2]] trailing ]"#;
        let value = extract_bracket_literal(text);
        assert_eq!(value, json!([{"note": "a]b"}, [1, 2]]));
    }

    #[test]
    fn test_bracket_literal_failure_is_empty() {
        assert_eq!(extract_bracket_literal("no array here"), json!([]));
        assert_eq!(extract_bracket_literal("[{day:2024}]"), json!([]));
        assert_eq!(extract_bracket_literal("[1, 2"), json!([]));
    }

    #[test]
    fn test_realtime_quote_fields() {
        let book = vec!["0"; 20].join(",");
        let text = format!(
            "var hq_str_sz000001=\"平安银行,10.50,10.40,10.62,10.70,10.45,10.61,10.62,123456789,1300000000.50,{},2024-01-05,15:00:00,00\";\n",
            book
        );
        let quote = parse_realtime_quote(&text).unwrap();
        assert_eq!(quote.name, "平安银行");
        assert_eq!(quote.open, 10.50);
        assert_eq!(quote.previous_close, 10.40);
        assert_eq!(quote.price, 10.62);
        assert_eq!(quote.high, 10.70);
        assert_eq!(quote.low, 10.45);
        assert_eq!(quote.volume, 123_456_789);
        assert_eq!(quote.amount, 1_300_000_000.50);
        assert_eq!(quote.change, 0.22);
        assert_eq!(quote.change_percent, 2.12);
        assert_eq!(quote.time, "2024-01-05T15:00:00");
    }

    #[test]
    fn test_realtime_quote_coerces_bad_numbers() {
        let quote = parse_realtime_quote("var hq_str_sh600000=\"浦发银行,--,abc,7.1\";").unwrap();
        assert_eq!(quote.open, 0.0);
        assert_eq!(quote.previous_close, 0.0);
        assert_eq!(quote.price, 7.1);
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.amount, 0.0);
        assert_eq!(quote.change_percent, 0.0);
        assert_eq!(quote.time, "");
    }

    #[test]
    fn test_realtime_quote_missing() {
        assert!(parse_realtime_quote("var hq_str_sz999999=\"\";").is_none());
        assert!(parse_realtime_quote("<html>forbidden</html>").is_none());
    }

    #[test]
    fn test_search_suggestions() {
        let text = r#"var suggestvalue="中国平安,11,601318,sh601318,中国平安,,中国平安,99;平安银行,11,000001,sz000001,平安银行;broken";"#;
        let results = parse_search_suggestions(text);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], SearchRecord { code: "601318".into(), name: "中国平安".into(), market: "sh".into() });
        assert_eq!(results[1].market, "sz");
    }

    #[test]
    fn test_clean_value_iso_dates() {
        let value = json!({"rows": [{"date": "2024-01-05 00:00:00", "ts": "2024-01-05 09:30:00.250"}], "label": "2024-01-05"});
        let cleaned = clean_value(value);
        assert_eq!(cleaned["rows"][0]["date"], "2024-01-05T00:00:00");
        assert_eq!(cleaned["rows"][0]["ts"], "2024-01-05T09:30:00.250");
        assert_eq!(cleaned["label"], "2024-01-05");
    }

    #[test]
    fn test_sanitize_non_finite() {
        let raw = r#"[{"a": NaN, "b": -Infinity, "c": Infinity, "d": "NaN stays", "e": 1.5}]"#;
        let cleaned = sanitize_non_finite(raw);
        let value: Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value[0]["a"], Value::Null);
        assert_eq!(value[0]["b"], Value::Null);
        assert_eq!(value[0]["c"], Value::Null);
        assert_eq!(value[0]["d"], "NaN stays");
        assert_eq!(value[0]["e"], 1.5);
    }

    #[test]
    fn test_sanitize_leaves_clean_text_borrowed() {
        assert!(matches!(sanitize_non_finite(r#"{"a": 1}"#), Cow::Borrowed(_)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = Value::String("600000,Pudong Bank\nmalformed\n000001,Ping An".into());
        let once = normalize_payload(PayloadFormat::Listing, raw);
        let twice = normalize_payload(PayloadFormat::Listing, once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.as_array().map(Vec::len), Some(2));

        let structured = json!([{"date": "2024-01-05T00:00:00", "close": 10.5, "volume": null}]);
        assert_eq!(normalize_payload(PayloadFormat::Json, structured.clone()), structured);
        assert_eq!(normalize_payload(PayloadFormat::BracketLiteral, structured.clone()), structured);
    }

    #[test]
    fn test_normalize_quote_missing_is_null() {
        let value = normalize_payload(PayloadFormat::RealtimeQuote, json!("var hq_str_sz000001=\"\";"));
        assert!(value.is_null());
    }

    #[test]
    fn test_truncate_records() {
        let (value, total) = truncate_records(json!([1, 2, 3, 4]), 2);
        assert_eq!(value, json!([1, 2]));
        assert_eq!(total, Some(4));
        let (value, total) = truncate_records(json!({"a": 1}), 2);
        assert_eq!(value, json!({"a": 1}));
        assert_eq!(total, None);
    }
}
