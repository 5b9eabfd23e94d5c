//! Randomized stand-in payloads used when every live source failed.
//!
//! Shapes are fixed per kind so clients can parse a fallback result the
//! same way as a live one: each record has exactly the live record's keys.

use chrono::{Duration, Local, Months, NaiveDate};
use rand::Rng;
use serde_json::{json, Value};

use crate::normalize::round_to;
use crate::schema::NormalizedArguments;

const HISTORY_DAYS: i64 = 30;
const STOCK_LIST_MAX: usize = 50;
const FUND_LIST_MAX: usize = 30;
const SEARCH_RESULTS: usize = 10;
const INDICATOR_MONTHS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthetic {
    /// 30 daily OHLCV bars, oldest first.
    DailyBars,
    /// Single stock quote.
    Quote,
    /// Up to 50 `{code, name}` records.
    StockList,
    /// Up to 30 `{code, name, type}` records.
    FundList,
    /// 10 search hits for the keyword.
    SearchResults,
    FuturesQuote,
    /// 12 monthly observations, oldest first.
    IndicatorSeries,
}

impl Synthetic {
    pub fn generate(self, args: &NormalizedArguments) -> Value {
        self.generate_with(args, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(self, args: &NormalizedArguments, rng: &mut R) -> Value {
        let today = Local::now().date_naive();
        match self {
            Synthetic::DailyBars => daily_bars(today, rng),
            Synthetic::Quote => quote(args.str("symbol").unwrap_or_default(), rng),
            Synthetic::StockList => stock_list(
                args.str("market").unwrap_or("all"),
                args.count("limit").unwrap_or(STOCK_LIST_MAX),
            ),
            Synthetic::FundList => fund_list(
                args.str("type").unwrap_or("etf"),
                args.count("limit").unwrap_or(FUND_LIST_MAX),
            ),
            Synthetic::SearchResults => search_results(
                args.str("keyword").unwrap_or_default(),
                args.str("market").unwrap_or("all"),
            ),
            Synthetic::FuturesQuote => futures_quote(
                args.str("symbol").unwrap_or_default(),
                args.str("exchange"),
                rng,
            ),
            Synthetic::IndicatorSeries => indicator_series(
                args.str("indicator").unwrap_or("value"),
                today,
                rng,
            ),
        }
    }
}

fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn daily_bars<R: Rng>(today: NaiveDate, rng: &mut R) -> Value {
    let bars: Vec<Value> = (0..HISTORY_DAYS)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            let close = 10.0 + rng.gen::<f64>() * 5.0;
            let open = close + (rng.gen::<f64>() - 0.5);
            let high = open.max(close) + rng.gen::<f64>() * 0.5;
            let low = open.min(close) - rng.gen::<f64>() * 0.5;
            json!({
                "day": day.format("%Y-%m-%d").to_string(),
                "open": round_to(open, 2),
                "high": round_to(high, 2),
                "low": round_to(low, 2),
                "close": round_to(close, 2),
                "volume": rng.gen_range(0..1_000_000u64),
            })
        })
        .collect();
    Value::Array(bars)
}

fn quote<R: Rng>(symbol: &str, rng: &mut R) -> Value {
    let previous_close = round_to(10.0 + rng.gen::<f64>() * 10.0, 2);
    let price = round_to(previous_close * (1.0 + (rng.gen::<f64>() - 0.5) * 0.1), 2);
    let open = round_to(previous_close * (1.0 + (rng.gen::<f64>() - 0.5) * 0.04), 2);
    let high = round_to(price.max(open) * (1.0 + rng.gen::<f64>() * 0.01), 2);
    let low = round_to(price.min(open) * (1.0 - rng.gen::<f64>() * 0.01), 2);
    let volume = rng.gen_range(0..1_000_000u64);
    json!({
        "symbol": symbol,
        "name": format!("Stock {}", symbol),
        "open": open,
        "previous_close": previous_close,
        "price": price,
        "high": high,
        "low": low,
        "volume": volume,
        "amount": round_to(volume as f64 * price, 2),
        "change": round_to(price - previous_close, 3),
        "changePercent": round_to((price - previous_close) / previous_close * 100.0, 2),
        "time": now_timestamp(),
    })
}

fn stock_list(market: &str, limit: usize) -> Value {
    let prefixes: &[char] = match market {
        "sh" => &['6', '9'],
        "sz" => &['0', '3'],
        _ => &['0', '3', '6'],
    };
    let stocks: Vec<Value> = (0..limit.min(STOCK_LIST_MAX))
        .map(|i| {
            let code = format!("{}{:05}", prefixes[i % prefixes.len()], i);
            json!({
                "name": format!("Sample Stock {}", code),
                "code": code,
            })
        })
        .collect();
    Value::Array(stocks)
}

fn fund_list(fund_type: &str, limit: usize) -> Value {
    let label = fund_type.to_uppercase();
    let funds: Vec<Value> = (1..=limit.min(FUND_LIST_MAX))
        .map(|i| {
            json!({
                "code": format!("{:06}", i),
                "name": format!("{} Fund {}", label, i),
                "type": label,
            })
        })
        .collect();
    Value::Array(funds)
}

fn search_results(keyword: &str, market: &str) -> Value {
    let results: Vec<Value> = (1..=SEARCH_RESULTS)
        .map(|i| {
            let market = match market {
                "sh" | "sz" => market,
                _ if i % 2 == 0 => "sh",
                _ => "sz",
            };
            json!({
                "code": format!("{:06}", i),
                "name": format!("{} related {}", keyword, i),
                "market": market,
            })
        })
        .collect();
    Value::Array(results)
}

fn futures_quote<R: Rng>(symbol: &str, exchange: Option<&str>, rng: &mut R) -> Value {
    let price = 1000.0 + rng.gen::<f64>() * 4000.0;
    let open = price * (1.0 + (rng.gen::<f64>() - 0.5) * 0.02);
    json!({
        "symbol": symbol,
        "exchange": exchange.unwrap_or(""),
        "price": round_to(price, 2),
        "open": round_to(open, 2),
        "high": round_to(price.max(open) * (1.0 + rng.gen::<f64>() * 0.01), 2),
        "low": round_to(price.min(open) * (1.0 - rng.gen::<f64>() * 0.01), 2),
        "volume": rng.gen_range(0..500_000u64),
        "openInterest": rng.gen_range(0..1_000_000u64),
        "time": now_timestamp(),
    })
}

fn indicator_series<R: Rng>(indicator: &str, today: NaiveDate, rng: &mut R) -> Value {
    let base = 50.0 + rng.gen::<f64>() * 50.0;
    let series: Vec<Value> = (0..INDICATOR_MONTHS)
        .rev()
        .filter_map(|back| today.checked_sub_months(Months::new(back)))
        .map(|month| {
            json!({
                "date": month.format("%Y-%m").to_string(),
                "indicator": indicator,
                "value": round_to(base * (1.0 + (rng.gen::<f64>() - 0.5) * 0.1), 2),
            })
        })
        .collect();
    Value::Array(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn args(value: Value) -> NormalizedArguments {
        NormalizedArguments::from(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_quote_fields() {
        let mut rng = StdRng::seed_from_u64(7);
        let quote = Synthetic::Quote.generate_with(&args(json!({"symbol": "000001"})), &mut rng);
        for key in ["symbol", "name", "price", "change", "changePercent", "volume", "time"] {
            assert!(quote.get(key).is_some(), "missing {key}");
        }
        assert_eq!(quote["symbol"], "000001");
        let price = quote["price"].as_f64().unwrap();
        assert!((9.0..=21.0).contains(&price));
        assert!(quote["high"].as_f64() >= quote["low"].as_f64());
    }

    #[test]
    fn test_daily_bars_ordered_and_consistent() {
        let mut rng = StdRng::seed_from_u64(1);
        let bars = Synthetic::DailyBars.generate_with(&NormalizedArguments::default(), &mut rng);
        let bars = bars.as_array().unwrap();
        assert_eq!(bars.len(), 30);
        assert!(bars[0]["day"].as_str() < bars[29]["day"].as_str());
        for bar in bars {
            assert!(bar["high"].as_f64() >= bar["low"].as_f64());
        }
    }

    #[test]
    fn test_stock_list_bounded_and_prefixed() {
        let mut rng = StdRng::seed_from_u64(3);
        let list = Synthetic::StockList.generate_with(&args(json!({"market": "sh", "limit": 500})), &mut rng);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 50);
        assert!(list.iter().all(|s| {
            let code = s["code"].as_str().unwrap();
            code.starts_with('6') || code.starts_with('9')
        }));

        let small = Synthetic::StockList.generate_with(&args(json!({"limit": 5})), &mut rng);
        assert_eq!(small.as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_fund_list_bounded() {
        let mut rng = StdRng::seed_from_u64(4);
        let list = Synthetic::FundList.generate_with(&args(json!({"type": "lof", "limit": 50})), &mut rng);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 30);
        assert_eq!(list[0]["type"], "LOF");
        assert_eq!(list[0]["code"], "000001");
    }

    #[test]
    fn test_search_results_alternate_markets() {
        let mut rng = StdRng::seed_from_u64(5);
        let hits = Synthetic::SearchResults.generate_with(&args(json!({"keyword": "bank"})), &mut rng);
        let hits = hits.as_array().unwrap();
        assert_eq!(hits.len(), 10);
        assert_eq!(hits[0]["market"], "sz");
        assert_eq!(hits[1]["market"], "sh");
        assert!(hits[0]["name"].as_str().unwrap().starts_with("bank"));
    }

    #[test]
    fn test_indicator_series_twelve_months() {
        let mut rng = StdRng::seed_from_u64(6);
        let series = Synthetic::IndicatorSeries.generate_with(&args(json!({"indicator": "CPI"})), &mut rng);
        let series = series.as_array().unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series[0]["indicator"], "CPI");
        assert!(series[0]["date"].as_str() < series[11]["date"].as_str());
    }

    #[test]
    fn test_same_seed_same_numbers() {
        let a = Synthetic::FuturesQuote.generate_with(&args(json!({"symbol": "ag"})), &mut StdRng::seed_from_u64(9));
        let b = Synthetic::FuturesQuote.generate_with(&args(json!({"symbol": "ag"})), &mut StdRng::seed_from_u64(9));
        assert_eq!(a["price"], b["price"]);
        assert_eq!(a["openInterest"], b["openInterest"]);
    }
}
