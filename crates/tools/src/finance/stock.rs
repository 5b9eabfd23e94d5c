use async_trait::async_trait;
use finmcp_core::AdapterFailure;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::sina;
use crate::normalize::{normalize_payload, parse_listing, truncate_records, PayloadFormat};
use crate::schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
use crate::source::AdapterResult;
use crate::{record_count, Synthetic, Tool, ToolContext};

/// Most bars returned to the client.
const HISTORY_OUTPUT_MAX: usize = 100;
/// Most search hits returned to the client.
const SEARCH_OUTPUT_MAX: usize = 20;

fn market_field() -> FieldSpec {
    FieldSpec::optional(
        "market",
        FieldType::Enum(vec!["sh", "sz", "all"]),
        "Market: sh=Shanghai, sz=Shenzhen, all=both",
    )
    .with_default("all")
}

fn symbol_field() -> FieldSpec {
    FieldSpec::required("symbol", FieldType::String, "Stock code, e.g. \"000001\"")
}

pub struct StockHistoricalTool;

#[async_trait]
impl Tool for StockHistoricalTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_stock_historical_data",
            "Get historical OHLCV bars for an A-share stock (Sina Finance)",
        )
        .field(symbol_field())
        .field(
            FieldSpec::optional("period", FieldType::Enum(vec!["daily", "weekly", "monthly"]), "Bar period")
                .with_default("daily"),
        )
        .field(FieldSpec::optional("start_date", FieldType::String, "Start date, YYYY-MM-DD or YYYYMMDD"))
        .field(FieldSpec::optional("end_date", FieldType::String, "End date, YYYY-MM-DD or YYYYMMDD"))
        .field(
            FieldSpec::optional("adjust", FieldType::Enum(vec!["", "qfq", "hfq"]), "Price adjustment")
                .with_default(""),
        )
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let symbol = args.str("symbol").unwrap_or_default();
        let period = args.str("period").unwrap_or("daily");
        let query = vec![
            ("symbol".to_string(), sina::format_symbol(symbol)),
            ("scale".to_string(), sina::kline_scale(period).to_string()),
            ("ma".to_string(), "no".to_string()),
            ("datalen".to_string(), sina::KLINE_MAX_BARS.to_string()),
        ];
        let raw = ctx.http.get(sina::KLINE_URL, &query).await?;
        let bars = normalize_payload(PayloadFormat::BracketLiteral, raw);
        let bars = super::filter_by_dates(bars, args.non_empty_str("start_date"), args.non_empty_str("end_date"));

        let Value::Array(mut items) = bars else {
            return Err(AdapterFailure::no_data(format!("no K-line data for {}", symbol)));
        };
        if items.is_empty() {
            return Err(AdapterFailure::no_data(format!("no K-line data for {}", symbol)));
        }
        // Bars come oldest first; keep the most recent ones.
        let skip = items.len().saturating_sub(HISTORY_OUTPUT_MAX);
        if skip > 0 {
            debug!(symbol, total = items.len(), kept = HISTORY_OUTPUT_MAX, "Trimming K-line output");
            items.drain(..skip);
        }
        Ok(Value::Array(items))
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::DailyBars)
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "Historical {} data for {} ({} records)",
            args.str("period").unwrap_or("daily"),
            args.str("symbol").unwrap_or_default(),
            record_count(payload)
        )
    }
}

pub struct StockRealtimeTool;

#[async_trait]
impl Tool for StockRealtimeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_stock_realtime_data", "Get the real-time quote of an A-share stock (Sina Finance)")
            .field(symbol_field())
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let symbol = args.str("symbol").unwrap_or_default();
        let endpoint = format!("{}{}", sina::QUOTE_URL, sina::format_symbol(symbol));
        let raw = ctx.http.get(&endpoint, &[]).await?;
        match normalize_payload(PayloadFormat::RealtimeQuote, raw) {
            Value::Object(mut quote) => {
                quote.insert("symbol".into(), json!(symbol));
                Ok(Value::Object(quote))
            }
            _ => Err(AdapterFailure::no_data(format!("no quote for {}", symbol))),
        }
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::Quote)
    }

    fn summary(&self, args: &NormalizedArguments, _payload: &Value) -> String {
        format!("Real-time quote for {}", args.str("symbol").unwrap_or_default())
    }
}

pub struct StockListTool;

impl StockListTool {
    fn limit(args: &NormalizedArguments) -> usize {
        args.count("limit").unwrap_or(100)
    }
}

#[async_trait]
impl Tool for StockListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_stock_list", "List A-share stock codes and names")
            .field(market_field())
            .field(FieldSpec::optional("limit", FieldType::Number, "Maximum number of records").with_default(100))
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let market = args.str("market").unwrap_or("all");
        let limit = Self::limit(args);
        let boards: &[&str] = match market {
            "sh" => &["hs"],
            "sz" => &["zs"],
            _ => &["hs", "zs"],
        };
        // Split the limit across boards so `all` shows both markets.
        let per_board = limit.div_ceil(boards.len());

        let mut stocks = Vec::new();
        for board in boards {
            let query = [("type".to_string(), board.to_string())];
            let raw = ctx.http.get(sina::STOCK_LIST_URL, &query).await?;
            let records = match raw {
                Value::String(text) => parse_listing(&text),
                _ => Vec::new(),
            };
            stocks.extend(records.into_iter().take(per_board));
        }
        stocks.truncate(limit);
        if stocks.is_empty() {
            return Err(AdapterFailure::no_data(format!("empty stock listing for market {}", market)));
        }
        serde_json::to_value(stocks).map_err(|e| AdapterFailure::parse(e.to_string()))
    }

    async fn invoke_secondary(&self, ctx: &ToolContext, args: &NormalizedArguments) -> Option<AdapterResult> {
        let market = args.str("market").unwrap_or("all").to_string();
        let limit = Self::limit(args);
        let result = ctx.library.invoke("stock_info_a_code_name", &Map::new()).await.map(|payload| {
            let Value::Array(items) = payload else {
                return payload;
            };
            let filtered: Vec<Value> = items
                .into_iter()
                .filter(|r| {
                    market == "all"
                        || r.get("code")
                            .and_then(Value::as_str)
                            .and_then(sina::market_of)
                            .is_some_and(|m| m == market)
                })
                .take(limit)
                .collect();
            Value::Array(filtered)
        });
        Some(result)
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::StockList)
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "Stock list (market: {}, limit: {}, returned: {})",
            args.str("market").unwrap_or("all"),
            Self::limit(args),
            record_count(payload)
        )
    }
}

pub struct SearchStockTool;

#[async_trait]
impl Tool for SearchStockTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("search_stock", "Search stocks by company name, pinyin or code")
            .field(FieldSpec::required(
                "keyword",
                FieldType::String,
                "Search keyword, e.g. a company name or stock code",
            ))
            .field(market_field())
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let keyword = args.str("keyword").unwrap_or_default();
        let market = args.str("market").unwrap_or("all");
        let endpoint = format!("{}{}", sina::SUGGEST_URL, urlencoding::encode(keyword));
        let raw = ctx.http.get(&endpoint, &[]).await?;
        let hits = match normalize_payload(PayloadFormat::SearchSuggestions, raw) {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        let hits: Vec<Value> = hits
            .into_iter()
            .filter(|h| market == "all" || h.get("market").and_then(Value::as_str) == Some(market))
            .collect();
        let (bounded, total) = truncate_records(Value::Array(hits), SEARCH_OUTPUT_MAX);
        if let Some(total) = total {
            debug!(keyword, total, kept = SEARCH_OUTPUT_MAX, "Trimming search results");
        }
        Ok(bounded)
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::SearchResults)
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "Search results for \"{}\" ({} found)",
            args.str("keyword").unwrap_or_default(),
            record_count(payload)
        )
    }
}
