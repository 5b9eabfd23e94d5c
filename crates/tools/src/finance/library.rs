//! Passthrough tools: one per library function, arguments forwarded as
//! keyword arguments.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::normalize::{normalize_payload, PayloadFormat};
use crate::registry::ToolRegistry;
use crate::schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
use crate::source::AdapterResult;
use crate::{record_count, Synthetic, Tool, ToolContext};

/// Argument shapes shared by groups of library functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    StockHistory,
    StockSymbol,
    StockQuote,
    StockMarket,
    StockFilter,
    FundInfo,
    FundList,
    FundRank,
    FundHolding,
    FuturesSpot,
    FuturesRealtime,
    FuturesHistory,
    FuturesPosition,
    MacroQuarterly,
    MacroMonthly,
    MacroRange,
}

fn period_field() -> FieldSpec {
    FieldSpec::optional("period", FieldType::Enum(vec!["daily", "weekly", "monthly"]), "Data period")
        .with_default("daily")
}

fn date_field(name: &'static str, description: &'static str) -> FieldSpec {
    FieldSpec::optional(name, FieldType::String, description)
}

impl ArgShape {
    pub fn fields(self) -> Vec<FieldSpec> {
        use FieldSpec as F;
        use FieldType as T;
        let stock = || F::required("symbol", T::String, "Stock code, e.g. \"000001\"");
        let futures = || F::required("symbol", T::String, "Futures product code, e.g. \"ag\"");
        let start = || date_field("start_date", "Start date, YYYYMMDD");
        let end = || date_field("end_date", "End date, YYYYMMDD");
        let year = || date_field("year", "Year, YYYY");
        let month = || date_field("month", "Month, MM");
        match self {
            ArgShape::StockHistory => vec![
                stock(),
                period_field(),
                start(),
                end(),
                F::optional("adjust", T::Enum(vec!["", "qfq", "hfq"]), "Price adjustment").with_default(""),
            ],
            ArgShape::StockSymbol => vec![stock()],
            ArgShape::StockQuote => vec![
                stock(),
                F::optional("market", T::Enum(vec!["sh", "sz"]), "Market code"),
            ],
            ArgShape::StockMarket => vec![F::optional(
                "market",
                T::Enum(vec!["sh", "sz", "all"]),
                "Market: sh=Shanghai, sz=Shenzhen, all=both",
            )
            .with_default("all")],
            ArgShape::StockFilter => vec![
                F::required("keyword", T::String, "Search keyword"),
                F::optional("limit", T::Number, "Maximum number of results").with_default(10),
            ],
            ArgShape::FundInfo => vec![
                F::required("symbol", T::String, "Fund code, e.g. \"510300\""),
                F::optional("market", T::String, "Market code"),
            ],
            ArgShape::FundList => vec![
                F::optional("type", T::Enum(vec!["etf", "lof", "qfii", "all"]), "Fund type").with_default("all"),
                F::optional("market", T::String, "Market code"),
            ],
            ArgShape::FundRank => vec![
                F::optional("symbol", T::String, "Fund code"),
                F::optional("type", T::Enum(vec!["etf", "lof", "all"]), "Fund type").with_default("all"),
                period_field(),
                F::optional("limit", T::Number, "Maximum number of results").with_default(50),
            ],
            ArgShape::FundHolding => vec![
                F::required("symbol", T::String, "Fund code"),
                F::optional("quarter", T::String, "Quarter, YYYYQn such as 2024Q1"),
            ],
            ArgShape::FuturesSpot => vec![futures(), F::optional("exchange", T::String, "Exchange code")],
            ArgShape::FuturesRealtime => vec![futures(), F::optional("market", T::String, "Market code")],
            ArgShape::FuturesHistory => vec![futures(), start(), end(), period_field()],
            ArgShape::FuturesPosition => vec![futures(), date_field("date", "Trade date, YYYYMMDD")],
            ArgShape::MacroQuarterly => vec![year(), F::optional("quarter", T::String, "Quarter, Qn such as Q1")],
            ArgShape::MacroMonthly => vec![year(), month()],
            ArgShape::MacroRange => vec![start(), end()],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LibraryToolSpec {
    pub function: &'static str,
    pub description: &'static str,
    pub shape: ArgShape,
    pub synthetic: Option<Synthetic>,
}

const fn spec(function: &'static str, description: &'static str, shape: ArgShape) -> LibraryToolSpec {
    LibraryToolSpec {
        function,
        description,
        shape,
        synthetic: None,
    }
}

const fn with_synthetic(mut spec: LibraryToolSpec, kind: Synthetic) -> LibraryToolSpec {
    spec.synthetic = Some(kind);
    spec
}

pub const LIBRARY_TOOLS: &[LibraryToolSpec] = &[
    // Stocks
    with_synthetic(
        spec("stock_zh_a_hist", "A-share historical quotes", ArgShape::StockHistory),
        Synthetic::DailyBars,
    ),
    spec("stock_zh_a_spot_em", "A-share real-time quotes (Eastmoney)", ArgShape::StockSymbol),
    spec("stock_zh_a_spot", "A-share real-time quotes (Sina)", ArgShape::StockQuote),
    spec("stock_sh_a_spot_em", "Shanghai A-share real-time quotes", ArgShape::StockMarket),
    spec("stock_sz_a_spot_em", "Shenzhen A-share real-time quotes", ArgShape::StockMarket),
    spec("stock_zh_a_filter_em", "A-share screening data", ArgShape::StockFilter),
    spec("stock_info_a_code_name_em", "A-share code and name table", ArgShape::StockMarket),
    // Funds
    spec("fund_etf_basic_info_em", "ETF basic information", ArgShape::FundInfo),
    spec("fund_etf_category_em", "ETF category data", ArgShape::FundList),
    spec("fund_etf_spot_em", "ETF real-time quotes", ArgShape::FundList),
    spec("fund_portfolio_em", "Fund holdings", ArgShape::FundHolding),
    spec("fund_rank_em", "Fund rankings", ArgShape::FundRank),
    spec("fund_lof_spot_em", "LOF real-time quotes", ArgShape::FundList),
    spec("fund_info_a_code_name_em", "Fund code and name table", ArgShape::FundList),
    spec("fund_etf_fund_info_em", "ETF details and net asset value history", ArgShape::FundInfo),
    // Futures
    spec("futures_zh_spot", "Futures real-time quotes", ArgShape::FuturesSpot),
    spec("futures_zh_spot_sina", "Futures real-time quotes (Sina)", ArgShape::FuturesRealtime),
    with_synthetic(
        spec("futures_zh_his", "Futures historical quotes", ArgShape::FuturesHistory),
        Synthetic::DailyBars,
    ),
    spec("futures_position_main_em", "Main contract open interest", ArgShape::FuturesPosition),
    spec("futures_position_rank_em", "Open interest rankings", ArgShape::FuturesPosition),
    spec("futures_inventory_sge", "Shanghai Gold Exchange inventory", ArgShape::FuturesSpot),
    spec("futures_inventory_lme", "London Metal Exchange inventory", ArgShape::FuturesSpot),
    spec("futures_inventory_shfe", "Shanghai Futures Exchange inventory", ArgShape::FuturesSpot),
    spec("futures_inventory_dce", "Dalian Commodity Exchange inventory", ArgShape::FuturesSpot),
    spec("futures_inventory_czce", "Zhengzhou Commodity Exchange inventory", ArgShape::FuturesSpot),
    // Macro
    with_synthetic(spec("macro_china_gdp", "China GDP", ArgShape::MacroQuarterly), Synthetic::IndicatorSeries),
    with_synthetic(spec("macro_china_cpi", "China CPI", ArgShape::MacroMonthly), Synthetic::IndicatorSeries),
    with_synthetic(spec("macro_china_ppi", "China PPI", ArgShape::MacroMonthly), Synthetic::IndicatorSeries),
    with_synthetic(spec("macro_china_pmi", "China PMI", ArgShape::MacroMonthly), Synthetic::IndicatorSeries),
    with_synthetic(
        spec("macro_china_m2", "China M2 money supply", ArgShape::MacroMonthly),
        Synthetic::IndicatorSeries,
    ),
    with_synthetic(
        spec("macro_china_interest_rate", "China interest rates", ArgShape::MacroRange),
        Synthetic::IndicatorSeries,
    ),
    with_synthetic(
        spec("macro_china_reserve_requirement_ratio", "China reserve requirement ratio", ArgShape::MacroRange),
        Synthetic::IndicatorSeries,
    ),
    with_synthetic(
        spec("macro_china_foreign_exchange_reserve", "China foreign exchange reserves", ArgShape::MacroRange),
        Synthetic::IndicatorSeries,
    ),
    with_synthetic(
        spec("macro_china_trade_data", "China trade data", ArgShape::MacroRange),
        Synthetic::IndicatorSeries,
    ),
    with_synthetic(
        spec("macro_china_fiscal_revenue", "China fiscal revenue", ArgShape::MacroRange),
        Synthetic::IndicatorSeries,
    ),
];

pub struct LibraryTool {
    spec: &'static LibraryToolSpec,
}

impl LibraryTool {
    pub fn new(spec: &'static LibraryToolSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Tool for LibraryTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.spec
            .shape
            .fields()
            .into_iter()
            .fold(ToolDescriptor::new(self.spec.function, self.spec.description), |d, f| d.field(f))
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let payload = ctx.library.invoke(self.spec.function, args.as_map()).await?;
        Ok(normalize_payload(PayloadFormat::Json, payload))
    }

    fn synthetic(&self) -> Option<Synthetic> {
        self.spec.synthetic
    }

    fn summary(&self, _args: &NormalizedArguments, payload: &Value) -> String {
        format!("{} ({} records)", self.spec.function, record_count(payload))
    }
}

pub fn register_library_tools(registry: &mut ToolRegistry) {
    for spec in LIBRARY_TOOLS {
        registry.register(Arc::new(LibraryTool::new(spec)));
    }
}
