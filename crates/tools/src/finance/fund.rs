use async_trait::async_trait;
use finmcp_core::AdapterFailure;
use serde_json::{json, Map, Value};

use super::sina;
use crate::normalize::{clean_value, parse_fund_listing, truncate_records};
use crate::schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
use crate::source::AdapterResult;
use crate::{record_count, Synthetic, Tool, ToolContext};

pub struct FundListTool;

impl FundListTool {
    fn fund_type(args: &NormalizedArguments) -> &str {
        args.str("type").unwrap_or("etf")
    }

    fn limit(args: &NormalizedArguments) -> usize {
        args.count("limit").unwrap_or(50)
    }

    /// Library function listing funds of `fund_type`.
    fn library_function(fund_type: &str) -> &'static str {
        match fund_type {
            "etf" => "fund_etf_spot_em",
            "lof" => "fund_lof_spot_em",
            _ => "fund_name_em",
        }
    }
}

#[async_trait]
impl Tool for FundListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_fund_list", "List funds of a given type")
            .field(
                FieldSpec::optional("type", FieldType::Enum(vec!["etf", "lof", "qfii", "all"]), "Fund type")
                    .with_default("etf"),
            )
            .field(FieldSpec::optional("limit", FieldType::Number, "Maximum number of records").with_default(50))
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let fund_type = Self::fund_type(args);
        let limit = Self::limit(args);
        let board = match fund_type {
            "etf" | "lof" => fund_type,
            _ => "all",
        };
        let query = [("type".to_string(), board.to_string())];
        let raw = ctx.http.get(sina::FUND_LIST_URL, &query).await?;
        // Only the etf and lof boards imply a type for rows without one.
        let default_type = match board {
            "etf" | "lof" => board.to_uppercase(),
            _ => String::new(),
        };
        let funds = match raw {
            Value::String(text) => parse_fund_listing(&text, &default_type),
            _ => Vec::new(),
        };
        if funds.is_empty() {
            return Err(AdapterFailure::no_data(format!("empty fund listing for type {}", fund_type)));
        }
        let funds: Vec<_> = funds.into_iter().take(limit).collect();
        serde_json::to_value(funds)
            .map(clean_value)
            .map_err(|e| AdapterFailure::parse(e.to_string()))
    }

    async fn invoke_secondary(&self, ctx: &ToolContext, args: &NormalizedArguments) -> Option<AdapterResult> {
        let function = Self::library_function(Self::fund_type(args));
        let limit = Self::limit(args);
        let result = ctx
            .library
            .invoke(function, &Map::new())
            .await
            .map(|payload| truncate_records(payload, limit).0);
        Some(result)
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::FundList)
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "Fund list (type: {}, limit: {}, returned: {})",
            Self::fund_type(args),
            Self::limit(args),
            record_count(payload)
        )
    }
}

pub struct FundInfoTool;

#[async_trait]
impl Tool for FundInfoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_fund_info", "Get net asset value history and details of an ETF (AKShare)")
            .field(FieldSpec::required("symbol", FieldType::String, "Fund code, e.g. \"510300\""))
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        let mut kwargs = Map::new();
        kwargs.insert("fund".into(), json!(args.str("symbol").unwrap_or_default()));
        ctx.library.invoke("fund_etf_fund_info_em", &kwargs).await
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "Fund info for {} ({} records)",
            args.str("symbol").unwrap_or_default(),
            record_count(payload)
        )
    }
}
