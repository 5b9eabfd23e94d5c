use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
use crate::source::AdapterResult;
use crate::{record_count, Synthetic, Tool, ToolContext};

/// Indicator name → library function.
const INDICATORS: &[(&str, &str)] = &[
    ("GDP", "macro_china_gdp"),
    ("CPI", "macro_china_cpi"),
    ("PPI", "macro_china_ppi"),
    ("PMI", "macro_china_pmi"),
    ("M2", "macro_china_m2"),
    ("INTEREST_RATE", "macro_china_interest_rate"),
    ("RESERVE_REQUIREMENT_RATIO", "macro_china_reserve_requirement_ratio"),
    ("FX_RESERVE", "macro_china_foreign_exchange_reserve"),
    ("TRADE", "macro_china_trade_data"),
    ("FISCAL_REVENUE", "macro_china_fiscal_revenue"),
];

pub fn indicator_function(indicator: &str) -> Option<&'static str> {
    INDICATORS
        .iter()
        .find(|(name, _)| *name == indicator)
        .map(|(_, function)| *function)
}

pub struct EconomicDataTool;

#[async_trait]
impl Tool for EconomicDataTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_economic_data", "Get a Chinese macroeconomic indicator series (AKShare)")
            .field(FieldSpec::required(
                "indicator",
                FieldType::Enum(INDICATORS.iter().map(|(name, _)| *name).collect()),
                "Indicator name",
            ))
            .field(FieldSpec::optional("start_date", FieldType::String, "Start date, YYYY-MM-DD or YYYYMMDD"))
            .field(FieldSpec::optional("end_date", FieldType::String, "End date, YYYY-MM-DD or YYYYMMDD"))
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        // Validation restricts the indicator to the table.
        let function = args
            .str("indicator")
            .and_then(indicator_function)
            .unwrap_or("macro_china_gdp");
        // The macro functions take no arguments; the range is applied here.
        let payload = ctx.library.invoke(function, &Map::new()).await?;
        Ok(super::filter_by_dates(
            payload,
            args.non_empty_str("start_date"),
            args.non_empty_str("end_date"),
        ))
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::IndicatorSeries)
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "{} data ({} records)",
            args.str("indicator").unwrap_or_default(),
            record_count(payload)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, FakeHttp, FakeLibrary};
    use finmcp_core::ValidationError;
    use serde_json::json;

    #[test]
    fn test_unsupported_indicator_lists_supported() {
        let err = EconomicDataTool
            .descriptor()
            .validate(&json!({"indicator": "UNEMPLOYMENT"}))
            .unwrap_err();
        match err {
            ValidationError::NotAllowed { field, allowed, .. } => {
                assert_eq!(field, "indicator");
                assert!(allowed.contains(&"CPI".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_indicator_maps_and_filters() {
        let rows = json!([
            {"月份": "2023年12月份", "value": 1},
            {"月份": "2024年01月份", "value": 2},
            {"月份": "2024年02月份", "value": 3}
        ]);
        let (ctx, _, library) = context(
            FakeHttp::failing(),
            FakeLibrary::failing().function("macro_china_cpi", Ok(rows)),
        );
        let tool = EconomicDataTool;
        let a = tool
            .descriptor()
            .validate(&json!({"indicator": "CPI", "start_date": "2024-01-01"}))
            .unwrap();
        let payload = tool.invoke(&ctx, &a).await.unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 2);
        assert!(library.calls()[0].1.is_empty());
    }
}
