use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
use crate::source::AdapterResult;
use crate::{record_count, Synthetic, Tool, ToolContext};

pub struct FuturesInfoTool;

#[async_trait]
impl Tool for FuturesInfoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("get_futures_info", "Get real-time futures quotes (AKShare)")
            .field(FieldSpec::required("symbol", FieldType::String, "Futures contract or product, e.g. \"ag\""))
            .field(FieldSpec::optional("exchange", FieldType::String, "Exchange code"))
    }

    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult {
        // futures_zh_spot has no exchange parameter
        let mut kwargs = Map::new();
        kwargs.insert("symbol".into(), json!(args.str("symbol").unwrap_or_default()));
        ctx.library.invoke("futures_zh_spot", &kwargs).await
    }

    fn synthetic(&self) -> Option<Synthetic> {
        Some(Synthetic::FuturesQuote)
    }

    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String {
        format!(
            "Futures quote for {} ({} records)",
            args.str("symbol").unwrap_or_default(),
            record_count(payload)
        )
    }
}
