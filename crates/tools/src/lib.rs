pub mod dispatch;
pub mod fallback;
pub mod finance;
pub mod mcp;
pub mod normalize;
pub mod registry;
pub mod schema;
pub mod source;
pub mod synthetic;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use dispatch::{ContentBlock, Dispatcher, ToolCallRequest, ToolResponse};
pub use registry::ToolRegistry;
pub use schema::{FieldSpec, FieldType, NormalizedArguments, ToolDescriptor};
pub use source::{AdapterResult, HttpSource, LibrarySource};
pub use synthetic::Synthetic;

/// Truncate a string to at most `max_chars` bytes, respecting UTF-8 char boundaries.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Data sources handed to every tool call.
#[derive(Clone)]
pub struct ToolContext {
    pub http: Arc<dyn HttpSource>,
    pub library: Arc<dyn LibrarySource>,
}

impl ToolContext {
    pub fn new(http: Arc<dyn HttpSource>, library: Arc<dyn LibrarySource>) -> Self {
        Self { http, library }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Primary data-source call. The payload is returned already normalized.
    async fn invoke(&self, ctx: &ToolContext, args: &NormalizedArguments) -> AdapterResult;

    /// Single retry against another source after the primary failed.
    async fn invoke_secondary(&self, _ctx: &ToolContext, _args: &NormalizedArguments) -> Option<AdapterResult> {
        None
    }

    /// Generator used when every live source failed.
    fn synthetic(&self) -> Option<Synthetic> {
        None
    }

    /// One-line description of a successful result, shown above the payload.
    fn summary(&self, args: &NormalizedArguments, payload: &Value) -> String;
}

/// Record count of a payload: array length, 1 for anything else non-null.
pub fn record_count(payload: &Value) -> usize {
    match payload {
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}
