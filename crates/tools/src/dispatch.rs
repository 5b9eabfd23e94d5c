//! Tool call dispatch: validate, invoke, fall back, render one text block.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use finmcp_core::{join_failures, Config, Error, Result};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::fallback::{FallbackPolicy, Recovery};
use crate::registry::ToolRegistry;
use crate::source::{PythonLibrarySource, ReqwestHttpSource};
use crate::ToolContext;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// `tools/call` result. Always exactly one text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn first_text(&self) -> &str {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => text,
            None => "",
        }
    }
}

pub struct Dispatcher {
    registry: ToolRegistry,
    ctx: ToolContext,
    policy: FallbackPolicy,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, ctx: ToolContext, policy: FallbackPolicy) -> Self {
        Self { registry, ctx, policy }
    }

    /// Default catalog wired to the live HTTP and Python sources.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = ReqwestHttpSource::new(&config.http)?;
        let library = PythonLibrarySource::from_config(&config.python);
        Ok(Self::new(
            ToolRegistry::with_defaults(),
            ToolContext::new(Arc::new(http), Arc::new(library)),
            FallbackPolicy::from(&config.fallback),
        ))
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one call and return the rendered text, or the structured error.
    pub async fn run(&self, request: &ToolCallRequest) -> Result<String> {
        let name = request.name.as_str();
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        debug!(tool = name, "Validating arguments");
        let args = tool.descriptor().validate(&request.arguments).map_err(|e| {
            warn!(tool = name, error = %e, "Tool validation failed");
            e
        })?;

        debug!(tool = name, "Invoking data source");
        let failure = match tool.invoke(&self.ctx, &args).await {
            Ok(payload) => {
                debug!(tool = name, "Normalizing result");
                return render(&tool.summary(&args, &payload), None, &payload);
            }
            Err(failure) => failure,
        };

        warn!(tool = name, error = %failure, "Primary source failed, falling back");
        match self.policy.recover(tool.as_ref(), &self.ctx, &args, failure).await {
            Recovery::Secondary(payload) => {
                render(&tool.summary(&args, &payload), Some("secondary source".to_string()), &payload)
            }
            Recovery::Synthetic { payload, failures } => {
                let note = format!("synthetic data; live sources failed: {}", join_failures(&failures));
                render(&tool.summary(&args, &payload), Some(note), &payload)
            }
            Recovery::Failed(mut failures) => {
                if failures.len() == 1 {
                    Err(Error::Adapter(failures.remove(0)))
                } else {
                    Err(Error::SourcesExhausted(failures))
                }
            }
        }
    }

    /// Run one call and flatten the outcome into a `ToolResponse`.
    ///
    /// Never fails: errors and panics become `Error calling <tool>: ...` text.
    pub async fn dispatch(&self, request: ToolCallRequest) -> ToolResponse {
        info!(tool = %request.name, "Tool call");
        let outcome = AssertUnwindSafe(self.run(&request)).catch_unwind().await;
        let text = match outcome {
            Ok(Ok(text)) => {
                debug!(tool = %request.name, bytes = text.len(), "Responded");
                text
            }
            Ok(Err(e)) => {
                warn!(tool = %request.name, error = %e, "Tool call failed");
                format!("Error calling {}: {}", request.name, e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = %request.name, panic = %message, "Tool panicked");
                format!("Error calling {}: internal error: {}", request.name, message)
            }
        };
        ToolResponse::text(text)
    }
}

fn render(summary: &str, note: Option<String>, payload: &Value) -> Result<String> {
    let body = serde_json::to_string_pretty(payload)?;
    Ok(match note {
        Some(note) => format!("{} [{}]:\n\n{}", summary, note, body),
        None => format!("{}:\n\n{}", summary, body),
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
