use finmcp_core::config::FallbackConfig;
use finmcp_core::AdapterFailure;
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::NormalizedArguments;
use crate::{Tool, ToolContext};

/// What the fallback path produced after the primary source failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    /// The secondary live source answered.
    Secondary(Value),
    /// Randomized stand-in data; `failures` are the live-source errors.
    Synthetic { payload: Value, failures: Vec<AdapterFailure> },
    /// Nothing usable; every failure in call order.
    Failed(Vec<AdapterFailure>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub secondary: bool,
    pub synthetic: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            secondary: true,
            synthetic: true,
        }
    }
}

impl From<&FallbackConfig> for FallbackPolicy {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            secondary: config.secondary,
            synthetic: config.synthetic,
        }
    }
}

impl FallbackPolicy {
    /// Try the tool's secondary source once, then its synthetic generator.
    pub async fn recover(
        &self,
        tool: &dyn Tool,
        ctx: &ToolContext,
        args: &NormalizedArguments,
        primary: AdapterFailure,
    ) -> Recovery {
        let name = tool.descriptor().name;
        let mut failures = vec![primary];

        if self.secondary {
            match tool.invoke_secondary(ctx, args).await {
                Some(Ok(payload)) => {
                    debug!(tool = name, "Secondary source succeeded");
                    return Recovery::Secondary(payload);
                }
                Some(Err(failure)) => {
                    warn!(tool = name, error = %failure, "Secondary source failed");
                    failures.push(failure);
                }
                None => {}
            }
        }

        if self.synthetic {
            if let Some(kind) = tool.synthetic() {
                warn!(tool = name, kind = ?kind, "Serving synthetic data");
                return Recovery::Synthetic {
                    payload: kind.generate(args),
                    failures,
                };
            }
        }

        Recovery::Failed(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{failing_context, ScriptedTool};
    use crate::Synthetic;
    use serde_json::json;

    #[tokio::test]
    async fn test_secondary_success_short_circuits() {
        let tool = ScriptedTool::new("t")
            .secondary(Ok(json!([{"code": "600000"}])))
            .with_synthetic(Synthetic::StockList);
        let recovery = FallbackPolicy::default()
            .recover(&tool, &failing_context(), &NormalizedArguments::default(), AdapterFailure::network("down"))
            .await;
        assert_eq!(recovery, Recovery::Secondary(json!([{"code": "600000"}])));
    }

    #[tokio::test]
    async fn test_both_fail_then_synthetic_keeps_failures() {
        let tool = ScriptedTool::new("t")
            .secondary(Err(AdapterFailure::timeout("slow")))
            .with_synthetic(Synthetic::StockList);
        let recovery = FallbackPolicy::default()
            .recover(&tool, &failing_context(), &NormalizedArguments::default(), AdapterFailure::network("down"))
            .await;
        match recovery {
            Recovery::Synthetic { payload, failures } => {
                assert!(payload.is_array());
                assert_eq!(finmcp_core::join_failures(&failures), "down; slow");
            }
            other => panic!("unexpected recovery: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_secondary_disabled_skips_retry() {
        let tool = ScriptedTool::new("t").secondary(Ok(json!([])));
        let policy = FallbackPolicy {
            secondary: false,
            synthetic: true,
        };
        let recovery = policy
            .recover(&tool, &failing_context(), &NormalizedArguments::default(), AdapterFailure::network("down"))
            .await;
        assert_eq!(recovery, Recovery::Failed(vec![AdapterFailure::network("down")]));
        assert_eq!(tool.secondary_calls(), 0);
    }

    #[tokio::test]
    async fn test_synthetic_disabled_fails() {
        let tool = ScriptedTool::new("t").with_synthetic(Synthetic::Quote);
        let policy = FallbackPolicy {
            secondary: true,
            synthetic: false,
        };
        let recovery = policy
            .recover(&tool, &failing_context(), &NormalizedArguments::default(), AdapterFailure::network("down"))
            .await;
        assert!(matches!(recovery, Recovery::Failed(ref f) if f.len() == 1));
    }
}
