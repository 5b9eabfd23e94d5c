use std::path::Path;

use finmcp_tools::{Dispatcher, ToolCallRequest};
use serde_json::Value;

/// Dispatch a single tool call and print the text block it produces.
pub async fn tool(config_path: Option<&Path>, tool_name: &str, params_json: &str) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let dispatcher = Dispatcher::from_config(&config)?;

    if dispatcher.registry().get(tool_name).is_none() {
        anyhow::bail!("Tool '{}' not found. Use `finmcp tools list` to see available tools.", tool_name);
    }

    let params: Value = serde_json::from_str(params_json)
        .map_err(|e| anyhow::anyhow!("Failed to parse JSON params: {}\nInput: {}", e, params_json))?;

    let response = dispatcher.dispatch(ToolCallRequest::new(tool_name, params)).await;
    println!("{}", response.first_text());
    Ok(())
}
