use std::path::Path;

use finmcp_tools::mcp::McpServer;
use finmcp_tools::Dispatcher;
use tracing::info;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let dispatcher = Dispatcher::from_config(&config)?;
    info!(tools = dispatcher.registry().len(), "Tool catalog loaded");

    let server = McpServer::new(dispatcher, config.server.name.clone(), config.server.version.clone());
    server.serve_stdio().await?;
    Ok(())
}
