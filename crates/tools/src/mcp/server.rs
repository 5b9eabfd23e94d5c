use finmcp_core::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use super::protocol::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::dispatch::{Dispatcher, ToolCallRequest};

pub struct McpServer {
    dispatcher: Dispatcher,
    name: String,
    version: String,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            dispatcher,
            name: name.into(),
            version: version.into(),
        }
    }

    /// Handle one input line. `None` means nothing is written back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "MCP: unparseable request line");
                return Some(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e)));
            }
        };
        let id = raw.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(raw) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid request: {}", e))),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "MCP ← request");
        if request.is_notification() {
            debug!(method = %request.method, "MCP notification");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": self.name, "version": self.version },
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                json!({ "tools": self.dispatcher.registry().get_tool_schemas() }),
            ),
            "tools/call" => self.call_tool(id, request.params).await,
            method if method.starts_with("notifications/") => return None,
            method => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", method)),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let call: ToolCallRequest = match serde_json::from_value(params.unwrap_or(Value::Null)) {
            Ok(call) => call,
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e)),
        };
        let response = self.dispatcher.dispatch(call).await;
        match serde_json::to_value(response) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {}", e)),
        }
    }

    /// Serve requests from `reader` until EOF, one at a time.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut out = serde_json::to_string(&response)?;
            debug!(bytes = out.len(), "MCP → response");
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
        info!("MCP: input closed, shutting down");
        Ok(())
    }

    pub async fn serve_stdio(&self) -> Result<()> {
        info!(name = %self.name, version = %self.version, "MCP server running on stdio");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await.map_err(|e| {
            error!(error = %e, "MCP transport failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackPolicy;
    use crate::registry::ToolRegistry;
    use crate::testing::failing_context;

    fn server() -> McpServer {
        let dispatcher = Dispatcher::new(ToolRegistry::with_defaults(), failing_context(), FallbackPolicy::default());
        McpServer::new(dispatcher, "finmcp", "0.1.0")
    }

    async fn call(line: &str) -> Value {
        let resp = server().handle_line(line).await.expect("response expected");
        serde_json::to_value(resp).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = call(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], "finmcp");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_ping_and_string_id() {
        let resp = call(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#).await;
        assert_eq!(resp["id"], "abc");
        assert_eq!(resp["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list_advertises_history_schema() {
        let resp = call(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        let history = tools
            .iter()
            .find(|t| t["name"] == "get_stock_historical_data")
            .unwrap();
        let schema = &history["inputSchema"];
        assert_eq!(schema["required"], json!(["symbol"]));
        assert_eq!(schema["properties"]["period"]["default"], "daily");
        assert!(!schema["required"].as_array().unwrap().contains(&json!("period")));
    }

    #[tokio::test]
    async fn test_null_id_request_is_answered() {
        let resp = call(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).await;
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["result"], json!({}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = call(r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let resp = call("{not json").await;
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert_eq!(resp["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_method_is_invalid_request() {
        let resp = call(r#"{"jsonrpc":"2.0","id":4}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert_eq!(resp["id"], 4);
    }

    #[tokio::test]
    async fn test_tools_call_without_name_is_invalid_params() {
        let resp = call(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"arguments":{}}}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_validation_error_is_text() {
        let resp = call(
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"get_stock_historical_data","arguments":{}}}"#,
        )
        .await;
        let content = resp["result"]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        let text = content[0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error calling get_stock_historical_data:"));
        assert!(text.contains("symbol"));
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["id"], 2);
    }
}
