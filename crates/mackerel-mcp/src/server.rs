//! Model Context Protocol server over line-delimited JSON-RPC 2.0.
//!
//! One JSON message per line on stdin, one response per line on stdout.
//! Requests get exactly one response; notifications (no `id`) get none;
//! batch arrays are answered element-wise. A tool that fails is still a
//! successful JSON-RPC response: the failure lives in the result's
//! `isError` flag.

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::tools::ToolSet;

/// MCP revision this server speaks.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "mackerel-mcp";

// ── JSON-RPC errors ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

// ── Server ─────────────────────────────────────────────────────────

/// Dispatches MCP requests to a [`ToolSet`].
#[derive(Debug)]
pub struct McpServer {
    tools: ToolSet,
}

impl McpServer {
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<(), String> {
        info!(
            "{SERVER_NAME} {} serving {} tools on stdio",
            env!("CARGO_PKG_VERSION"),
            self.tools.len()
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve line-delimited messages from `reader`, writing responses to
    /// `writer`. Returns when the reader reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("failed to read MCP message: {e}"))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            write_line(&mut writer, &response)
                .await
                .map_err(|e| format!("failed to write MCP response: {e}"))?;
        }
        debug!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one raw line. Returns the serialized response, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Ok(incoming) => self.handle_message(incoming).await?,
            Err(e) => {
                warn!("Unparseable MCP message: {e}");
                error_response(Value::Null, RpcError::parse_error(format!("Parse error: {e}")))
            }
        };
        Some(response.to_string())
    }

    /// Handle a parsed message or batch.
    pub async fn handle_message(&self, incoming: Value) -> Option<Value> {
        let Value::Array(batch) = incoming else {
            return self.handle_single(incoming).await;
        };

        if batch.is_empty() {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Batch request must not be empty"),
            ));
        }
        let mut responses = Vec::new();
        for item in batch {
            if let Some(response) = self.handle_single(item).await {
                responses.push(response);
            }
        }
        if responses.is_empty() {
            None
        } else {
            Some(Value::Array(responses))
        }
    }

    async fn handle_single(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A response to a request we never sent.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        match obj.get("id").cloned() {
            Some(id) => {
                debug!("MCP request: {method}");
                Some(match self.handle_request(method, params).await {
                    Ok(result) => success_response(id, result),
                    Err(err) => error_response(id, err),
                })
            }
            None => {
                debug!("MCP notification: {method}");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => self.tools_list_payload(),
            "tools/call" => self.handle_tools_call(params).await,
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn tools_list_payload(&self) -> Result<Value, RpcError> {
        let tools = serde_json::to_value(self.tools.definitions())
            .map_err(|e| RpcError::internal(format!("failed to serialize tools: {e}")))?;
        Ok(json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        if !self.tools.contains(name) {
            return Err(RpcError::invalid_params(format!("Unknown tool: {name}")));
        }

        let arguments = match params.get("arguments") {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let result = self.tools.execute(name, arguments).await;
        serde_json::to_value(result)
            .map_err(|e| RpcError::internal(format!("failed to serialize result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolDef;
    use crate::response::CallToolResult;
    use crate::tools::{Tool, ToolFuture};

    struct Upper;

    impl Tool for Upper {
        fn definition(&self) -> ToolDef {
            ToolDef::new(
                "upper",
                "Uppercase text",
                json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }),
            )
            .with_title("Upper")
        }

        fn execute(&self, arguments: Value) -> ToolFuture<'_> {
            Box::pin(async move {
                match arguments["text"].as_str() {
                    Some(t) if !t.is_empty() => CallToolResult::text(t.to_uppercase()),
                    _ => CallToolResult::error("Error occurred: empty text"),
                }
            })
        }
    }

    fn server() -> McpServer {
        McpServer::new(ToolSet::new().with(Upper))
    }

    async fn call(server: &McpServer, msg: Value) -> Value {
        server.handle_message(msg).await.expect("expected a response")
    }

    #[tokio::test]
    async fn initialize_reports_protocol_and_server() {
        let resp = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(resp["result"]["serverInfo"]["name"], "mackerel-mcp");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_uses_mcp_shape() {
        let resp = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}),
        )
        .await;
        let tool = &resp["result"]["tools"][0];
        assert_eq!(tool["name"], "upper");
        assert_eq!(tool["title"], "Upper");
        assert_eq!(tool["inputSchema"]["required"][0], "text");
    }

    #[tokio::test]
    async fn tools_call_success_and_tool_failure() {
        let s = server();
        let ok = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "upper", "arguments": {"text": "hi"}}}),
        )
        .await;
        assert_eq!(ok["result"]["content"][0]["text"], "HI");
        assert!(ok["result"].get("isError").is_none());

        let failed = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "upper", "arguments": {"text": ""}}}),
        )
        .await;
        assert!(failed.get("error").is_none(), "tool failure is not a protocol error");
        assert_eq!(failed["result"]["isError"], true);
    }

    #[tokio::test]
    async fn validation_failure_is_a_tool_error() {
        let resp = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "upper"}}),
        )
        .await;
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: argument validation failed"), "{text}");
    }

    #[tokio::test]
    async fn protocol_errors() {
        let s = server();

        let unknown_method = call(&s, json!({"jsonrpc": "2.0", "id": 5, "method": "nope"})).await;
        assert_eq!(unknown_method["error"]["code"], -32601);

        let unknown_tool = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"name": "x"}}),
        )
        .await;
        assert_eq!(unknown_tool["error"]["code"], -32602);

        let bad_args = call(
            &s,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call",
                   "params": {"name": "upper", "arguments": [1]}}),
        )
        .await;
        assert_eq!(bad_args["error"]["code"], -32602);

        let wrong_version = call(&s, json!({"jsonrpc": "1.0", "id": 8, "method": "ping"})).await;
        assert_eq!(wrong_version["error"]["code"], -32600);
        assert_eq!(wrong_version["id"], 8);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let s = server();
        let resp = s
            .handle_message(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn batches_are_answered_element_wise() {
        let s = server();
        let resp = call(
            &s,
            json!([
                {"jsonrpc": "2.0", "id": 1, "method": "ping"},
                {"jsonrpc": "2.0", "method": "notifications/initialized"},
                {"jsonrpc": "2.0", "id": 2, "method": "nope"}
            ]),
        )
        .await;
        let items = resp.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["result"], json!({}));
        assert_eq!(items[1]["error"]["code"], -32601);

        let empty = call(&s, json!([])).await;
        assert_eq!(empty["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn parse_error_line() {
        let line = server().handle_line("{not json").await.unwrap();
        let resp: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(resp["error"]["code"], -32700);
        assert_eq!(resp["id"], Value::Null);
    }

    #[tokio::test]
    async fn serve_reads_lines_and_writes_responses() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"upper","arguments":{"text":"ok"}}}"#,
            "\n",
        );
        let mut output = Vec::new();
        server()
            .serve(BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let responses: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "OK");
    }
}
