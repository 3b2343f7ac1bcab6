//! Provider-side serve loop.
//!
//! Reads one JSON-RPC request per line, answers the MCP lifecycle methods and
//! dispatches `tools/call` to a [`ToolHandler`]. Requests are handled
//! concurrently; responses are written in completion order.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::TransportResult;
use crate::protocol::{
    CallToolResult, Implementation, JsonRpcRequest, JsonRpcResponse, ToolDescriptor,
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_INITIALIZE, METHOD_NOT_FOUND, METHOD_TOOLS_CALL,
    METHOD_TOOLS_LIST, PARSE_ERROR, PROTOCOL_VERSION,
};

/// Tools exposed by one provider.
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    /// Name and version reported in the handshake.
    fn server_info(&self) -> Implementation;

    /// Tool descriptors for `tools/list`.
    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Execute one tool. Failures are reported in-band through `isError`.
    async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult;
}

/// Serve `handler` over the process's stdin/stdout until stdin closes.
pub async fn serve_stdio<H: ToolHandler>(handler: Arc<H>) -> TransportResult<()> {
    serve(handler, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve `handler` over an arbitrary byte stream pair until `reader` ends.
pub async fn serve<H, R, W>(handler: Arc<H>, reader: R, writer: W) -> TransportResult<()>
where
    H: ToolHandler,
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(64);
    let writer_task = tokio::spawn(write_responses(writer, rx));

    let mut lines = BufReader::new(reader).lines();
    let mut in_flight = tokio::task::JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Invalid JSON-RPC request");
                let _ = tx
                    .send(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ))
                    .await;
                continue;
            }
        };

        let handler = Arc::clone(&handler);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let id = request.id.clone();
            let method = request.method.clone();
            let handled =
                tokio::spawn(async move { handle_request(handler.as_ref(), request).await }).await;
            let response = match handled {
                Ok(response) => response,
                Err(e) => {
                    // A handler that panics still owes the caller an answer.
                    error!(method = %method, error = %e, "Request handler failed");
                    id.map(|id| JsonRpcResponse::failure(id, INTERNAL_ERROR, "Internal error"))
                }
            };
            if let Some(response) = response {
                let _ = tx.send(response).await;
            }
        });

        // Reap finished requests so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
    }

    debug!("Input closed, draining in-flight requests");
    while in_flight.join_next().await.is_some() {}
    drop(tx);
    writer_task
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;
    info!("Serve loop finished");
    Ok(())
}

async fn handle_request<H: ToolHandler + ?Sized>(
    handler: &H,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    // Notifications never get a reply.
    let Some(id) = request.id else {
        debug!(method = %request.method, "Received notification");
        return None;
    };

    let response = match request.method.as_str() {
        METHOD_INITIALIZE => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": handler.server_info(),
            }),
        ),
        METHOD_TOOLS_LIST => JsonRpcResponse::success(id, json!({ "tools": handler.tools() })),
        METHOD_TOOLS_CALL => {
            let params = request.params.unwrap_or(Value::Null);
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing tool name"));
            };
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

            debug!(tool = name, "Calling tool");
            let result = handler.call_tool(name, arguments).await;
            match serde_json::to_value(&result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
            }
        }
        other => {
            JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
        }
    };
    Some(response)
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Send + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

/// Reject calls to tools this provider does not have.
pub fn unknown_tool(name: &str) -> CallToolResult {
    CallToolResult::error("Unknown tool", format!("No tool named '{name}'"))
}
