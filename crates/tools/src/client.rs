//! MCP client for one tool provider.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::errors::{TransportError, TransportResult};
use crate::protocol::{
    CallToolResult, Implementation, InitializeResult, ToolDescriptor, ToolList, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PROTOCOL_VERSION,
};
use crate::transport::Transport;

/// In-band failure reported by a tool (`isError: true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full failure payload as sent by the provider.
    #[serde(skip)]
    pub details: Value,
}

impl ToolFailure {
    fn describe(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {message}", self.error),
            None => self.error.clone(),
        }
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Decoded reply of a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome<T> {
    Success(T),
    NotFound(ToolFailure),
    Error(ToolFailure),
}

/// Decode a `tools/call` result into a typed outcome.
pub fn decode_outcome<T: DeserializeOwned>(
    tool: &str,
    result: &CallToolResult,
) -> TransportResult<ToolOutcome<T>> {
    let text = result
        .first_text()
        .ok_or_else(|| TransportError::decode(tool, "reply has no text content"))?;

    if result.is_error {
        // Text that is not JSON is kept verbatim as a string payload.
        let details: Value =
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
        let failure = match serde_json::from_value::<ToolFailure>(details.clone()) {
            Ok(parsed) => ToolFailure { details, ..parsed },
            Err(_) => ToolFailure {
                error: text.to_string(),
                message: None,
                details,
            },
        };

        if failure.error.to_ascii_lowercase().contains("not found") {
            return Ok(ToolOutcome::NotFound(failure));
        }
        return Ok(ToolOutcome::Error(failure));
    }

    serde_json::from_str(text)
        .map(ToolOutcome::Success)
        .map_err(|e| TransportError::decode(tool, e.to_string()))
}

/// A connected, initialized MCP provider.
pub struct McpClient {
    transport: Transport,
    server_info: Implementation,
}

impl McpClient {
    /// Run the MCP handshake over `transport`.
    ///
    /// No tool may be invoked on a provider that has not completed this.
    pub async fn connect(
        transport: Transport,
        client_info: Implementation,
    ) -> TransportResult<Self> {
        let provider = transport.provider().to_string();
        let handshake_error = |reason: String| TransportError::Handshake {
            provider: provider.clone(),
            reason,
        };

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": client_info,
        });
        let raw = transport
            .request(METHOD_INITIALIZE, Some(params))
            .await
            .map_err(|e| handshake_error(e.to_string()))?;
        let init: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| handshake_error(format!("invalid initialize result: {e}")))?;

        if init.protocol_version != PROTOCOL_VERSION {
            debug!(
                provider = %provider,
                server_version = %init.protocol_version,
                "Provider negotiated a different protocol revision"
            );
        }

        transport
            .notify(METHOD_INITIALIZED, None)
            .await
            .map_err(|e| handshake_error(e.to_string()))?;

        info!(
            provider = %provider,
            server = %init.server_info.name,
            version = %init.server_info.version,
            "Connected to tool provider"
        );

        Ok(Self {
            transport,
            server_info: init.server_info,
        })
    }

    pub fn provider(&self) -> &str {
        self.transport.provider()
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// List the tools the provider exposes.
    pub async fn list_tools(&self) -> TransportResult<Vec<ToolDescriptor>> {
        self.ensure_open()?;
        let raw = self.transport.request(METHOD_TOOLS_LIST, None).await?;
        let list: ToolList = serde_json::from_value(raw)
            .map_err(|e| TransportError::decode(METHOD_TOOLS_LIST, e.to_string()))?;
        Ok(list.tools)
    }

    /// Invoke a tool and return its raw result.
    pub async fn call_tool<A: Serialize + ?Sized>(
        &self,
        tool: &str,
        arguments: &A,
    ) -> TransportResult<CallToolResult> {
        self.ensure_open()?;
        let params = json!({
            "name": tool,
            "arguments": serde_json::to_value(arguments)?,
        });
        let raw = self.transport.request(METHOD_TOOLS_CALL, Some(params)).await?;
        serde_json::from_value(raw).map_err(|e| TransportError::decode(tool, e.to_string()))
    }

    /// Invoke a tool and decode its reply into `T`.
    pub async fn invoke<A, T>(&self, tool: &str, arguments: &A) -> TransportResult<ToolOutcome<T>>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let result = self.call_tool(tool, arguments).await?;
        decode_outcome(tool, &result)
    }

    /// Close the connection and stop the provider.
    pub async fn close(&self) -> TransportResult<()> {
        self.transport.close().await
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.transport.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}
