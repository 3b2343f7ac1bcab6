use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tools::{
    serve, unknown_tool, CallToolResult, Implementation, McpClient, ToolDescriptor, ToolHandler,
    ToolOutcome, Transport, TransportError,
};

#[derive(Default)]
struct Counter {
    calls: AtomicUsize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sum {
    total: i64,
}

#[async_trait]
impl ToolHandler for Counter {
    fn server_info(&self) -> Implementation {
        Implementation::new("counter", "1.0.0")
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: "add".to_string(),
                description: "Add two numbers".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "a": { "type": "integer" }, "b": { "type": "integer" } },
                    "required": ["a", "b"]
                }),
            },
            ToolDescriptor {
                name: "lookup".to_string(),
                description: "Always misses".to_string(),
                input_schema: json!({ "type": "object" }),
            },
        ]
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "add" => {
                let a = arguments["a"].as_i64().unwrap_or_default();
                let b = arguments["b"].as_i64().unwrap_or_default();
                // Larger sums finish first so replies come back out of order.
                let delay = 50u64.saturating_sub(u64::try_from(a + b).unwrap_or(0));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                CallToolResult::json(&Sum { total: a + b })
            }
            "lookup" => CallToolResult::error_json(&json!({
                "error": "Incident not found",
                "incident_id": arguments["id"],
            })),
            other => unknown_tool(other),
        }
    }
}

async fn connected(handler: Arc<Counter>) -> McpClient {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    tokio::spawn(serve(handler, server_read, server_write));

    let (client_read, client_write) = tokio::io::split(client_io);
    let transport = Transport::from_io("counter", client_read, client_write);
    McpClient::connect(transport, Implementation::new("test-client", "0.0.0"))
        .await
        .expect("handshake should succeed")
}

#[tokio::test]
async fn test_handshake_and_tools_list() {
    let client = connected(Arc::new(Counter::default())).await;
    assert_eq!(client.server_info().name, "counter");

    let names: Vec<String> = client
        .list_tools()
        .await
        .unwrap()
        .into_iter()
        .map(|tool| tool.name)
        .collect();
    assert_eq!(names, vec!["add", "lookup"]);
}

#[tokio::test]
async fn test_concurrent_calls_are_correlated() {
    let handler = Arc::new(Counter::default());
    let client = Arc::new(connected(Arc::clone(&handler)).await);

    let calls = (0..10).map(|i| {
        let client = Arc::clone(&client);
        async move {
            let outcome: ToolOutcome<Sum> = client
                .invoke("add", &json!({ "a": i, "b": i }))
                .await
                .unwrap();
            (i, outcome)
        }
    });

    for (i, outcome) in futures::future::join_all(calls).await {
        assert_eq!(outcome, ToolOutcome::Success(Sum { total: i * 2 }));
    }
    assert_eq!(handler.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn test_not_found_and_unknown_tool() {
    let client = connected(Arc::new(Counter::default())).await;

    let outcome: ToolOutcome<Sum> = client
        .invoke("lookup", &json!({ "id": "INC-9" }))
        .await
        .unwrap();
    match outcome {
        ToolOutcome::NotFound(failure) => assert_eq!(failure.details["incident_id"], "INC-9"),
        other => panic!("expected not found, got {other:?}"),
    }

    let outcome: ToolOutcome<Sum> = client.invoke("missing", &json!({})).await.unwrap();
    assert!(matches!(outcome, ToolOutcome::Error(_)));
}

#[tokio::test]
async fn test_calls_fail_after_close() {
    let client = connected(Arc::new(Counter::default())).await;
    client.close().await.unwrap();

    let result = client.invoke::<_, Sum>("add", &json!({ "a": 1, "b": 2 })).await;
    assert!(matches!(result, Err(TransportError::Closed)));
}
