//! The ticketing tools served over MCP against a mocked GitHub API.

use std::sync::Arc;

use incident_model::wire::{
    ticketing_tools, CreateTicketArgs, CreateTicketReply, ListRecentTicketsArgs, TicketList,
    UpdateTicketStatusArgs, UpdateTicketStatusReply,
};
use incident_model::{Severity, SeverityFilter, TicketStatus};
use serde_json::json;
use ticketing::{FileTicketLedger, GitHubClient, TicketService, TicketingHandler};
use tools::{Implementation, McpClient, ToolOutcome, Transport};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connect(github: &MockServer, ledger: FileTicketLedger) -> McpClient {
    let repository = "acme/ops".parse().unwrap();
    let tracker = GitHubClient::new(&github.uri(), "token", "acme/ops".parse().unwrap()).unwrap();
    let service = TicketService::new(repository, Arc::new(tracker), Arc::new(ledger));

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    tokio::spawn(tools::serve(
        Arc::new(TicketingHandler::new(Arc::new(service))),
        server_read,
        server_write,
    ));

    let (client_read, client_write) = tokio::io::split(client_io);
    McpClient::connect(
        Transport::from_io("ticketing", client_read, client_write),
        Implementation::new("ticketing-test", "0.0.0"),
    )
    .await
    .unwrap()
}

fn create_args() -> CreateTicketArgs {
    CreateTicketArgs {
        incident_id: "INC-2026-001".to_string(),
        title: "Checkout failing".to_string(),
        description: "45% of checkout requests return 500".to_string(),
        severity: Severity::Critical,
        affected_users: Some(12000),
        service: Some("api-gateway".to_string()),
        region: Some("us-east-1".to_string()),
    }
}

#[tokio::test]
async fn test_create_is_idempotent_across_restarts() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ops/issues"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 17,
            "html_url": "https://github.com/acme/ops/issues/17",
            "title": "[CRITICAL] Checkout failing",
            "state": "open",
            "created_at": "2026-02-12T10:23:00Z",
            "labels": []
        })))
        .expect(1)
        .mount(&github)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("ledger.json");

    let client = connect(&github, FileTicketLedger::open(&ledger_path).await.unwrap()).await;
    let first: ToolOutcome<CreateTicketReply> = client
        .invoke(ticketing_tools::CREATE_INCIDENT_TICKET, &create_args())
        .await
        .unwrap();
    let ToolOutcome::Success(first) = first else {
        panic!("create failed: {first:?}");
    };
    assert!(!first.duplicate);
    assert_eq!(first.ticket_number, 17);
    client.close().await.unwrap();

    // A fresh provider process reads the same ledger.
    let client = connect(&github, FileTicketLedger::open(&ledger_path).await.unwrap()).await;
    let second: ToolOutcome<CreateTicketReply> = client
        .invoke(ticketing_tools::CREATE_INCIDENT_TICKET, &create_args())
        .await
        .unwrap();
    let ToolOutcome::Success(second) = second else {
        panic!("create failed: {second:?}");
    };
    assert!(second.duplicate);
    assert_eq!(second.ticket_number, 17);
    assert_eq!(second.ticket_url, first.ticket_url);
}

#[tokio::test]
async fn test_update_status_comments_and_labels() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ops/issues/17/comments"))
        .and(body_json(json!({ "body": "**Status Update: resolved**\n\nPool resized" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "html_url": "https://github.com/acme/ops/issues/17#issuecomment-9"
        })))
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ops/issues/17/labels"))
        .and(body_json(json!({ "labels": ["status:resolved"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "name": "status:resolved" }])),
        )
        .expect(1)
        .mount(&github)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = FileTicketLedger::open(dir.path().join("l.json")).await.unwrap();
    let client = connect(&github, ledger).await;
    let outcome: ToolOutcome<UpdateTicketStatusReply> = client
        .invoke(
            ticketing_tools::UPDATE_TICKET_STATUS,
            &UpdateTicketStatusArgs {
                ticket_number: 17,
                status: TicketStatus::Resolved,
                comment: Some("Pool resized".to_string()),
            },
        )
        .await
        .unwrap();

    let ToolOutcome::Success(reply) = outcome else {
        panic!("update failed: {outcome:?}");
    };
    assert_eq!(reply.comment_url, "https://github.com/acme/ops/issues/17#issuecomment-9");
    assert_eq!(reply.repository, "acme/ops");
}

#[tokio::test]
async fn test_list_recent_tickets_filters_by_severity() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ops/issues"))
        .and(query_param("labels", "incident,severity:critical"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "number": 17,
            "html_url": "https://github.com/acme/ops/issues/17",
            "title": "[CRITICAL] Checkout failing",
            "state": "open",
            "created_at": "2026-02-12T10:23:00Z",
            "labels": [{ "name": "incident" }, { "name": "severity:critical" }]
        }])))
        .mount(&github)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = FileTicketLedger::open(dir.path().join("l.json")).await.unwrap();
    let client = connect(&github, ledger).await;
    let outcome: ToolOutcome<TicketList> = client
        .invoke(
            ticketing_tools::LIST_RECENT_TICKETS,
            &ListRecentTicketsArgs {
                limit: 500,
                severity: SeverityFilter::Critical,
            },
        )
        .await
        .unwrap();

    let ToolOutcome::Success(list) = outcome else {
        panic!("list failed: {outcome:?}");
    };
    assert_eq!(list.total, 1);
    assert_eq!(list.tickets[0].labels, vec!["incident", "severity:critical"]);
}

#[tokio::test]
async fn test_github_failure_is_tool_error() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ops/issues"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Resource not accessible"))
        .mount(&github)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = FileTicketLedger::open(dir.path().join("l.json")).await.unwrap();
    let client = connect(&github, ledger).await;
    let outcome: ToolOutcome<CreateTicketReply> = client
        .invoke(ticketing_tools::CREATE_INCIDENT_TICKET, &create_args())
        .await
        .unwrap();
    match outcome {
        ToolOutcome::Error(failure) => {
            assert_eq!(failure.error, "Tool execution failed");
            assert!(failure.message.unwrap().contains("403"));
        }
        other => panic!("expected tool error, got {other:?}"),
    }
}
