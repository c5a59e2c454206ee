//! Tool calls through the MCP server against a mocked Todoist API.

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::{json, Value};
use todoist_api::TodoistClient;
use todoist_core::Credential;
use todoist_mcp::protocol::{JsonRpcRequest, RequestId, ToolCallResult, JSONRPC_VERSION};
use todoist_mcp::{McpServer, ToolHandler};

fn server_for(mock: &MockServer) -> McpServer {
    let credential = Credential::new("test-token").unwrap();
    let client = TodoistClient::with_base_url(mock.base_url(), &credential).unwrap();
    McpServer::new(Arc::new(ToolHandler::new(Arc::new(client))))
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> ToolCallResult {
    let response = server
        .handle_request(JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(1),
            method: "tools/call".to_string(),
            params: Some(json!({"name": name, "arguments": arguments})),
        })
        .await;

    assert!(response.error.is_none(), "{:?}", response.error);
    serde_json::from_value(response.result.unwrap()).unwrap()
}

fn payload(result: &ToolCallResult) -> Value {
    serde_json::from_str(result.first_text().unwrap()).unwrap()
}

#[tokio::test]
async fn test_add_task_due_tomorrow() {
    let mock = MockServer::start();
    let create = mock.mock(|when, then| {
        when.method(POST)
            .path("/tasks")
            .header("Authorization", "Bearer test-token")
            .json_body(json!({"content": "Buy milk", "due_string": "tomorrow"}));
        then.status(200).json_body(json!({
            "id": "8796",
            "project_id": "2203306141",
            "content": "Buy milk",
            "priority": 1,
            "created_at": "2024-01-10T08:00:00.000000Z",
            "due": {
                "date": "2024-01-11",
                "string": "tomorrow",
                "is_recurring": false
            }
        }));
    });

    let server = server_for(&mock);
    let result = call_tool(
        &server,
        "add_task",
        json!({"content": "Buy milk", "due_string": "tomorrow"}),
    )
    .await;

    create.assert();
    assert!(result.is_error.is_none());

    let task = payload(&result);
    assert_eq!(task["id"], json!("8796"));
    assert_eq!(task["content"], json!("Buy milk"));
    assert_eq!(task["due"]["string"], json!("tomorrow"));
    assert_eq!(task["due"]["date"], json!("2024-01-11"));
    assert_eq!(task["due"]["datetime"], Value::Null);
    assert_eq!(task["created_at"], json!("2024-01-10T08:00:00+00:00"));
}

#[tokio::test]
async fn test_missing_required_argument_never_reaches_upstream() {
    let mock = MockServer::start();
    let create = mock.mock(|when, then| {
        when.method(POST).path("/tasks");
        then.status(200).json_body(json!({}));
    });

    let server = server_for(&mock);
    let result = call_tool(&server, "add_task", json!({"due_string": "tomorrow"})).await;

    create.assert_hits(0);
    assert_eq!(result.is_error, Some(true));
    assert_eq!(payload(&result)["kind"], json!("validation_error"));
}

#[tokio::test]
async fn test_unknown_task_is_upstream_not_found() {
    let mock = MockServer::start();
    mock.mock(|when, then| {
        when.method(GET).path("/tasks/404404");
        then.status(404).body("Task not found");
    });

    let server = server_for(&mock);
    let result = call_tool(&server, "get_task", json!({"task_id": "404404"})).await;

    assert_eq!(result.is_error, Some(true));
    let error = payload(&result);
    assert_eq!(error["kind"], json!("upstream_error"));
    assert_eq!(error["status"], json!(404));
    assert!(error["message"]
        .as_str()
        .unwrap()
        .contains("Task not found"));
}

#[tokio::test]
async fn test_get_tasks_follows_cursor() {
    let mock = MockServer::start();
    mock.mock(|when, then| {
        when.method(GET)
            .path("/tasks")
            .query_param("project_id", "p1")
            .query_param_missing("cursor");
        then.status(200).json_body(json!({
            "results": [{"id": "1", "project_id": "p1", "content": "First"}],
            "next_cursor": "next"
        }));
    });
    mock.mock(|when, then| {
        when.method(GET)
            .path("/tasks")
            .query_param("project_id", "p1")
            .query_param("cursor", "next");
        then.status(200).json_body(json!({
            "results": [{"id": "2", "project_id": "p1", "content": "Second"}],
            "next_cursor": null
        }));
    });

    let server = server_for(&mock);
    let result = call_tool(&server, "get_tasks", json!({"project_id": "p1"})).await;

    let tasks = payload(&result);
    let contents: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["First", "Second"]);
}

#[tokio::test]
async fn test_add_task_by_project_name() {
    let mock = MockServer::start();
    mock.mock(|when, then| {
        when.method(GET).path("/projects");
        then.status(200).json_body(json!([
            {"id": "111", "name": "Inbox"},
            {"id": "222", "name": "Errands"}
        ]));
    });
    let create = mock.mock(|when, then| {
        when.method(POST)
            .path("/tasks")
            .json_body(json!({"content": "Post letter", "project_id": "222"}));
        then.status(200).json_body(json!({
            "id": "9",
            "project_id": "222",
            "content": "Post letter"
        }));
    });

    let server = server_for(&mock);
    let result = call_tool(
        &server,
        "add_task",
        json!({"content": "Post letter", "project_name": "errands"}),
    )
    .await;

    create.assert();
    assert_eq!(payload(&result)["project_id"], json!("222"));
}

#[tokio::test]
async fn test_rate_limit_status_reported() {
    let mock = MockServer::start();
    mock.mock(|when, then| {
        when.method(GET).path("/labels");
        then.status(429).body("Too many requests");
    });

    let server = server_for(&mock);
    let result = call_tool(&server, "get_labels", json!({})).await;

    let error = payload(&result);
    assert_eq!(error["kind"], json!("upstream_error"));
    assert_eq!(error["status"], json!(429));
}

#[tokio::test]
async fn test_task_id_cannot_escape_its_endpoint() {
    let mock = MockServer::start();
    let delete_project = mock.mock(|when, then| {
        when.method(DELETE).path("/projects/5");
        then.status(204);
    });
    let close = mock.mock(|when, then| {
        when.method(POST).path("/tasks/42/close");
        then.status(204);
    });

    let server = server_for(&mock);
    let result = call_tool(
        &server,
        "delete_task",
        json!({"task_id": "1/../../projects/5"}),
    )
    .await;
    assert_eq!(result.is_error, Some(true));

    let result = call_tool(
        &server,
        "update_task",
        json!({"task_id": "42/close", "content": "x"}),
    )
    .await;
    assert_eq!(result.is_error, Some(true));

    let result = call_tool(&server, "delete_project", json!({"project_id": ".."})).await;
    assert_eq!(result.is_error, Some(true));
    assert_eq!(payload(&result)["kind"], json!("validation_error"));

    delete_project.assert_hits(0);
    close.assert_hits(0);
}
