//! SSE transport over a real socket.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use todoist_api::TodoistClient;
use todoist_core::Credential;
use todoist_mcp::{sse, ToolHandler};
use tokio::net::TcpListener;

/// One parsed server-sent event.
#[derive(Debug)]
struct SseEvent {
    event: String,
    data: String,
}

/// Reads events off a streaming response, buffering partial chunks.
struct EventReader {
    response: reqwest::Response,
    buffer: String,
}

impl EventReader {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    async fn next_event(&mut self) -> SseEvent {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let mut event = String::new();
                let mut data = String::new();
                for line in block.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        event = value.trim().to_string();
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push_str(value.trim_start());
                    }
                }
                // Keep-alive comments carry no event name
                if !event.is_empty() {
                    return SseEvent { event, data };
                }
                continue;
            }

            let chunk = tokio::time::timeout(Duration::from_secs(10), self.response.chunk())
                .await
                .expect("timed out waiting for an SSE event")
                .unwrap()
                .expect("SSE stream ended");
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }
}

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let credential = Credential::new("test-token").unwrap();
    let client = TodoistClient::with_base_url("http://127.0.0.1:1", &credential).unwrap();
    let handler = Arc::new(ToolHandler::new(Arc::new(client)));

    tokio::spawn(sse::serve_listener(listener, handler));
    format!("http://{}", address)
}

#[tokio::test]
async fn test_session_roundtrip() {
    let base = start_server().await;
    let http = reqwest::Client::new();

    let stream = http.get(format!("{}/sse", base)).send().await.unwrap();
    assert_eq!(stream.status(), 200);
    let mut events = EventReader::new(stream);

    let endpoint = events.next_event().await;
    assert_eq!(endpoint.event, "endpoint");
    assert!(endpoint.data.starts_with("/messages?session_id="));

    let posted = http
        .post(format!("{}{}", base, endpoint.data))
        .body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {"protocolVersion": "2024-11-05", "capabilities": {}}
            })
            .to_string(),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(posted.status(), 202);

    let message = events.next_event().await;
    assert_eq!(message.event, "message");
    let response: Value = serde_json::from_str(&message.data).unwrap();
    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!("2024-11-05"));

    let posted = http
        .post(format!("{}{}", base, endpoint.data))
        .body(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(posted.status(), 202);

    let message = events.next_event().await;
    let response: Value = serde_json::from_str(&message.data).unwrap();
    assert_eq!(response["id"], json!(2));
    assert!(response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["name"] == json!("get_tasks")));
}

#[tokio::test]
async fn test_malformed_body_gets_parse_error_event() {
    let base = start_server().await;
    let http = reqwest::Client::new();

    let stream = http.get(format!("{}/sse", base)).send().await.unwrap();
    let mut events = EventReader::new(stream);
    let endpoint = events.next_event().await;

    let posted = http
        .post(format!("{}{}", base, endpoint.data))
        .body("{broken")
        .send()
        .await
        .unwrap();
    assert_eq!(posted.status(), 202);

    let message = events.next_event().await;
    let response: Value = serde_json::from_str(&message.data).unwrap();
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], json!(-32700));
}

#[tokio::test]
async fn test_unknown_session_rejected() {
    let base = start_server().await;
    let http = reqwest::Client::new();

    let posted = http
        .post(format!(
            "{}/messages?session_id=00000000-0000-4000-8000-000000000000",
            base
        ))
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(posted.status(), 404);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let base = start_server().await;
    let http = reqwest::Client::new();

    let mut first = EventReader::new(http.get(format!("{}/sse", base)).send().await.unwrap());
    let mut second = EventReader::new(http.get(format!("{}/sse", base)).send().await.unwrap());
    let first_endpoint = first.next_event().await.data;
    let second_endpoint = second.next_event().await.data;
    assert_ne!(first_endpoint, second_endpoint);

    let initialize = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string();
    for endpoint in [&first_endpoint, &second_endpoint] {
        http.post(format!("{}{}", base, endpoint))
            .body(initialize.clone())
            .send()
            .await
            .unwrap();
    }

    // Each session keeps its own initialized flag
    for events in [&mut first, &mut second] {
        let response: Value = serde_json::from_str(&events.next_event().await.data).unwrap();
        assert!(response["result"].is_object(), "{}", response);
    }
}
