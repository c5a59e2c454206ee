//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities
//! 2. Handle tool calls - execute tools via the provider
//! 3. Shutdown - the transport closes
//!
//! One `McpServer` exists per client connection: the stdio transport has a
//! single one, the SSE transport one per session. The tool handler behind it
//! is shared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::handlers::ToolHandler;
use crate::protocol::{
    parse_message, IncomingMessage, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, ServerCapabilities,
    ServerInfo, ToolCallParams, ToolsCapability, ToolsListResult, MCP_VERSION, SERVER_NAME,
};

/// MCP protocol state for one client connection.
pub struct McpServer {
    handler: Arc<ToolHandler>,
    initialized: AtomicBool,
}

impl McpServer {
    /// Create a server for a new connection.
    pub fn new(handler: Arc<ToolHandler>) -> Self {
        Self {
            handler,
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether `initialize` has been answered on this connection.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Handle one raw message as read from the transport.
    ///
    /// Returns the response to send back, if any. Unparseable input yields
    /// an error response with a null id.
    pub async fn handle_line(&self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_message(raw) {
            Ok(msg) => self.handle_message(msg).await,
            Err(error) => {
                warn!(code = error.code, "Rejected message: {}", error.message);
                Some(JsonRpcResponse::error(RequestId::Null, error))
            }
        }
    }

    /// Handle an incoming message.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %req.method, id = ?req.id, "Handling request");

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
            method => {
                warn!(method, "Unknown method");
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    /// Handle notifications (no response).
    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "initialized" | "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                debug!("Request cancelled by client");
            }
            method => {
                debug!(method, "Ignoring notification");
            }
        }
    }

    fn handle_initialize(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => {
                    let (client, version) = init
                        .client_info
                        .map(|c| (c.name, c.version))
                        .unwrap_or_default();
                    info!(
                        client = %client,
                        client_version = %version,
                        protocol = %init.protocol_version,
                        "Client connected"
                    );
                }
                Err(e) => {
                    warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.handler.available_tools(),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        info!(tool = %params.name, "Calling tool");

        let result = self.handler.execute(&params.name, params.arguments).await;
        JsonRpcResponse::from_result(id, &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ToolCallResult, JSONRPC_VERSION};
    use serde_json::json;
    use todoist_api::TodoistClient;
    use todoist_core::Credential;

    /// Server whose provider points at a closed port; only calls that never
    /// reach the network are exercised here.
    fn offline_server() -> McpServer {
        let credential = Credential::new("test-token").unwrap();
        let client = TodoistClient::with_base_url("http://127.0.0.1:1", &credential).unwrap();
        McpServer::new(Arc::new(ToolHandler::new(Arc::new(client))))
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize_response() {
        let server = offline_server();
        assert!(!server.is_initialized());

        let resp = server
            .handle_request(request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0.0"}
                })),
            ))
            .await;

        assert!(resp.error.is_none());
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], json!(MCP_VERSION));
        assert_eq!(result["serverInfo"]["name"], json!("todoist"));
        assert_eq!(result["capabilities"]["tools"]["listChanged"], json!(false));
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_with_partial_params() {
        let server = offline_server();
        let resp = server
            .handle_request(request(1, "initialize", Some(json!({"invalid": true}))))
            .await;
        assert!(resp.result.is_some());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_double_initialize_error() {
        let server = offline_server();
        server.handle_request(request(1, "initialize", None)).await;

        let resp = server.handle_request(request(2, "initialize", None)).await;
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = offline_server();
        let resp = server.handle_request(request(1, "tools/list", None)).await;

        let result: ToolsListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.tools.iter().any(|t| t.name == "add_task"));
        assert!(result.tools.iter().any(|t| t.name == "rename_shared_label"));
    }

    #[tokio::test]
    async fn test_ping() {
        let server = offline_server();
        let resp = server
            .handle_request(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: RequestId::String("ping-1".to_string()),
                method: "ping".to_string(),
                params: None,
            })
            .await;

        assert_eq!(resp.id, RequestId::String("ping-1".to_string()));
        assert_eq!(resp.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = offline_server();
        let resp = server
            .handle_request(request(1, "resources/list", None))
            .await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_call_params_errors() {
        let server = offline_server();

        let resp = server.handle_request(request(1, "tools/call", None)).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);

        let resp = server
            .handle_request(request(2, "tools/call", Some(json!("not an object"))))
            .await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tools_call_validation_error_is_tool_result() {
        let server = offline_server();
        let resp = server
            .handle_request(request(
                1,
                "tools/call",
                Some(json!({"name": "get_task", "arguments": {}})),
            ))
            .await;

        assert!(resp.error.is_none());
        let result: ToolCallResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.is_error, Some(true));
        let payload: Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
        assert_eq!(payload["kind"], json!("validation_error"));
    }

    #[tokio::test]
    async fn test_handle_line() {
        let server = offline_server();

        let resp = server
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(resp.id, RequestId::Number(7));

        let resp = server.handle_line("{not json").await.unwrap();
        assert_eq!(resp.id, RequestId::Null);
        assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);

        let resp = server.handle_line("[1, 2]").await.unwrap();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = offline_server();
        for method in [
            "notifications/initialized",
            "initialized",
            "notifications/cancelled",
            "some/unknown/notification",
        ] {
            let line = json!({"jsonrpc": "2.0", "method": method}).to_string();
            assert!(server.handle_line(&line).await.is_none(), "{}", method);
        }
    }
}
