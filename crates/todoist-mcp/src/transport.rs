//! Stdio transport for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout. Each request runs on its
//! own task; a single writer task owns the output so responses never
//! interleave.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::protocol::JsonRpcResponse;
use crate::server::McpServer;

/// Pending responses buffered between request tasks and the writer.
const RESPONSE_BUFFER: usize = 64;

/// Serve MCP over the process stdin/stdout until stdin closes.
pub async fn run_stdio(server: Arc<McpServer>) -> io::Result<()> {
    info!("Serving MCP over stdio");
    serve_lines(server, tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("EOF received, shutting down");
    Ok(())
}

/// Serve MCP over any line-oriented reader/writer pair.
pub async fn serve_lines<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_BUFFER);
    let writer_task = tokio::spawn(write_responses(rx, writer));

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        debug!("Received: {}", line);

        let server = server.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_line(&line).await {
                // Receiver gone means the writer already failed
                let _ = tx.send(response).await;
            }
        });
    }

    drop(tx);
    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(io::Error::other(e)),
    }
}

async fn write_responses<W>(mut rx: mpsc::Receiver<JsonRpcResponse>, mut writer: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        debug!("Sending: {}", json);

        if let Err(e) = write_line(&mut writer, &json).await {
            error!("Failed to write response: {}", e);
            return Err(e);
        }
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> io::Result<()> {
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ToolHandler;
    use crate::protocol::{JsonRpcError, RequestId};
    use serde_json::json;
    use todoist_api::TodoistClient;
    use todoist_core::Credential;
    use tokio::io::{duplex, AsyncReadExt};

    fn offline_server() -> Arc<McpServer> {
        let credential = Credential::new("test-token").unwrap();
        let client = TodoistClient::with_base_url("http://127.0.0.1:1", &credential).unwrap();
        Arc::new(McpServer::new(Arc::new(ToolHandler::new(Arc::new(client)))))
    }

    /// Feed `input` through the transport and collect the parsed responses.
    async fn exchange(input: &str) -> Vec<JsonRpcResponse> {
        let (mut client_out, server_in) = duplex(1 << 20);
        let (server_out, mut client_in) = duplex(1 << 20);

        client_out.write_all(input.as_bytes()).await.unwrap();
        drop(client_out);

        serve_lines(offline_server(), server_in, server_out)
            .await
            .unwrap();

        let mut output = String::new();
        client_in.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_request_and_notification() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
        );

        let responses = exchange(input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, RequestId::Number(1));
        assert!(responses[0].result.is_some());
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let responses = exchange("this is not json\n").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, RequestId::Null);
        assert_eq!(
            responses[0].error.as_ref().unwrap().code,
            JsonRpcError::PARSE_ERROR
        );
    }

    #[tokio::test]
    async fn test_concurrent_requests_each_answered() {
        let mut input = String::new();
        for id in 0..20 {
            input.push_str(&json!({"jsonrpc": "2.0", "id": id, "method": "ping"}).to_string());
            input.push('\n');
        }
        input.push_str("\n   \n");

        let responses = exchange(&input).await;
        assert_eq!(responses.len(), 20);

        let mut ids: Vec<i64> = responses
            .iter()
            .map(|r| match r.id {
                RequestId::Number(n) => n,
                _ => panic!("unexpected id {:?}", r.id),
            })
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_eof_without_input() {
        assert!(exchange("").await.is_empty());
    }
}
