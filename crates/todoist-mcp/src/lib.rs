//! MCP (Model Context Protocol) server exposing Todoist as tools.
//!
//! The same [`McpServer`] protocol logic runs behind two transports: stdio
//! ([`transport`]) and HTTP/SSE ([`sse`]).

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod sse;
pub mod transport;

pub use handlers::ToolHandler;
pub use server::McpServer;
