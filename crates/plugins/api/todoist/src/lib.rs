//! Todoist REST API client for todoist-mcp.
//!
//! [`TodoistClient`] implements every provider trait from `todoist-core`
//! against the REST v2 API. Building a client performs no network I/O.

mod client;
mod types;

pub use client::{create_client, TodoistClient};

/// Default Todoist API URL.
pub const DEFAULT_TODOIST_URL: &str = "https://api.todoist.com/rest/v2";
