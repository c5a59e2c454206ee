//! Tool handlers for the MCP server.
//!
//! Each tool parses its arguments into a typed parameter struct, validates
//! it, calls the provider, and returns the normalized result as pretty JSON
//! text. Failures never escape as protocol errors: they become a tool result
//! with `isError` set and a `{kind, message, status?}` payload.

mod comments;
mod labels;
mod projects;
mod sections;
mod tasks;


use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use todoist_core::{Error, Provider, Result};
use tracing::{debug, warn};

use crate::protocol::{ToolCallResult, ToolDefinition};

/// Executes tools against the upstream provider.
///
/// Holds no mutable state; one handler is shared by every connection.
pub struct ToolHandler {
    provider: Arc<dyn Provider>,
}

impl ToolHandler {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Get available tool definitions.
    pub fn available_tools(&self) -> Vec<ToolDefinition> {
        let mut tools = tasks::definitions();
        tools.extend(projects::definitions());
        tools.extend(sections::definitions());
        tools.extend(labels::definitions());
        tools.extend(comments::definitions());
        tools
    }

    /// Execute a tool by name with arguments.
    pub async fn execute(&self, name: &str, arguments: Option<Value>) -> ToolCallResult {
        debug!(
            tool = name,
            provider = self.provider.provider_name(),
            "Executing tool"
        );

        match self.dispatch(name, arguments).await {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => ToolCallResult::text(text),
                Err(e) => error_result(&Error::from(e)),
            },
            Err(e) => {
                warn!(tool = name, kind = %e.kind(), error = %e, "Tool call failed");
                error_result(&e)
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: Option<Value>) -> Result<Value> {
        let provider = self.provider.as_ref();

        match name {
            // Tasks
            "get_tasks" => tasks::get_tasks(provider, arguments).await,
            "get_task" => tasks::get_task(provider, arguments).await,
            "add_task" => tasks::add_task(provider, arguments).await,
            "update_task" => tasks::update_task(provider, arguments).await,
            "close_task" | "complete_task" => tasks::close_task(provider, arguments).await,
            "reopen_task" => tasks::reopen_task(provider, arguments).await,
            "update_task_status" => tasks::update_task_status(provider, arguments).await,
            "delete_task" => tasks::delete_task(provider, arguments).await,

            // Projects
            "get_projects" => projects::get_projects(provider, arguments).await,
            "get_project" => projects::get_project(provider, arguments).await,
            "add_project" => projects::add_project(provider, arguments).await,
            "update_project" => projects::update_project(provider, arguments).await,
            "delete_project" => projects::delete_project(provider, arguments).await,
            "get_collaborators" => projects::get_collaborators(provider, arguments).await,

            // Sections
            "get_sections" => sections::get_sections(provider, arguments).await,
            "get_section" => sections::get_section(provider, arguments).await,
            "add_section" => sections::add_section(provider, arguments).await,
            "update_section" => sections::update_section(provider, arguments).await,
            "delete_section" => sections::delete_section(provider, arguments).await,

            // Labels
            "get_labels" => labels::get_labels(provider, arguments).await,
            "get_label" => labels::get_label(provider, arguments).await,
            "add_label" => labels::add_label(provider, arguments).await,
            "update_label" => labels::update_label(provider, arguments).await,
            "delete_label" => labels::delete_label(provider, arguments).await,
            "get_shared_labels" => labels::get_shared_labels(provider, arguments).await,
            "rename_shared_label" => labels::rename_shared_label(provider, arguments).await,
            "remove_shared_label" => labels::remove_shared_label(provider, arguments).await,

            // Comments
            "get_comments" => comments::get_comments(provider, arguments).await,
            "get_comment" => comments::get_comment(provider, arguments).await,
            "add_comment" => comments::add_comment(provider, arguments).await,
            "update_comment" => comments::update_comment(provider, arguments).await,
            "delete_comment" => comments::delete_comment(provider, arguments).await,

            _ => Err(Error::Validation(format!("Unknown tool: {}", name))),
        }
    }
}

/// Structured error payload returned to the client.
pub fn error_result(err: &Error) -> ToolCallResult {
    let mut payload = json!({
        "kind": err.kind(),
        "message": err.to_string(),
    });
    if let Some(status) = err.status() {
        payload["status"] = json!(status);
    }
    ToolCallResult::error(payload.to_string())
}

// =============================================================================
// Shared helpers
// =============================================================================

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Deserialize tool arguments; absent arguments read as `{}`.
fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T> {
    let value = match arguments {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };
    serde_json::from_value(value)
        .map_err(|e| Error::Validation(format!("Invalid arguments: {}", e)))
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

fn require_optional_text(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => require_text(field, value),
        None => Ok(()),
    }
}

fn exclusive(first: (&str, bool), second: (&str, bool)) -> Result<()> {
    if first.1 && second.1 {
        return Err(Error::Validation(format!(
            "Provide either '{}' or '{}', not both",
            first.0, second.0
        )));
    }
    Ok(())
}

/// Schema for a tool taking a single required id.
fn id_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: { "type": "string", "description": description }
        },
        "required": [field]
    })
}

#[derive(Debug, serde::Deserialize)]
struct TaskIdParams {
    task_id: String,
}

#[derive(Debug, serde::Deserialize)]
struct ProjectIdParams {
    project_id: String,
}
