//! Project tools.

use serde::Deserialize;
use serde_json::{json, Value};
use todoist_core::types::{CreateProjectInput, UpdateProjectInput};
use todoist_core::{normalize, Error, Provider, Result};

use super::{id_schema, parse_args, require_optional_text, require_text, tool, ProjectIdParams};
use crate::protocol::ToolDefinition;

const VIEW_STYLES: [&str; 2] = ["list", "board"];

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_projects",
            "List all projects",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "get_project",
            "Get a project by id",
            id_schema("project_id", "Project id"),
        ),
        tool(
            "add_project",
            "Create a project",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "parent_id": { "type": "string", "description": "Create as a sub-project" },
                    "color": { "type": "string", "description": "Todoist color name, e.g. \"berry_red\"" },
                    "is_favorite": { "type": "boolean" },
                    "view_style": { "type": "string", "enum": VIEW_STYLES }
                },
                "required": ["name"]
            }),
        ),
        tool(
            "update_project",
            "Update a project",
            json!({
                "type": "object",
                "properties": {
                    "project_id": { "type": "string" },
                    "name": { "type": "string" },
                    "color": { "type": "string" },
                    "is_favorite": { "type": "boolean" },
                    "view_style": { "type": "string", "enum": VIEW_STYLES }
                },
                "required": ["project_id"]
            }),
        ),
        tool(
            "delete_project",
            "Delete a project with all its sections and tasks",
            id_schema("project_id", "Project id"),
        ),
        tool(
            "get_collaborators",
            "List the members of a shared project",
            id_schema("project_id", "Project id"),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct UpdateProjectParams {
    project_id: String,
    #[serde(flatten)]
    changes: UpdateProjectInput,
}

fn validate_view_style(view_style: Option<&str>) -> Result<()> {
    match view_style {
        Some(style) if !VIEW_STYLES.contains(&style) => Err(Error::Validation(format!(
            "'view_style' must be one of {}, got '{}'",
            VIEW_STYLES.join(", "),
            style
        ))),
        _ => Ok(()),
    }
}

/// Find a project id by case-insensitive name.
pub(super) async fn resolve_project_id(provider: &dyn Provider, name: &str) -> Result<String> {
    require_text("project_name", name)?;
    let wanted = name.trim().to_lowercase();

    provider
        .get_projects()
        .await?
        .into_iter()
        .find(|p| p.name.to_lowercase() == wanted)
        .map(|p| p.id)
        .ok_or_else(|| Error::NotFound(format!("Project '{}' not found", name)))
}

pub(super) async fn get_projects(
    provider: &dyn Provider,
    _arguments: Option<Value>,
) -> Result<Value> {
    let projects = provider.get_projects().await?;
    normalize(&projects)
}

pub(super) async fn get_project(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: ProjectIdParams = parse_args(arguments)?;
    require_text("project_id", &params.project_id)?;

    let project = provider.get_project(&params.project_id).await?;
    normalize(&project)
}

pub(super) async fn add_project(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let input: CreateProjectInput = parse_args(arguments)?;
    require_text("name", &input.name)?;
    validate_view_style(input.view_style.as_deref())?;

    let project = provider.add_project(input).await?;
    normalize(&project)
}

pub(super) async fn update_project(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: UpdateProjectParams = parse_args(arguments)?;
    require_text("project_id", &params.project_id)?;
    if params.changes.is_empty() {
        return Err(Error::Validation(
            "Nothing to update: provide at least one field to change".to_string(),
        ));
    }
    require_optional_text("name", params.changes.name.as_deref())?;
    validate_view_style(params.changes.view_style.as_deref())?;

    let project = provider
        .update_project(&params.project_id, params.changes)
        .await?;
    normalize(&project)
}

pub(super) async fn delete_project(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: ProjectIdParams = parse_args(arguments)?;
    require_text("project_id", &params.project_id)?;

    let deleted = provider.delete_project(&params.project_id).await?;
    normalize(&deleted)
}

pub(super) async fn get_collaborators(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: ProjectIdParams = parse_args(arguments)?;
    require_text("project_id", &params.project_id)?;

    let collaborators = provider.get_collaborators(&params.project_id).await?;
    normalize(&collaborators)
}
