//! Section tools.

use serde::Deserialize;
use serde_json::{json, Value};
use todoist_core::types::CreateSectionInput;
use todoist_core::{normalize, Error, Provider, Result};

use super::{id_schema, parse_args, require_text, tool};
use crate::protocol::ToolDefinition;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_sections",
            "List sections, optionally only those of one project",
            json!({
                "type": "object",
                "properties": {
                    "project_id": { "type": "string" }
                }
            }),
        ),
        tool(
            "get_section",
            "Get a section by id",
            id_schema("section_id", "Section id"),
        ),
        tool(
            "add_section",
            "Create a section in a project",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "project_id": { "type": "string" },
                    "order": { "type": "integer" }
                },
                "required": ["name", "project_id"]
            }),
        ),
        tool(
            "update_section",
            "Rename a section",
            json!({
                "type": "object",
                "properties": {
                    "section_id": { "type": "string" },
                    "name": { "type": "string" }
                },
                "required": ["section_id", "name"]
            }),
        ),
        tool(
            "delete_section",
            "Delete a section and its tasks",
            id_schema("section_id", "Section id"),
        ),
    ]
}

#[derive(Debug, Default, Deserialize)]
struct GetSectionsParams {
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SectionIdParams {
    section_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateSectionParams {
    section_id: String,
    name: String,
}

/// Find a section id by case-insensitive name, within a project when one is
/// known.
pub(super) async fn resolve_section_id(
    provider: &dyn Provider,
    project_id: Option<&str>,
    name: &str,
) -> Result<String> {
    require_text("section_name", name)?;
    let wanted = name.trim().to_lowercase();

    let found = provider
        .get_sections(project_id)
        .await?
        .into_iter()
        .find(|s| s.name.to_lowercase() == wanted)
        .map(|s| s.id);

    found.ok_or_else(|| match project_id {
        Some(project_id) => Error::NotFound(format!(
            "Section '{}' not found in project {}",
            name, project_id
        )),
        None => Error::NotFound(format!("Section '{}' not found", name)),
    })
}

pub(super) async fn get_sections(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: GetSectionsParams = parse_args(arguments)?;

    let sections = provider.get_sections(params.project_id.as_deref()).await?;
    normalize(&sections)
}

pub(super) async fn get_section(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: SectionIdParams = parse_args(arguments)?;
    require_text("section_id", &params.section_id)?;

    let section = provider.get_section(&params.section_id).await?;
    normalize(&section)
}

pub(super) async fn add_section(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let input: CreateSectionInput = parse_args(arguments)?;
    require_text("name", &input.name)?;
    require_text("project_id", &input.project_id)?;

    let section = provider.add_section(input).await?;
    normalize(&section)
}

pub(super) async fn update_section(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: UpdateSectionParams = parse_args(arguments)?;
    require_text("section_id", &params.section_id)?;
    require_text("name", &params.name)?;

    let section = provider
        .update_section(&params.section_id, &params.name)
        .await?;
    normalize(&section)
}

pub(super) async fn delete_section(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: SectionIdParams = parse_args(arguments)?;
    require_text("section_id", &params.section_id)?;

    let deleted = provider.delete_section(&params.section_id).await?;
    normalize(&deleted)
}
