//! Personal and shared label tools.
//!
//! Shared-label rename and remove look the label up first, then mutate by
//! name. Two concurrent renames of the same label race; the last one wins.

use serde::Deserialize;
use serde_json::{json, Value};
use todoist_core::types::{CreateLabelInput, UpdateLabelInput};
use todoist_core::{normalize, Error, Provider, Result};
use tracing::info;

use super::{exclusive, id_schema, parse_args, require_optional_text, require_text, tool};
use crate::protocol::ToolDefinition;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_labels",
            "List personal labels",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "get_label",
            "Get a personal label by id",
            id_schema("label_id", "Label id"),
        ),
        tool(
            "add_label",
            "Create a personal label",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "order": { "type": "integer" },
                    "color": { "type": "string" },
                    "is_favorite": { "type": "boolean" }
                },
                "required": ["name"]
            }),
        ),
        tool(
            "update_label",
            "Update a personal label, identified by id or by current name",
            json!({
                "type": "object",
                "properties": {
                    "label_id": { "type": "string" },
                    "name": { "type": "string", "description": "Current label name (alternative to label_id)" },
                    "new_name": { "type": "string" },
                    "order": { "type": "integer" },
                    "color": { "type": "string" },
                    "is_favorite": { "type": "boolean" }
                }
            }),
        ),
        tool(
            "delete_label",
            "Delete a personal label, identified by id or by name",
            json!({
                "type": "object",
                "properties": {
                    "label_id": { "type": "string" },
                    "name": { "type": "string" }
                }
            }),
        ),
        tool(
            "get_shared_labels",
            "List the names of labels used on shared tasks",
            json!({
                "type": "object",
                "properties": {
                    "omit_personal": { "type": "boolean", "description": "Leave out names that are also personal labels" }
                }
            }),
        ),
        tool(
            "rename_shared_label",
            "Rename a shared label on every task that carries it",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "new_name": { "type": "string" }
                },
                "required": ["name", "new_name"]
            }),
        ),
        tool(
            "remove_shared_label",
            "Remove a shared label from every task that carries it",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" }
                },
                "required": ["name"]
            }),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct LabelIdParams {
    label_id: String,
}

/// A personal label given by id or by name.
#[derive(Debug, Default, Deserialize)]
struct LabelRef {
    label_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateLabelParams {
    #[serde(flatten)]
    label: LabelRef,
    new_name: Option<String>,
    order: Option<i64>,
    color: Option<String>,
    is_favorite: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct GetSharedLabelsParams {
    #[serde(default)]
    omit_personal: bool,
}

#[derive(Debug, Deserialize)]
struct RenameSharedLabelParams {
    name: String,
    new_name: String,
}

#[derive(Debug, Deserialize)]
struct SharedLabelParams {
    name: String,
}

impl LabelRef {
    async fn resolve(&self, provider: &dyn Provider) -> Result<String> {
        exclusive(
            ("label_id", self.label_id.is_some()),
            ("name", self.name.is_some()),
        )?;

        match (&self.label_id, &self.name) {
            (Some(id), _) => {
                require_text("label_id", id)?;
                Ok(id.clone())
            }
            (None, Some(name)) => {
                require_text("name", name)?;
                let wanted = name.trim().to_lowercase();
                provider
                    .get_labels()
                    .await?
                    .into_iter()
                    .find(|l| l.name.to_lowercase() == wanted)
                    .map(|l| l.id)
                    .ok_or_else(|| Error::NotFound(format!("Label '{}' not found", name)))
            }
            (None, None) => Err(Error::Validation(
                "One of 'label_id' or 'name' is required".to_string(),
            )),
        }
    }
}

/// Confirm a shared label exists before mutating it.
async fn ensure_shared_label(provider: &dyn Provider, name: &str) -> Result<()> {
    let shared = provider.get_shared_labels(false).await?;
    if shared.iter().any(|label| label == name) {
        Ok(())
    } else {
        Err(Error::NotFound(format!("Shared label '{}' not found", name)))
    }
}

pub(super) async fn get_labels(
    provider: &dyn Provider,
    _arguments: Option<Value>,
) -> Result<Value> {
    let labels = provider.get_labels().await?;
    normalize(&labels)
}

pub(super) async fn get_label(provider: &dyn Provider, arguments: Option<Value>) -> Result<Value> {
    let params: LabelIdParams = parse_args(arguments)?;
    require_text("label_id", &params.label_id)?;

    let label = provider.get_label(&params.label_id).await?;
    normalize(&label)
}

pub(super) async fn add_label(provider: &dyn Provider, arguments: Option<Value>) -> Result<Value> {
    let input: CreateLabelInput = parse_args(arguments)?;
    require_text("name", &input.name)?;

    let label = provider.add_label(input).await?;
    normalize(&label)
}

pub(super) async fn update_label(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: UpdateLabelParams = parse_args(arguments)?;
    require_optional_text("new_name", params.new_name.as_deref())?;

    let changes = UpdateLabelInput {
        name: params.new_name,
        order: params.order,
        color: params.color,
        is_favorite: params.is_favorite,
    };
    if changes.is_empty() {
        return Err(Error::Validation(
            "Nothing to update: provide at least one field to change".to_string(),
        ));
    }

    let label_id = params.label.resolve(provider).await?;
    let label = provider.update_label(&label_id, changes).await?;
    normalize(&label)
}

pub(super) async fn delete_label(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let label: LabelRef = parse_args(arguments)?;
    let label_id = label.resolve(provider).await?;

    let deleted = provider.delete_label(&label_id).await?;
    normalize(&deleted)
}

pub(super) async fn get_shared_labels(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: GetSharedLabelsParams = parse_args(arguments)?;

    let names = provider.get_shared_labels(params.omit_personal).await?;
    normalize(&names)
}

pub(super) async fn rename_shared_label(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: RenameSharedLabelParams = parse_args(arguments)?;
    require_text("name", &params.name)?;
    require_text("new_name", &params.new_name)?;

    ensure_shared_label(provider, &params.name).await?;
    let renamed = provider
        .rename_shared_label(&params.name, &params.new_name)
        .await?;
    info!(from = %params.name, to = %params.new_name, "Shared label renamed");
    normalize(&renamed)
}

pub(super) async fn remove_shared_label(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: SharedLabelParams = parse_args(arguments)?;
    require_text("name", &params.name)?;

    ensure_shared_label(provider, &params.name).await?;
    let removed = provider.remove_shared_label(&params.name).await?;
    normalize(&removed)
}
