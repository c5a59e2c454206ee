//! Comment tools.

use serde::Deserialize;
use serde_json::{json, Value};
use todoist_core::types::{Attachment, CommentTarget, CreateCommentInput};
use todoist_core::{normalize, Provider, Result};

use super::{id_schema, parse_args, require_text, tool};
use crate::protocol::ToolDefinition;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_comments",
            "List the comments of a task or of a project",
            json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" },
                    "project_id": { "type": "string" }
                }
            }),
        ),
        tool(
            "get_comment",
            "Get a comment by id",
            id_schema("comment_id", "Comment id"),
        ),
        tool(
            "add_comment",
            "Comment on a task or on a project",
            json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" },
                    "project_id": { "type": "string" },
                    "content": { "type": "string" },
                    "attachment": {
                        "type": "object",
                        "properties": {
                            "resource_type": { "type": "string" },
                            "file_name": { "type": "string" },
                            "file_type": { "type": "string" },
                            "file_url": { "type": "string" }
                        }
                    }
                },
                "required": ["content"]
            }),
        ),
        tool(
            "update_comment",
            "Change the text of a comment",
            json!({
                "type": "object",
                "properties": {
                    "comment_id": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["comment_id", "content"]
            }),
        ),
        tool(
            "delete_comment",
            "Delete a comment",
            id_schema("comment_id", "Comment id"),
        ),
    ]
}

#[derive(Debug, Default, Deserialize)]
struct TargetParams {
    task_id: Option<String>,
    project_id: Option<String>,
}

impl TargetParams {
    fn into_target(self) -> Result<CommentTarget> {
        let target = CommentTarget::from_ids(self.task_id, self.project_id)?;
        let (field, id) = target.query_pair();
        require_text(field, id)?;
        Ok(target)
    }
}

#[derive(Debug, Deserialize)]
struct CommentIdParams {
    comment_id: String,
}

#[derive(Debug, Deserialize)]
struct AddCommentParams {
    #[serde(flatten)]
    target: TargetParams,
    content: String,
    attachment: Option<Attachment>,
}

#[derive(Debug, Deserialize)]
struct UpdateCommentParams {
    comment_id: String,
    content: String,
}

pub(super) async fn get_comments(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: TargetParams = parse_args(arguments)?;
    let target = params.into_target()?;

    let comments = provider.get_comments(&target).await?;
    normalize(&comments)
}

pub(super) async fn get_comment(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: CommentIdParams = parse_args(arguments)?;
    require_text("comment_id", &params.comment_id)?;

    let comment = provider.get_comment(&params.comment_id).await?;
    normalize(&comment)
}

pub(super) async fn add_comment(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: AddCommentParams = parse_args(arguments)?;
    require_text("content", &params.content)?;

    let input = CreateCommentInput {
        target: params.target.into_target()?,
        content: params.content,
        attachment: params.attachment,
    };

    let comment = provider.add_comment(input).await?;
    normalize(&comment)
}

pub(super) async fn update_comment(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: UpdateCommentParams = parse_args(arguments)?;
    require_text("comment_id", &params.comment_id)?;
    require_text("content", &params.content)?;

    let comment = provider
        .update_comment(&params.comment_id, &params.content)
        .await?;
    normalize(&comment)
}

pub(super) async fn delete_comment(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: CommentIdParams = parse_args(arguments)?;
    require_text("comment_id", &params.comment_id)?;

    let deleted = provider.delete_comment(&params.comment_id).await?;
    normalize(&deleted)
}
