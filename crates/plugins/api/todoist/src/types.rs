//! Wire-only request and response shapes.
//!
//! Domain objects deserialize straight into `todoist_core::types`; this
//! module only holds the envelopes and bodies that never leave the client.

use serde::{Deserialize, Serialize};
use todoist_core::types::Attachment;

/// A list endpoint response.
///
/// REST v2 returns a bare array; newer API generations wrap results in a
/// cursor page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Items(Vec<T>),
    Page {
        results: Vec<T>,
        #[serde(default)]
        next_cursor: Option<String>,
    },
}

impl<T> Listing<T> {
    /// Split into this page's items and the cursor of the next page.
    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        match self {
            Listing::Items(items) => (items, None),
            Listing::Page {
                results,
                next_cursor,
            } => (results, next_cursor.filter(|c| !c.is_empty())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateSectionRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateCommentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<&'a str>,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<&'a Attachment>,
}

#[derive(Debug, Serialize)]
pub struct UpdateCommentRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RenameSharedLabelRequest<'a> {
    pub name: &'a str,
    pub new_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RemoveSharedLabelRequest<'a> {
    pub name: &'a str,
}
