//! Provider traits for the upstream task-management service.
//!
//! One method per upstream operation, split by resource the same way the
//! tool surface is split. [`Provider`] bundles all of them into the client
//! handle the tool handlers hold.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Collaborator, Comment, CommentTarget, CreateCommentInput, CreateLabelInput,
    CreateProjectInput, CreateSectionInput, CreateTaskInput, Label, Project, Section, Task,
    TaskFilter, UpdateLabelInput, UpdateProjectInput, UpdateTaskInput,
};

/// Task operations.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// List active tasks matching the filter.
    async fn get_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>>;

    async fn get_task(&self, task_id: &str) -> Result<Task>;

    async fn add_task(&self, input: CreateTaskInput) -> Result<Task>;

    async fn update_task(&self, task_id: &str, input: UpdateTaskInput) -> Result<Task>;

    /// Complete a task. Returns `true` on success.
    async fn close_task(&self, task_id: &str) -> Result<bool>;

    /// Uncomplete a task. Returns `true` on success.
    async fn reopen_task(&self, task_id: &str) -> Result<bool>;

    async fn delete_task(&self, task_id: &str) -> Result<bool>;
}

/// Project and section operations.
#[async_trait]
pub trait ProjectProvider: Send + Sync {
    async fn get_projects(&self) -> Result<Vec<Project>>;

    async fn get_project(&self, project_id: &str) -> Result<Project>;

    async fn add_project(&self, input: CreateProjectInput) -> Result<Project>;

    async fn update_project(&self, project_id: &str, input: UpdateProjectInput)
        -> Result<Project>;

    async fn delete_project(&self, project_id: &str) -> Result<bool>;

    async fn get_collaborators(&self, project_id: &str) -> Result<Vec<Collaborator>>;

    /// List sections, optionally limited to one project.
    async fn get_sections(&self, project_id: Option<&str>) -> Result<Vec<Section>>;

    async fn get_section(&self, section_id: &str) -> Result<Section>;

    async fn add_section(&self, input: CreateSectionInput) -> Result<Section>;

    async fn update_section(&self, section_id: &str, name: &str) -> Result<Section>;

    async fn delete_section(&self, section_id: &str) -> Result<bool>;
}

/// Personal and shared label operations.
#[async_trait]
pub trait LabelProvider: Send + Sync {
    async fn get_labels(&self) -> Result<Vec<Label>>;

    async fn get_label(&self, label_id: &str) -> Result<Label>;

    async fn add_label(&self, input: CreateLabelInput) -> Result<Label>;

    async fn update_label(&self, label_id: &str, input: UpdateLabelInput) -> Result<Label>;

    async fn delete_label(&self, label_id: &str) -> Result<bool>;

    /// Names of labels used on shared tasks.
    async fn get_shared_labels(&self, omit_personal: bool) -> Result<Vec<String>>;

    async fn rename_shared_label(&self, name: &str, new_name: &str) -> Result<bool>;

    async fn remove_shared_label(&self, name: &str) -> Result<bool>;
}

/// Comment operations.
#[async_trait]
pub trait CommentProvider: Send + Sync {
    async fn get_comments(&self, target: &CommentTarget) -> Result<Vec<Comment>>;

    async fn get_comment(&self, comment_id: &str) -> Result<Comment>;

    async fn add_comment(&self, input: CreateCommentInput) -> Result<Comment>;

    async fn update_comment(&self, comment_id: &str, content: &str) -> Result<Comment>;

    async fn delete_comment(&self, comment_id: &str) -> Result<bool>;
}

/// Full upstream client handle.
pub trait Provider: TaskProvider + ProjectProvider + LabelProvider + CommentProvider {
    /// Provider name used in logs.
    fn provider_name(&self) -> &'static str {
        "todoist"
    }
}
