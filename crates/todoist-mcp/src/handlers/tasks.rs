//! Task tools.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use todoist_core::types::{CreateTaskInput, DurationUnit, TaskFilter, Timestamp, UpdateTaskInput};
use todoist_core::{normalize, Error, Provider, Result};
use tracing::info;

use super::{
    exclusive, id_schema, parse_args, projects, require_optional_text, require_text, sections,
    tool, TaskIdParams,
};
use crate::protocol::ToolDefinition;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "get_tasks",
            "List active tasks, optionally filtered by project, section, label, ids or a Todoist filter query",
            json!({
                "type": "object",
                "properties": {
                    "project_id": { "type": "string", "description": "Only tasks in this project" },
                    "section_id": { "type": "string", "description": "Only tasks in this section" },
                    "label": { "type": "string", "description": "Only tasks carrying this label name" },
                    "filter": { "type": "string", "description": "Todoist filter query, e.g. \"today | overdue\"" },
                    "lang": { "type": "string", "description": "Language of the filter query (IETF tag)" },
                    "ids": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only tasks with these ids"
                    }
                }
            }),
        ),
        tool(
            "get_task",
            "Get a single active task by id",
            id_schema("task_id", "Task id"),
        ),
        tool(
            "add_task",
            "Create a task. The project and section may be given by id or by name",
            json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "Task title (markdown allowed)" },
                    "description": { "type": "string" },
                    "project_id": { "type": "string" },
                    "project_name": { "type": "string", "description": "Project name, matched case-insensitively" },
                    "section_id": { "type": "string" },
                    "section_name": { "type": "string", "description": "Section name, matched case-insensitively within the project" },
                    "parent_id": { "type": "string", "description": "Create as a subtask of this task" },
                    "order": { "type": "integer" },
                    "labels": { "type": "array", "items": { "type": "string" } },
                    "priority": { "type": "integer", "minimum": 1, "maximum": 4, "description": "1 (normal) to 4 (urgent)" },
                    "due_string": { "type": "string", "description": "Natural language due date, e.g. \"tomorrow at 5pm\"" },
                    "due_date": { "type": "string", "format": "date", "description": "YYYY-MM-DD" },
                    "due_datetime": { "type": "string", "format": "date-time", "description": "RFC 3339 date-time" },
                    "due_lang": { "type": "string" },
                    "assignee_id": { "type": "string" },
                    "duration": { "type": "integer", "minimum": 1 },
                    "duration_unit": { "type": "string", "enum": ["minute", "day"] },
                    "deadline_date": { "type": "string", "format": "date", "description": "YYYY-MM-DD" }
                },
                "required": ["content"]
            }),
        ),
        tool(
            "update_task",
            "Update fields of a task. Only the given fields change",
            json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" },
                    "content": { "type": "string" },
                    "description": { "type": "string" },
                    "labels": { "type": "array", "items": { "type": "string" } },
                    "priority": { "type": "integer", "minimum": 1, "maximum": 4 },
                    "due_string": { "type": "string" },
                    "due_date": { "type": "string", "format": "date" },
                    "due_datetime": { "type": "string", "format": "date-time" },
                    "due_lang": { "type": "string" },
                    "assignee_id": { "type": "string" },
                    "duration": { "type": "integer", "minimum": 1 },
                    "duration_unit": { "type": "string", "enum": ["minute", "day"] },
                    "deadline_date": { "type": "string", "format": "date" }
                },
                "required": ["task_id"]
            }),
        ),
        tool(
            "close_task",
            "Mark a task as completed",
            id_schema("task_id", "Task id"),
        ),
        tool(
            "complete_task",
            "Mark a task as completed (same as close_task)",
            id_schema("task_id", "Task id"),
        ),
        tool(
            "reopen_task",
            "Reopen a completed task",
            id_schema("task_id", "Task id"),
        ),
        tool(
            "update_task_status",
            "Complete or uncomplete a task",
            json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" },
                    "status": { "type": "string", "enum": ["complete", "uncomplete"] }
                },
                "required": ["task_id", "status"]
            }),
        ),
        tool(
            "delete_task",
            "Delete a task and its subtasks",
            id_schema("task_id", "Task id"),
        ),
    ]
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct GetTasksParams {
    project_id: Option<String>,
    section_id: Option<String>,
    label: Option<String>,
    filter: Option<String>,
    lang: Option<String>,
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AddTaskParams {
    content: String,
    description: Option<String>,
    project_id: Option<String>,
    project_name: Option<String>,
    section_id: Option<String>,
    section_name: Option<String>,
    parent_id: Option<String>,
    order: Option<i64>,
    labels: Option<Vec<String>>,
    priority: Option<u8>,
    due_string: Option<String>,
    due_date: Option<NaiveDate>,
    due_datetime: Option<Timestamp>,
    due_lang: Option<String>,
    assignee_id: Option<String>,
    duration: Option<u32>,
    duration_unit: Option<DurationUnit>,
    deadline_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskParams {
    task_id: String,
    #[serde(flatten)]
    changes: UpdateTaskInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaskStatus {
    Complete,
    Uncomplete,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskStatusParams {
    task_id: String,
    status: TaskStatus,
}

// =============================================================================
// Validation
// =============================================================================

fn validate_priority(priority: Option<u8>) -> Result<()> {
    match priority {
        Some(p) if !(1..=4).contains(&p) => Err(Error::Validation(format!(
            "'priority' must be between 1 and 4, got {}",
            p
        ))),
        _ => Ok(()),
    }
}

fn validate_due(
    due_string: Option<&str>,
    due_date: Option<&NaiveDate>,
    due_datetime: Option<&Timestamp>,
) -> Result<()> {
    let given = [
        due_string.is_some(),
        due_date.is_some(),
        due_datetime.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    if given > 1 {
        return Err(Error::Validation(
            "Provide at most one of 'due_string', 'due_date' and 'due_datetime'".to_string(),
        ));
    }
    require_optional_text("due_string", due_string)
}

fn validate_duration(duration: Option<u32>, unit: Option<DurationUnit>) -> Result<()> {
    match (duration, unit) {
        (Some(0), _) => Err(Error::Validation(
            "'duration' must be greater than zero".to_string(),
        )),
        (Some(_), None) | (None, Some(_)) => Err(Error::Validation(
            "'duration' and 'duration_unit' must be given together".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_changes(changes: &UpdateTaskInput) -> Result<()> {
    if changes.is_empty() {
        return Err(Error::Validation(
            "Nothing to update: provide at least one field to change".to_string(),
        ));
    }
    require_optional_text("content", changes.content.as_deref())?;
    validate_priority(changes.priority)?;
    validate_due(
        changes.due_string.as_deref(),
        changes.due_date.as_ref(),
        changes.due_datetime.as_ref(),
    )?;
    validate_duration(changes.duration, changes.duration_unit)
}

// =============================================================================
// Handlers
// =============================================================================

pub(super) async fn get_tasks(provider: &dyn Provider, arguments: Option<Value>) -> Result<Value> {
    let params: GetTasksParams = parse_args(arguments)?;

    let filter = TaskFilter {
        project_id: params.project_id,
        section_id: params.section_id,
        label: params.label,
        filter: params.filter,
        lang: params.lang,
        ids: params.ids,
    };

    let tasks = provider.get_tasks(filter).await?;
    normalize(&tasks)
}

pub(super) async fn get_task(provider: &dyn Provider, arguments: Option<Value>) -> Result<Value> {
    let params: TaskIdParams = parse_args(arguments)?;
    require_text("task_id", &params.task_id)?;

    let task = provider.get_task(&params.task_id).await?;
    normalize(&task)
}

pub(super) async fn add_task(provider: &dyn Provider, arguments: Option<Value>) -> Result<Value> {
    let params: AddTaskParams = parse_args(arguments)?;

    require_text("content", &params.content)?;
    exclusive(
        ("project_id", params.project_id.is_some()),
        ("project_name", params.project_name.is_some()),
    )?;
    exclusive(
        ("section_id", params.section_id.is_some()),
        ("section_name", params.section_name.is_some()),
    )?;
    validate_priority(params.priority)?;
    validate_due(
        params.due_string.as_deref(),
        params.due_date.as_ref(),
        params.due_datetime.as_ref(),
    )?;
    validate_duration(params.duration, params.duration_unit)?;

    let project_id = match params.project_name.as_deref() {
        Some(name) => Some(projects::resolve_project_id(provider, name).await?),
        None => params.project_id,
    };
    let section_id = match params.section_name.as_deref() {
        Some(name) => {
            Some(sections::resolve_section_id(provider, project_id.as_deref(), name).await?)
        }
        None => params.section_id,
    };

    let input = CreateTaskInput {
        content: params.content,
        description: params.description,
        project_id,
        section_id,
        parent_id: params.parent_id,
        order: params.order,
        labels: params.labels,
        priority: params.priority,
        due_string: params.due_string,
        due_date: params.due_date,
        due_datetime: params.due_datetime,
        due_lang: params.due_lang,
        assignee_id: params.assignee_id,
        duration: params.duration,
        duration_unit: params.duration_unit,
        deadline_date: params.deadline_date,
    };

    let task = provider.add_task(input).await?;
    info!(task_id = %task.id, "Task created");
    normalize(&task)
}

pub(super) async fn update_task(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: UpdateTaskParams = parse_args(arguments)?;
    require_text("task_id", &params.task_id)?;
    validate_changes(&params.changes)?;

    let task = provider.update_task(&params.task_id, params.changes).await?;
    normalize(&task)
}

pub(super) async fn close_task(provider: &dyn Provider, arguments: Option<Value>) -> Result<Value> {
    let params: TaskIdParams = parse_args(arguments)?;
    require_text("task_id", &params.task_id)?;

    let closed = provider.close_task(&params.task_id).await?;
    info!(task_id = %params.task_id, "Task completed");
    normalize(&closed)
}

pub(super) async fn reopen_task(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: TaskIdParams = parse_args(arguments)?;
    require_text("task_id", &params.task_id)?;

    let reopened = provider.reopen_task(&params.task_id).await?;
    normalize(&reopened)
}

pub(super) async fn update_task_status(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: UpdateTaskStatusParams = parse_args(arguments)?;
    require_text("task_id", &params.task_id)?;

    let done = match params.status {
        TaskStatus::Complete => provider.close_task(&params.task_id).await?,
        TaskStatus::Uncomplete => provider.reopen_task(&params.task_id).await?,
    };
    normalize(&done)
}

pub(super) async fn delete_task(
    provider: &dyn Provider,
    arguments: Option<Value>,
) -> Result<Value> {
    let params: TaskIdParams = parse_args(arguments)?;
    require_text("task_id", &params.task_id)?;

    let deleted = provider.delete_task(&params.task_id).await?;
    normalize(&deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_priority() {
        assert!(validate_priority(None).is_ok());
        assert!(validate_priority(Some(1)).is_ok());
        assert!(validate_priority(Some(4)).is_ok());
        assert!(validate_priority(Some(0)).is_err());
        assert!(validate_priority(Some(5)).is_err());
    }

    #[test]
    fn test_validate_due() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(validate_due(Some("tomorrow"), None, None).is_ok());
        assert!(validate_due(None, Some(&date), None).is_ok());
        assert!(validate_due(Some("tomorrow"), Some(&date), None).is_err());
        assert!(validate_due(Some(" "), None, None).is_err());
    }

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration(None, None).is_ok());
        assert!(validate_duration(Some(30), Some(DurationUnit::Minute)).is_ok());
        assert!(validate_duration(Some(30), None).is_err());
        assert!(validate_duration(None, Some(DurationUnit::Day)).is_err());
        assert!(validate_duration(Some(0), Some(DurationUnit::Day)).is_err());
    }

    #[test]
    fn test_update_params_flatten() {
        let params: UpdateTaskParams = parse_args(Some(json!({
            "task_id": "42",
            "priority": 3,
            "due_date": "2024-02-01"
        })))
        .unwrap();
        assert_eq!(params.task_id, "42");
        assert_eq!(params.changes.priority, Some(3));
        assert_eq!(
            params.changes.due_date,
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
        assert!(validate_changes(&params.changes).is_ok());
    }

    #[test]
    fn test_status_parse() {
        let params: UpdateTaskStatusParams =
            parse_args(Some(json!({"task_id": "1", "status": "uncomplete"}))).unwrap();
        assert_eq!(params.status, TaskStatus::Uncomplete);

        let err = parse_args::<UpdateTaskStatusParams>(Some(
            json!({"task_id": "1", "status": "done"}),
        ))
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
