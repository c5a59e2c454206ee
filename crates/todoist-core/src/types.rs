//! Todoist domain objects and operation inputs.
//!
//! Field names follow the Todoist REST API so responses deserialize directly.
//! Every domain object implements [`Introspect`] with its full field list, so
//! normalization never drops a field.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::normalize::{Introspect, Upstream, NAIVE_DATETIME_FORMAT};

// =============================================================================
// Temporal values
// =============================================================================

/// A date-time that may or may not carry a UTC offset.
///
/// Todoist "floating" due times have no offset and must stay that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp::Aware(dt));
        }
        NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)
            .map(Timestamp::Naive)
            .map_err(|e| Error::InvalidData(format!("Invalid date-time '{}': {}", s, e)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Aware(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            Timestamp::Naive(dt) => write!(f, "{}", dt.format(NAIVE_DATETIME_FORMAT)),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Introspect for Timestamp {
    fn introspect(&self) -> Upstream {
        match self {
            Timestamp::Aware(dt) => Upstream::DateTime(*dt),
            Timestamp::Naive(dt) => Upstream::NaiveDateTime(*dt),
        }
    }
}

/// The `date` of a due date.
///
/// Usually a calendar date, but some API generations put a full date-time in
/// `date` and omit `datetime`. Both forms are kept as sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    Date(NaiveDate),
    Time(Timestamp),
}

impl DueDate {
    /// The calendar day, whichever form was sent.
    pub fn day(&self) -> NaiveDate {
        match self {
            DueDate::Date(date) => *date,
            DueDate::Time(Timestamp::Aware(dt)) => dt.date_naive(),
            DueDate::Time(Timestamp::Naive(dt)) => dt.date(),
        }
    }
}

impl FromStr for DueDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DueDate::Date(date));
        }
        s.parse().map(DueDate::Time)
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DueDate::Time(ts) => fmt::Display::fmt(ts, f),
        }
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Introspect for DueDate {
    fn introspect(&self) -> Upstream {
        match self {
            DueDate::Date(date) => Upstream::Date(*date),
            DueDate::Time(ts) => ts.introspect(),
        }
    }
}

// =============================================================================
// Tasks
// =============================================================================

/// A Todoist task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default)]
    pub deadline: Option<Deadline>,
    #[serde(default)]
    pub duration: Option<TaskDuration>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub assigner_id: Option<String>,
}

fn default_priority() -> u8 {
    1
}

crate::introspect_record!(Task {
    id,
    project_id,
    section_id,
    content,
    description,
    is_completed,
    labels,
    parent_id,
    order,
    priority,
    due,
    deadline,
    duration,
    url,
    comment_count,
    created_at,
    creator_id,
    assignee_id,
    assigner_id,
});

/// Task due date, possibly recurring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Due {
    /// Human-readable form, e.g. "every monday".
    pub string: String,
    pub date: DueDate,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub datetime: Option<Timestamp>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

crate::introspect_record!(Due {
    string,
    date,
    is_recurring,
    datetime,
    timezone,
    lang,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub date: NaiveDate,
    #[serde(default)]
    pub lang: Option<String>,
}

crate::introspect_record!(Deadline { date, lang });

/// Unit of a task duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minute,
    Day,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Minute => "minute",
            DurationUnit::Day => "day",
        }
    }
}

impl Introspect for DurationUnit {
    fn introspect(&self) -> Upstream {
        Upstream::Text(self.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDuration {
    pub amount: u32,
    pub unit: DurationUnit,
}

crate::introspect_record!(TaskDuration { amount, unit });

// =============================================================================
// Projects and sections
// =============================================================================

/// A Todoist project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_inbox_project: bool,
    #[serde(default)]
    pub is_team_inbox: bool,
    #[serde(default)]
    pub view_style: String,
    #[serde(default)]
    pub url: String,
}

crate::introspect_record!(Project {
    id,
    name,
    color,
    parent_id,
    order,
    comment_count,
    is_shared,
    is_favorite,
    is_inbox_project,
    is_team_inbox,
    view_style,
    url,
});

/// A section inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub order: i64,
    pub name: String,
}

crate::introspect_record!(Section {
    id,
    project_id,
    order,
    name,
});

/// A member of a shared project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

crate::introspect_record!(Collaborator { id, name, email });

// =============================================================================
// Labels
// =============================================================================

/// A personal label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub is_favorite: bool,
}

crate::introspect_record!(Label {
    id,
    name,
    color,
    order,
    is_favorite,
});

// =============================================================================
// Comments
// =============================================================================

/// A comment on a task or a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub posted_at: Option<Timestamp>,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

crate::introspect_record!(Comment {
    id,
    task_id,
    project_id,
    posted_at,
    content,
    attachment,
});

/// File or link attached to a comment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_state: Option<String>,
}

crate::introspect_record!(Attachment {
    resource_type,
    file_name,
    file_type,
    file_url,
    file_size,
    upload_state,
});

// =============================================================================
// Operation inputs
// =============================================================================

/// Filter for listing active tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Todoist filter query, e.g. "today | overdue".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_datetime: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_unit: Option<DurationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_date: Option<NaiveDate>,
}

/// Input for updating a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_datetime: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_unit: Option<DurationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_date: Option<NaiveDate>,
}

impl UpdateTaskInput {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    /// "list" or "board"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_style: Option<String>,
}

/// Input for updating a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_style: Option<String>,
}

impl UpdateProjectInput {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Input for creating a section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSectionInput {
    pub name: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Input for creating a personal label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateLabelInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

/// Input for updating a personal label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateLabelInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl UpdateLabelInput {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// What a comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    Task(String),
    Project(String),
}

impl CommentTarget {
    /// Build a target from optional ids; exactly one must be present.
    pub fn from_ids(task_id: Option<String>, project_id: Option<String>) -> crate::Result<Self> {
        match (task_id, project_id) {
            (Some(task_id), None) => Ok(CommentTarget::Task(task_id)),
            (None, Some(project_id)) => Ok(CommentTarget::Project(project_id)),
            (Some(_), Some(_)) => Err(Error::Validation(
                "Provide either task_id or project_id, not both".to_string(),
            )),
            (None, None) => Err(Error::Validation(
                "One of task_id or project_id is required".to_string(),
            )),
        }
    }

    /// Query parameter name and value selecting this target.
    pub fn query_pair(&self) -> (&'static str, &str) {
        match self {
            CommentTarget::Task(id) => ("task_id", id.as_str()),
            CommentTarget::Project(id) => ("project_id", id.as_str()),
        }
    }
}

/// Input for adding a comment.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCommentInput {
    pub target: CommentTarget,
    pub content: String,
    pub attachment: Option<Attachment>,
}
