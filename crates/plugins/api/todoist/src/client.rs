//! Todoist API client implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use todoist_core::types::{
    Collaborator, Comment, CommentTarget, CreateCommentInput, CreateLabelInput,
    CreateProjectInput, CreateSectionInput, CreateTaskInput, Label, Project, Section, Task,
    TaskFilter, UpdateLabelInput, UpdateProjectInput, UpdateTaskInput,
};
use todoist_core::{
    CommentProvider, Credential, Error, LabelProvider, ProjectProvider, Provider, Result,
    TaskProvider,
};
use tracing::{debug, warn};

use crate::types::{
    CreateCommentRequest, Listing, RemoveSharedLabelRequest, RenameSharedLabelRequest,
    UpdateCommentRequest, UpdateSectionRequest,
};
use crate::DEFAULT_TODOIST_URL;

/// Upper bound on cursor pages followed by a single list call.
const MAX_PAGES: usize = 100;

/// Build a client from a raw token.
///
/// Fails with a configuration error when the token is empty. No request is
/// made until the first operation.
pub fn create_client(token: &str) -> Result<TodoistClient> {
    let credential = Credential::new(token)?;
    TodoistClient::new(&credential)
}

/// Todoist REST API client.
#[derive(Clone)]
pub struct TodoistClient {
    base_url: String,
    base: reqwest::Url,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TodoistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoistClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TodoistClient {
    pub fn new(credential: &Credential) -> Result<Self> {
        Self::with_base_url(DEFAULT_TODOIST_URL, credential)
    }

    /// Create a client against a custom base URL (proxies, tests).
    pub fn with_base_url(base_url: impl Into<String>, credential: &Credential) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = reqwest::Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid Todoist base URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Invalid Todoist base URL '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("todoist-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            base,
            token: credential.expose().to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append `segments` to the base URL, each as exactly one path segment.
    ///
    /// Ids are percent-encoded, so `/`, `?` and `#` stay inside their segment.
    /// Blank, `.` and `..` segments are rejected.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| matches!(s.trim(), "" | "." | ".."))
        {
            return Err(Error::Validation(format!("Invalid id '{}'", bad)));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid Todoist base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let message = response.text().await.unwrap_or_default();
        warn!(
            status = status_code,
            message = message,
            "Todoist API error response"
        );
        Err(Error::from_status(status_code, message))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str], query: &[(&str, &str)]) -> Result<T> {
        let url = self.url(path)?;
        debug!(url = %url, "Todoist GET request");
        let response = self
            .send(self.request(reqwest::Method::GET, url).query(query))
            .await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.url(path)?;
        debug!(url = %url, "Todoist POST request");
        let response = self
            .send(self.request(reqwest::Method::POST, url).json(body))
            .await?;
        Self::decode(response).await
    }

    /// POST whose success response is `204 No Content`.
    async fn post_no_content<B: Serialize + ?Sized>(
        &self,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<bool> {
        let url = self.url(path)?;
        debug!(url = %url, "Todoist POST request");
        let mut request = self.request(reqwest::Method::POST, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await?;
        Ok(true)
    }

    async fn delete(&self, path: &[&str]) -> Result<bool> {
        let url = self.url(path)?;
        debug!(url = %url, "Todoist DELETE request");
        self.send(self.request(reqwest::Method::DELETE, url)).await?;
        Ok(true)
    }

    /// GET a list endpoint, following cursor pages.
    async fn list<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page: Listing<T> = {
                let mut params = query.to_vec();
                if let Some(cursor) = cursor.as_deref() {
                    params.push(("cursor", cursor));
                }
                self.get(path, &params).await?
            };
            let (mut batch, next) = page.into_parts();
            items.append(&mut batch);

            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }

        warn!(
            path = %path.join("/"),
            pages = MAX_PAGES,
            "Stopped following cursor pages"
        );
        Ok(items)
    }
}

fn task_query(filter: &TaskFilter) -> (Vec<(&'static str, &str)>, Option<String>) {
    let mut query = Vec::new();
    if let Some(project_id) = &filter.project_id {
        query.push(("project_id", project_id.as_str()));
    }
    if let Some(section_id) = &filter.section_id {
        query.push(("section_id", section_id.as_str()));
    }
    if let Some(label) = &filter.label {
        query.push(("label", label.as_str()));
    }
    if let Some(expr) = &filter.filter {
        query.push(("filter", expr.as_str()));
    }
    if let Some(lang) = &filter.lang {
        query.push(("lang", lang.as_str()));
    }
    let ids = (!filter.ids.is_empty()).then(|| filter.ids.join(","));
    (query, ids)
}

// =============================================================================
// Provider implementations
// =============================================================================

#[async_trait]
impl TaskProvider for TodoistClient {
    async fn get_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let (mut query, ids) = task_query(&filter);
        if let Some(ids) = ids.as_deref() {
            query.push(("ids", ids));
        }
        self.list(&["tasks"], &query).await
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.get(&["tasks", task_id], &[]).await
    }

    async fn add_task(&self, input: CreateTaskInput) -> Result<Task> {
        self.post(&["tasks"], &input).await
    }

    async fn update_task(&self, task_id: &str, input: UpdateTaskInput) -> Result<Task> {
        self.post(&["tasks", task_id], &input).await
    }

    async fn close_task(&self, task_id: &str) -> Result<bool> {
        self.post_no_content::<()>(&["tasks", task_id, "close"], None)
            .await
    }

    async fn reopen_task(&self, task_id: &str) -> Result<bool> {
        self.post_no_content::<()>(&["tasks", task_id, "reopen"], None)
            .await
    }

    async fn delete_task(&self, task_id: &str) -> Result<bool> {
        self.delete(&["tasks", task_id]).await
    }
}

#[async_trait]
impl ProjectProvider for TodoistClient {
    async fn get_projects(&self) -> Result<Vec<Project>> {
        self.list(&["projects"], &[]).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.get(&["projects", project_id], &[]).await
    }

    async fn add_project(&self, input: CreateProjectInput) -> Result<Project> {
        self.post(&["projects"], &input).await
    }

    async fn update_project(
        &self,
        project_id: &str,
        input: UpdateProjectInput,
    ) -> Result<Project> {
        self.post(&["projects", project_id], &input)
            .await
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        self.delete(&["projects", project_id]).await
    }

    async fn get_collaborators(&self, project_id: &str) -> Result<Vec<Collaborator>> {
        self.list(&["projects", project_id, "collaborators"], &[])
            .await
    }

    async fn get_sections(&self, project_id: Option<&str>) -> Result<Vec<Section>> {
        match project_id {
            Some(project_id) => self.list(&["sections"], &[("project_id", project_id)]).await,
            None => self.list(&["sections"], &[]).await,
        }
    }

    async fn get_section(&self, section_id: &str) -> Result<Section> {
        self.get(&["sections", section_id], &[]).await
    }

    async fn add_section(&self, input: CreateSectionInput) -> Result<Section> {
        self.post(&["sections"], &input).await
    }

    async fn update_section(&self, section_id: &str, name: &str) -> Result<Section> {
        self.post(
            &["sections", section_id],
            &UpdateSectionRequest { name },
        )
        .await
    }

    async fn delete_section(&self, section_id: &str) -> Result<bool> {
        self.delete(&["sections", section_id]).await
    }
}

#[async_trait]
impl LabelProvider for TodoistClient {
    async fn get_labels(&self) -> Result<Vec<Label>> {
        self.list(&["labels"], &[]).await
    }

    async fn get_label(&self, label_id: &str) -> Result<Label> {
        self.get(&["labels", label_id], &[]).await
    }

    async fn add_label(&self, input: CreateLabelInput) -> Result<Label> {
        self.post(&["labels"], &input).await
    }

    async fn update_label(&self, label_id: &str, input: UpdateLabelInput) -> Result<Label> {
        self.post(&["labels", label_id], &input).await
    }

    async fn delete_label(&self, label_id: &str) -> Result<bool> {
        self.delete(&["labels", label_id]).await
    }

    async fn get_shared_labels(&self, omit_personal: bool) -> Result<Vec<String>> {
        if omit_personal {
            self.list(&["labels", "shared"], &[("omit_personal", "true")])
                .await
        } else {
            self.list(&["labels", "shared"], &[]).await
        }
    }

    async fn rename_shared_label(&self, name: &str, new_name: &str) -> Result<bool> {
        self.post_no_content(
            &["labels", "shared", "rename"],
            Some(&RenameSharedLabelRequest { name, new_name }),
        )
        .await
    }

    async fn remove_shared_label(&self, name: &str) -> Result<bool> {
        self.post_no_content(
            &["labels", "shared", "remove"],
            Some(&RemoveSharedLabelRequest { name }),
        )
        .await
    }
}

#[async_trait]
impl CommentProvider for TodoistClient {
    async fn get_comments(&self, target: &CommentTarget) -> Result<Vec<Comment>> {
        let (key, id) = target.query_pair();
        self.list(&["comments"], &[(key, id)]).await
    }

    async fn get_comment(&self, comment_id: &str) -> Result<Comment> {
        self.get(&["comments", comment_id], &[]).await
    }

    async fn add_comment(&self, input: CreateCommentInput) -> Result<Comment> {
        let (task_id, project_id) = match &input.target {
            CommentTarget::Task(id) => (Some(id.as_str()), None),
            CommentTarget::Project(id) => (None, Some(id.as_str())),
        };
        let body = CreateCommentRequest {
            task_id,
            project_id,
            content: &input.content,
            attachment: input.attachment.as_ref(),
        };
        self.post(&["comments"], &body).await
    }

    async fn update_comment(&self, comment_id: &str, content: &str) -> Result<Comment> {
        self.post(
            &["comments", comment_id],
            &UpdateCommentRequest { content },
        )
        .await
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        self.delete(&["comments", comment_id]).await
    }
}

impl Provider for TodoistClient {}
