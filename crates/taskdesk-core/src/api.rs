use std::fmt;

use taskdesk_shared::{ListQuery, TaskDraft, TaskDto, TaskPageDto};
use url::Url;

use crate::error::{ApiError, ConfigError};

pub const TASKS_PATH: &str = "v1/api/tasks/";
const LIST_SEGMENT: &str = "all-tasks";
const CREATE_SEGMENT: &str = "create";

/// Backend seam. Every call carries the bearer token; role scoping happens
/// server-side.
#[allow(async_fn_in_trait)]
pub trait TaskApi {
    async fn list_tasks(&self, token: &str, query: &ListQuery) -> Result<TaskPageDto, ApiError>;

    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError>;

    async fn update_task(&self, token: &str, id: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError>;

    async fn delete_task(&self, token: &str, id: &str) -> Result<(), ApiError>;
}

/// Resolved URLs of the task endpoints under one base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    tasks: Url,
    list: Url,
    create: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::BaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let mut base = Url::parse(base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a hierarchical url".to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let tasks = base.join(TASKS_PATH).map_err(|err| invalid(err.to_string()))?;
        let list = tasks.join(LIST_SEGMENT).map_err(|err| invalid(err.to_string()))?;
        let create = tasks.join(CREATE_SEGMENT).map_err(|err| invalid(err.to_string()))?;

        Ok(Self { tasks, list, create })
    }

    pub fn list(&self, query: &ListQuery) -> Url {
        let mut url = self.list.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("skip", &query.skip.to_string());
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(search) = query.search.as_deref() {
                pairs.append_pair("search", search);
            }
        }
        url
    }

    pub fn create(&self) -> Url {
        self.create.clone()
    }

    /// Target of update and delete; the id is percent-encoded as one segment.
    pub fn task(&self, id: &str) -> Url {
        let mut url = self.tasks.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create(TaskDraft),
    Update { id: String, draft: TaskDraft },
    Delete { id: String },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Create(_) => MutationKind::Create,
            Mutation::Update { .. } => MutationKind::Update,
            Mutation::Delete { .. } => MutationKind::Delete,
        }
    }

    pub fn failure_fallback(&self) -> &'static str {
        match self.kind() {
            MutationKind::Create => "Failed to create task. Please try again.",
            MutationKind::Update => "Failed to update task. Please try again.",
            MutationKind::Delete => "Failed to delete task. Please try again.",
        }
    }

    pub async fn send<A: TaskApi>(&self, api: &A, token: &str) -> Result<(), ApiError> {
        match self {
            Mutation::Create(draft) => api.create_task(token, draft).await.map(|_| ()),
            Mutation::Update { id, draft } => api.update_task(token, id, draft).await.map(|_| ()),
            Mutation::Delete { id } => api.delete_task(token, id).await,
        }
    }
}
