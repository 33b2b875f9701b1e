use std::time::Duration;

use anyhow::Context;
use reqwest::{RequestBuilder, Response};
use taskdesk_shared::{ListQuery, TaskDraft, TaskDto, TaskPageDto};
use tracing::{debug, instrument, warn};

use crate::api::{Endpoints, TaskApi};
use crate::error::ApiError;

/// `TaskApi` over reqwest with a hard per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTaskApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl ReqwestTaskApi {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("taskdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed building HTTP client for task api")?;
        Ok(Self { client, endpoints })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "task api responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %err, "task api returned an error status");
        Err(err)
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Transport("request timed out".to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

impl TaskApi for ReqwestTaskApi {
    #[instrument(skip(self, token))]
    async fn list_tasks(&self, token: &str, query: &ListQuery) -> Result<TaskPageDto, ApiError> {
        let request = self.client.get(self.endpoints.list(query)).bearer_auth(token);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token, draft), fields(title_len = draft.title.len()))]
    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError> {
        let request = self.client.post(self.endpoints.create()).bearer_auth(token).json(draft);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token, draft))]
    async fn update_task(&self, token: &str, id: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError> {
        let request = self.client.put(self.endpoints.task(id)).bearer_auth(token).json(draft);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn delete_task(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let request = self.client.delete(self.endpoints.task(id)).bearer_auth(token);
        self.send(request).await.map(|_| ())
    }
}
