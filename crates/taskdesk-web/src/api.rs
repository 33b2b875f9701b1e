use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use gloo::net::http::{Request, RequestBuilder, Response};
use gloo::timers::callback::Timeout;
use serde::de::DeserializeOwned;
use taskdesk_core::api::{Endpoints, TaskApi};
use taskdesk_core::config::{API_URL_ENV, ClientConfig};
use taskdesk_core::error::{ApiError, ConfigError};
use taskdesk_shared::{ListQuery, TaskDraft, TaskDto, TaskPageDto};
use web_sys::AbortController;

/// Browser transport. Each request is aborted once the configured timeout
/// elapses.
#[derive(Debug, Clone, PartialEq)]
pub struct GlooTaskApi {
    endpoints: Endpoints,
    timeout: Duration,
}

impl GlooTaskApi {
    /// Base URL baked in at build time through `TASKDESK_API_URL`.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let mut cfg = ClientConfig::default();
        cfg.apply_api_url_override(option_env!("TASKDESK_API_URL"));
        tracing::info!(api = %cfg.api_base_url, env = API_URL_ENV, "task api configured");
        Ok(Self {
            endpoints: cfg.endpoints()?,
            timeout: cfg.timeout,
        })
    }

    async fn send(&self, token: &str, request: RequestBuilder, body: Option<&TaskDraft>) -> Result<Response, ApiError> {
        let controller = AbortController::new().map_err(|err| ApiError::Transport(format!("{err:?}")))?;
        let timed_out = Rc::new(Cell::new(false));
        let timer = {
            let controller = controller.clone();
            let timed_out = timed_out.clone();
            let millis = u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX);
            Timeout::new(millis, move || {
                timed_out.set(true);
                controller.abort();
            })
        };

        let signal = controller.signal();
        let request = request
            .header("Authorization", &format!("Bearer {token}"))
            .abort_signal(Some(&signal));
        let request = match body {
            Some(draft) => request.json(draft),
            None => request.build(),
        }
        .map_err(|err| ApiError::Transport(err.to_string()))?;

        let result = request.send().await;
        drop(timer);

        let response = result.map_err(|err| {
            if timed_out.get() {
                ApiError::Transport("request timed out".to_string())
            } else {
                ApiError::Transport(err.to_string())
            }
        })?;

        if response.ok() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        tracing::warn!(status, error = %err, url = %response.url(), "task api returned an error status");
        Err(err)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

impl TaskApi for GlooTaskApi {
    async fn list_tasks(&self, token: &str, query: &ListQuery) -> Result<TaskPageDto, ApiError> {
        let url = self.endpoints.list(query);
        let response = self.send(token, Request::get(url.as_str()), None).await?;
        Self::decode(response).await
    }

    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError> {
        let url = self.endpoints.create();
        let response = self.send(token, Request::post(url.as_str()), Some(draft)).await?;
        Self::decode(response).await
    }

    async fn update_task(&self, token: &str, id: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError> {
        let url = self.endpoints.task(id);
        let response = self.send(token, Request::put(url.as_str()), Some(draft)).await?;
        Self::decode(response).await
    }

    async fn delete_task(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let url = self.endpoints.task(id);
        self.send(token, Request::delete(url.as_str()), None).await?;
        Ok(())
    }
}
