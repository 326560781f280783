use std::error::Error;
use std::time::Duration;
use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;
use crate::modules::types::{BackendError, CancelAck, CancelError, TaskStatus};

/// The task API of the scraping service.
pub trait TaskBackend {
    /// Asks the backend to stop its running task.
    fn cancel_task(&self, task_id: &str) -> Result<CancelAck, CancelError>;
    fn task_status(&self, task_id: &str) -> Result<TaskStatus, BackendError>;
    /// Starts a refresh run and returns the new task id.
    fn submit_refresh(&self, user_ids: &[String]) -> Result<String, BackendError>;
}

/// Body of the cancel endpoint. Every field is optional on the wire.
#[derive(Debug, Deserialize, Default)]
pub struct CancelReply {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    user_id_list: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RefreshReply {
    task_id: Option<String>,
    error: Option<String>,
}

/// Decides whether a cancel reply acknowledges the cancellation.
///
/// An explicit `success` flag wins. Without one, a 2xx reply with no
/// `error` counts as acknowledged.
pub fn interpret_cancel_reply(http_ok: bool, reply: CancelReply) -> Result<CancelAck, CancelError> {
    let accepted = reply
        .success
        .unwrap_or(http_ok && reply.error.is_none());
    if accepted {
        Ok(CancelAck {
            message: reply.message,
        })
    } else {
        Err(CancelError::BackendRejected {
            message: reply.error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

pub struct HttpBackend {
    base: Url,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Box<dyn Error>> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("taskpanel/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be a base url", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl TaskBackend for HttpBackend {
    fn cancel_task(&self, task_id: &str) -> Result<CancelAck, CancelError> {
        let url = self
            .endpoint(&["task", "cancel"])
            .map_err(|detail| CancelError::Transport { detail })?;
        info!("Requesting cancellation of task {task_id} at {url}");

        let transport = |e: reqwest::Error| CancelError::Transport {
            detail: e.to_string(),
        };
        let response = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;

        let reply: CancelReply = serde_json::from_str(&body).map_err(|e| {
            warn!("Unreadable cancel reply ({status}): {e}");
            CancelError::Transport {
                detail: format!("unreadable reply ({status}): {e}"),
            }
        })?;
        interpret_cancel_reply(status.is_success(), reply)
    }

    fn task_status(&self, task_id: &str) -> Result<TaskStatus, BackendError> {
        let url = self
            .endpoint(&["task", task_id])
            .map_err(BackendError::Transport)?;

        let transport = |e: reqwest::Error| BackendError::Transport(e.to_string());
        let response = self.client.get(url.as_str()).send().map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;

        // 404 and 500 still carry a status record (state UNKNOWN + error)
        match serde_json::from_str::<TaskStatus>(&body) {
            Ok(task_status) => Ok(task_status),
            Err(_) if !status.is_success() => Err(BackendError::Rejected {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(BackendError::Transport(format!("unreadable status: {e}"))),
        }
    }

    fn submit_refresh(&self, user_ids: &[String]) -> Result<String, BackendError> {
        let url = self
            .endpoint(&["refresh"])
            .map_err(BackendError::Transport)?;
        let payload = serde_json::to_string(&RefreshRequest {
            user_id_list: user_ids,
        })
        .map_err(|e| BackendError::Transport(e.to_string()))?;

        let transport = |e: reqwest::Error| BackendError::Transport(e.to_string());
        let response = self
            .client
            .post(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;

        let reply: RefreshReply = serde_json::from_str(&body).map_err(|e| BackendError::Rejected {
            status: status.as_u16(),
            message: format!("unreadable reply: {e}"),
        })?;
        match (status.is_success(), reply.task_id) {
            (true, Some(task_id)) => Ok(task_id),
            (_, _) => Err(BackendError::Rejected {
                status: status.as_u16(),
                message: reply.error.unwrap_or_else(|| "no task id in reply".to_string()),
            }),
        }
    }
}
