use derive_more::with_trait::Display;
use serde::{Deserialize, Serialize};

/// State label reported by the backend for a task.
#[derive(Debug, Clone, PartialEq, Eq, Display, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    #[display("PENDING")]
    Pending,
    #[display("PROGRESS")]
    Progress,
    #[display("COMPLETED")]
    Completed,
    #[display("FAILED")]
    Failed,
    #[display("CANCELED")]
    Canceled,
    #[display("{_0}")]
    Unrecognized(String),
}

impl TaskState {
    /// No further progress updates are expected once a task gets here.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }
}

impl From<String> for TaskState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "PENDING" => TaskState::Pending,
            "PROGRESS" => TaskState::Progress,
            "COMPLETED" => TaskState::Completed,
            "FAILED" => TaskState::Failed,
            // the backend writes the British spelling
            "CANCELED" | "CANCELLED" => TaskState::Canceled,
            _ => TaskState::Unrecognized(raw),
        }
    }
}

impl From<&str> for TaskState {
    fn from(raw: &str) -> Self {
        TaskState::from(raw.to_string())
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        state.to_string()
    }
}

#[derive(Debug, Deserialize, Clone, Display, Serialize, PartialEq)]
#[display("state={state} progress={progress}%")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default)]
    pub progress: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_time: Option<String>,
}

impl TaskStatus {
    pub fn new(state: impl Into<TaskState>, progress: i64) -> Self {
        Self {
            state: state.into(),
            progress,
            error: None,
            start_time: None,
            last_activity_time: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Progress bar styling, one CSS class per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum StyleClass {
    #[display("bg-warning")]
    Warning,
    #[display("bg-info")]
    Info,
    #[display("bg-success")]
    Success,
    #[display("bg-danger")]
    Danger,
    #[display("bg-secondary")]
    Secondary,
}

/// Desired state of the panel after a status update.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
#[display("[{style}] {message} ({progress}%)")]
pub struct UiEffects {
    pub message: String,
    pub style: StyleClass,
    pub progress: u8,
    /// `None` leaves the cancel control as it is.
    pub cancel_enabled: Option<bool>,
    pub clears_active_task: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NoticeLevel {
    #[display("info")]
    Info,
    #[display("success")]
    Success,
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

/// Transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{level}: {text}")]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Deserialize, Serialize)]
#[display("acknowledged: {}", message.as_deref().unwrap_or("task stopped"))]
pub struct CancelAck {
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, derive_more::Error)]
pub enum CancelError {
    #[display("no running task")]
    NoActiveTask,
    #[display("backend rejected cancellation: {message}")]
    BackendRejected {
        #[error(not(source))]
        message: String,
    },
    #[display("transport failure: {detail}")]
    Transport {
        #[error(not(source))]
        detail: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Display, derive_more::Error)]
pub enum BackendError {
    #[display("backend error ({status}): {message}")]
    Rejected {
        status: u16,
        #[error(not(source))]
        message: String,
    },
    #[display("transport failure: {_0}")]
    Transport(#[error(not(source))] String),
}
