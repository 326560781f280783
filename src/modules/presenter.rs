use log::{error, info, warn};
use crate::modules::backend::TaskBackend;
use crate::modules::session::ClientTaskSession;
use crate::modules::types::{
    BackendError, CancelAck, CancelError, Notice, NoticeLevel, StyleClass, TaskState, TaskStatus,
    UiEffects,
};
use crate::modules::view::PanelView;

/// Maps a status record to what the panel should show. Total over every state.
pub fn render(status: &TaskStatus) -> UiEffects {
    let progress = status.progress.clamp(0, 100) as u8;

    let (message, style, cancel_enabled, clears_active_task) = match &status.state {
        TaskState::Pending => ("task pending".to_string(), StyleClass::Warning, None, false),
        TaskState::Progress => ("task in progress".to_string(), StyleClass::Info, Some(true), false),
        TaskState::Completed => ("task completed".to_string(), StyleClass::Success, Some(false), true),
        TaskState::Failed => (
            format!(
                "task failed: {}",
                status.error.as_deref().unwrap_or("unknown error")
            ),
            StyleClass::Danger,
            Some(false),
            true,
        ),
        // the cancel flow has already released the task id
        TaskState::Canceled => ("task canceled".to_string(), StyleClass::Secondary, Some(false), false),
        TaskState::Unrecognized(_) => ("unknown status".to_string(), StyleClass::Secondary, Some(false), false),
    };

    UiEffects {
        message,
        style,
        progress,
        cancel_enabled,
        clears_active_task,
    }
}

/// Drives one task panel: the only writer of the cancel control and of the session.
pub struct Presenter<B: TaskBackend, V: PanelView> {
    session: ClientTaskSession,
    backend: B,
    view: V,
    cancel_enabled: bool,
    last_progress: u8,
}

impl<B: TaskBackend, V: PanelView> Presenter<B, V> {
    pub fn new(session: ClientTaskSession, backend: B, view: V) -> Self {
        Self {
            session,
            backend,
            view,
            cancel_enabled: false,
            last_progress: 0,
        }
    }

    pub fn session(&self) -> &ClientTaskSession {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn cancel_enabled(&self) -> bool {
        self.cancel_enabled
    }

    pub fn last_progress(&self) -> u8 {
        self.last_progress
    }

    /// Applies one status update. Callers must deliver updates in order.
    pub fn update(&mut self, status: &TaskStatus) -> UiEffects {
        if let TaskState::Unrecognized(raw) = &status.state {
            warn!("Unrecognized task state {raw:?}");
        }

        let effects = render(status);
        self.last_progress = effects.progress;

        if effects.clears_active_task {
            self.release_task();
        }
        if let Some(enabled) = effects.cancel_enabled {
            self.cancel_enabled = enabled;
        }
        self.view.apply(&effects);
        effects
    }

    /// Stops the active task.
    ///
    /// The cancel control is disabled before the request goes out and is
    /// re-enabled only if the backend does not acknowledge.
    pub fn cancel(&mut self) -> Result<CancelAck, CancelError> {
        let Some(task_id) = self.session.current_task_id().map(str::to_string) else {
            self.view
                .notify(&Notice::new(NoticeLevel::Warning, "no running task"));
            return Err(CancelError::NoActiveTask);
        };

        self.set_cancel_enabled(false);
        self.view
            .notify(&Notice::new(NoticeLevel::Info, "stopping task..."));

        match self.backend.cancel_task(&task_id) {
            Ok(ack) => {
                info!("Task {task_id} canceled: {ack}");
                self.release_task();
                self.view
                    .notify(&Notice::new(NoticeLevel::Success, "task stopped"));
                let canceled = TaskStatus::new(TaskState::Canceled, i64::from(self.last_progress));
                self.update(&canceled);
                Ok(ack)
            }
            Err(err) => {
                error!("Cancel of task {task_id} failed: {err}");
                self.set_cancel_enabled(true);
                let text = match &err {
                    CancelError::BackendRejected { message } => {
                        format!("failed to stop task: {message}")
                    }
                    _ => "error while stopping task".to_string(),
                };
                self.view.notify(&Notice::new(NoticeLevel::Error, text));
                Err(err)
            }
        }
    }

    /// Starts a refresh run on the backend and tracks it as the active task.
    pub fn submit(&mut self, user_ids: &[String]) -> Result<String, BackendError> {
        if let Some(previous) = self.session.current_task_id() {
            warn!("Replacing tracked task {previous}");
        }
        let task_id = match self.backend.submit_refresh(user_ids) {
            Ok(task_id) => task_id,
            Err(err) => {
                error!("Cannot start task: {err}");
                self.view
                    .notify(&Notice::new(NoticeLevel::Error, format!("cannot start task: {err}")));
                return Err(err);
            }
        };

        if let Err(e) = self.session.begin(task_id.clone()) {
            error!("Cannot persist task {task_id}: {e}");
        }
        self.view
            .notify(&Notice::new(NoticeLevel::Success, format!("task {task_id} started")));
        self.update(&TaskStatus::new(TaskState::Pending, 0));
        Ok(task_id)
    }

    /// Fetches the active task's status and applies it.
    ///
    /// Returns `None` when no task is tracked.
    pub fn refresh(&mut self) -> Option<Result<TaskStatus, BackendError>> {
        let task_id = self.session.current_task_id()?.to_string();
        let result = self.backend.task_status(&task_id);
        match &result {
            Ok(status) => {
                info!("Task {task_id}: {status}");
                self.update(status);
            }
            Err(err) => warn!("Status of task {task_id} unavailable: {err}"),
        }
        Some(result)
    }

    /// Stops tracking a task the backend no longer knows about.
    pub fn abandon(&mut self) {
        if let Some(task_id) = self.session.current_task_id() {
            warn!("Dropping unknown task {task_id}");
        }
        self.release_task();
        self.set_cancel_enabled(false);
    }

    fn set_cancel_enabled(&mut self, enabled: bool) {
        self.cancel_enabled = enabled;
        self.view.set_cancel_enabled(enabled);
    }

    fn release_task(&mut self) {
        if let Err(e) = self.session.clear() {
            error!("Cannot clear stored task id: {e}");
        }
    }
}
