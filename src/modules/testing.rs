use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use crate::modules::backend::TaskBackend;
use crate::modules::types::{BackendError, CancelAck, CancelError, Notice, TaskStatus, UiEffects};
use crate::modules::view::PanelView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CancelControl(bool),
    CancelRequest(String),
    StatusRequest(String),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub struct FakeBackend {
    events: EventLog,
    cancel_reply: RefCell<Option<Result<CancelAck, CancelError>>>,
    submit_reply: RefCell<Option<Result<String, BackendError>>>,
    statuses: RefCell<VecDeque<Result<TaskStatus, BackendError>>>,
    cancel_calls: Cell<usize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            cancel_reply: RefCell::new(None),
            submit_reply: RefCell::new(None),
            statuses: RefCell::new(VecDeque::new()),
            cancel_calls: Cell::new(0),
        }
    }

    pub fn with_cancel(self, reply: Result<CancelAck, CancelError>) -> Self {
        *self.cancel_reply.borrow_mut() = Some(reply);
        self
    }

    pub fn with_submit(self, reply: Result<String, BackendError>) -> Self {
        *self.submit_reply.borrow_mut() = Some(reply);
        self
    }

    pub fn with_statuses(self, statuses: Vec<Result<TaskStatus, BackendError>>) -> Self {
        self.statuses.borrow_mut().extend(statuses);
        self
    }

    pub fn events(&self) -> EventLog {
        Rc::clone(&self.events)
    }

    pub fn recorded(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.get()
    }

    pub fn status_calls(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::StatusRequest(_)))
            .count()
    }
}

impl TaskBackend for FakeBackend {
    fn cancel_task(&self, task_id: &str) -> Result<CancelAck, CancelError> {
        self.cancel_calls.set(self.cancel_calls.get() + 1);
        self.events
            .borrow_mut()
            .push(Event::CancelRequest(task_id.to_string()));
        self.cancel_reply
            .borrow()
            .clone()
            .unwrap_or(Ok(CancelAck { message: None }))
    }

    fn task_status(&self, task_id: &str) -> Result<TaskStatus, BackendError> {
        self.events
            .borrow_mut()
            .push(Event::StatusRequest(task_id.to_string()));
        self.statuses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted status".to_string())))
    }

    fn submit_refresh(&self, _user_ids: &[String]) -> Result<String, BackendError> {
        self.submit_reply
            .borrow()
            .clone()
            .unwrap_or_else(|| Ok("task-1".to_string()))
    }
}

pub struct RecordingView {
    events: EventLog,
    pub applied: Vec<UiEffects>,
    pub notices: Vec<Notice>,
}

impl RecordingView {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            applied: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl PanelView for RecordingView {
    fn apply(&mut self, effects: &UiEffects) {
        if let Some(enabled) = effects.cancel_enabled {
            self.events.borrow_mut().push(Event::CancelControl(enabled));
        }
        self.applied.push(effects.clone());
    }

    fn set_cancel_enabled(&mut self, enabled: bool) {
        self.events.borrow_mut().push(Event::CancelControl(enabled));
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}
