use std::thread;
use std::time::Duration;
use log::{info, warn};
use crate::modules::backend::TaskBackend;
use crate::modules::presenter::Presenter;
use crate::modules::types::TaskState;
use crate::modules::view::PanelView;

/// Polls the active task until it reaches a terminal state, the session
/// lets go of it, the backend reports the task unknown, or `max_polls`
/// status queries have been made.
///
/// Updates are applied one at a time in the order they arrive. Returns the
/// last state seen, if any.
pub fn watch<B: TaskBackend, V: PanelView>(
    presenter: &mut Presenter<B, V>,
    interval: Duration,
    max_polls: Option<usize>,
) -> Option<TaskState> {
    let mut last_state = None;
    let mut polls = 0usize;

    loop {
        if max_polls.is_some_and(|max| polls >= max) {
            warn!("Stopped watching after {polls} polls");
            break;
        }
        polls += 1;

        match presenter.refresh() {
            None => {
                info!("No active task to watch");
                break;
            }
            Some(Ok(status)) => {
                let terminal = status.state.is_terminal();
                // the backend answers UNKNOWN + error for ids it has dropped
                let lost = matches!(status.state, TaskState::Unrecognized(_)) && status.error.is_some();
                if lost {
                    warn!(
                        "Backend no longer knows the task: {}",
                        status.error.as_deref().unwrap_or_default()
                    );
                    presenter.abandon();
                    last_state = Some(status.state);
                    break;
                }
                last_state = Some(status.state);
                if terminal || !presenter.session().has_active_task() {
                    break;
                }
            }
            // already logged by the presenter; try again next round
            Some(Err(_)) => {}
        }

        thread::sleep(interval);
    }

    last_state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::session::{ClientTaskSession, MemoryStore, SessionStore, CURRENT_TASK_KEY};
    use crate::modules::testing::{FakeBackend, RecordingView};
    use crate::modules::types::{BackendError, TaskStatus};

    fn presenter(backend: FakeBackend) -> Presenter<FakeBackend, RecordingView> {
        let mut store = MemoryStore::new();
        store.set(CURRENT_TASK_KEY, "t1").unwrap();
        let session = ClientTaskSession::load(Box::new(store)).unwrap();
        let view = RecordingView::new(backend.events());
        Presenter::new(session, backend, view)
    }

    #[test]
    fn stops_on_completion_in_delivery_order() {
        let backend = FakeBackend::new().with_statuses(vec![
            Ok(TaskStatus::new("PENDING", 0)),
            Ok(TaskStatus::new("PROGRESS", 20)),
            Ok(TaskStatus::new("PROGRESS", 70)),
            Ok(TaskStatus::new("COMPLETED", 100)),
            Ok(TaskStatus::new("PROGRESS", 99)),
        ]);
        let mut presenter = presenter(backend);

        let last = watch(&mut presenter, Duration::ZERO, Some(10));

        assert_eq!(last, Some(TaskState::Completed));
        assert_eq!(presenter.backend().status_calls(), 4);
        let progress: Vec<u8> = presenter.view().applied.iter().map(|e| e.progress).collect();
        assert_eq!(progress, vec![0, 20, 70, 100]);
        assert!(!presenter.session().has_active_task());
    }

    #[test]
    fn keeps_polling_through_errors_until_budget() {
        let backend = FakeBackend::new().with_statuses(vec![
            Err(BackendError::Transport("timeout".to_string())),
            Ok(TaskStatus::new("PROGRESS", 10)),
        ]);
        let mut presenter = presenter(backend);

        let last = watch(&mut presenter, Duration::ZERO, Some(3));

        assert_eq!(last, Some(TaskState::Progress));
        assert_eq!(presenter.backend().status_calls(), 3);
        assert!(presenter.session().has_active_task());
    }

    #[test]
    fn stops_and_forgets_task_the_backend_lost() {
        let statuses = (0..50)
            .map(|_| Ok(TaskStatus::new("UNKNOWN", 0).with_error("task not found")))
            .collect();
        let mut presenter = presenter(FakeBackend::new().with_statuses(statuses));

        let last = watch(&mut presenter, Duration::ZERO, None);

        assert_eq!(last, Some(TaskState::Unrecognized("UNKNOWN".to_string())));
        assert_eq!(presenter.backend().status_calls(), 1);
        assert!(!presenter.session().has_active_task());
        assert!(!presenter.cancel_enabled());
    }

    #[test]
    fn unknown_state_without_error_keeps_polling() {
        let backend = FakeBackend::new().with_statuses(vec![
            Ok(TaskStatus::new("PAUSED", 30)),
            Ok(TaskStatus::new("COMPLETED", 100)),
        ]);
        let mut presenter = presenter(backend);

        let last = watch(&mut presenter, Duration::ZERO, Some(5));

        assert_eq!(last, Some(TaskState::Completed));
        assert_eq!(presenter.backend().status_calls(), 2);
    }

    #[test]
    fn idle_without_task() {
        let backend = FakeBackend::new();
        let session = ClientTaskSession::load(Box::new(MemoryStore::new())).unwrap();
        let view = RecordingView::new(backend.events());
        let mut presenter = Presenter::new(session, backend, view);

        assert_eq!(watch(&mut presenter, Duration::ZERO, None), None);
        assert_eq!(presenter.backend().status_calls(), 0);
    }
}
