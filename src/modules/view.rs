use std::io::Write;
use log::{error, info, warn};
use crate::modules::types::{Notice, NoticeLevel, UiEffects};

/// Whatever draws the task panel.
pub trait PanelView {
    fn apply(&mut self, effects: &UiEffects);
    fn set_cancel_enabled(&mut self, enabled: bool);
    fn notify(&mut self, notice: &Notice);
}

const BAR_WIDTH: usize = 30;

pub fn progress_bar(progress: u8) -> String {
    let filled = BAR_WIDTH * usize::from(progress.min(100)) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress
    )
}

/// Line-oriented panel for terminals.
pub struct TerminalView<W: Write> {
    out: W,
    cancel_enabled: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cancel_enabled: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            error!("Cannot write to panel: {e}");
        }
    }
}

impl<W: Write> PanelView for TerminalView<W> {
    fn apply(&mut self, effects: &UiEffects) {
        if let Some(enabled) = effects.cancel_enabled {
            self.cancel_enabled = enabled;
        }
        let stop = if self.cancel_enabled { "stop: enabled" } else { "stop: disabled" };
        let line = format!(
            "{} {} [{}] {}",
            progress_bar(effects.progress),
            effects.message,
            effects.style,
            stop
        );
        self.write_line(&line);
    }

    fn set_cancel_enabled(&mut self, enabled: bool) {
        self.cancel_enabled = enabled;
    }

    fn notify(&mut self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Error => error!("{}", notice.text),
            NoticeLevel::Warning => warn!("{}", notice.text),
            NoticeLevel::Info | NoticeLevel::Success => info!("{}", notice.text),
        }
        let line = notice.to_string();
        self.write_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::types::StyleClass;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", "-".repeat(30)));
        assert_eq!(progress_bar(100), format!("[{}] 100%", "#".repeat(30)));
        assert!(progress_bar(50).starts_with(&format!("[{}-", "#".repeat(15))));
    }

    #[test]
    fn terminal_view_prints_effects_and_notices() {
        let mut view = TerminalView::new(Vec::new());
        view.apply(&UiEffects {
            message: "task in progress".to_string(),
            style: StyleClass::Info,
            progress: 40,
            cancel_enabled: Some(true),
            clears_active_task: false,
        });
        view.notify(&Notice::new(NoticeLevel::Warning, "no running task"));

        let text = String::from_utf8(view.into_inner()).unwrap();
        assert!(text.contains("task in progress [bg-info] stop: enabled"));
        assert!(text.contains(" 40%"));
        assert!(text.contains("warning: no running task"));
    }

    #[test]
    fn unchanged_button_keeps_previous_state() {
        let mut view = TerminalView::new(Vec::new());
        view.set_cancel_enabled(true);
        view.apply(&UiEffects {
            message: "task pending".to_string(),
            style: StyleClass::Warning,
            progress: 0,
            cancel_enabled: None,
            clears_active_task: false,
        });
        let text = String::from_utf8(view.into_inner()).unwrap();
        assert!(text.contains("stop: enabled"));
    }
}
