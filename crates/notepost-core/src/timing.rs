//! Named settle delays after DOM mutations.
//!
//! Reactive pages re-render asynchronously after typing and clicking. Every
//! pause the pipeline takes goes through [`Timing::settle`] with a
//! [`WaitPoint`] naming why, so each can be tuned or zeroed independently.

use std::time::Duration;

use notepost_types::TimingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitPoint {
    AfterFocus,
    AfterKeystrokes,
    AfterCaretMove,
    AfterLineBreak,
    AfterConfirm,
    AfterRollback,
    AfterSeparator,
    /// Between a popup being found and the confirm keystroke.
    PopupSettle,
}

#[derive(Debug, Clone, Default)]
pub struct Timing {
    config: TimingConfig,
}

impl Timing {
    pub fn new(config: TimingConfig) -> Self {
        Self { config }
    }

    /// No settle delays at all.
    pub fn none() -> Self {
        Self::new(TimingConfig::none())
    }

    pub fn delay(&self, point: WaitPoint) -> Duration {
        let ms = match point {
            WaitPoint::AfterFocus => self.config.after_focus,
            WaitPoint::AfterKeystrokes => self.config.after_keystrokes,
            WaitPoint::AfterCaretMove => self.config.after_caret_move,
            WaitPoint::AfterLineBreak => self.config.after_line_break,
            WaitPoint::AfterConfirm => self.config.after_confirm,
            WaitPoint::AfterRollback => self.config.after_rollback,
            WaitPoint::AfterSeparator => self.config.after_separator,
            WaitPoint::PopupSettle => self.config.popup_settle,
        };
        Duration::from_millis(ms)
    }

    /// How long to wait for the form to become interactable after media is
    /// attached. Not a settle delay.
    pub fn form_ready_timeout(&self) -> Duration {
        self.config.form_ready_timeout()
    }

    pub async fn settle(&self, point: WaitPoint) {
        let delay = self.delay(point);
        if delay.is_zero() {
            return;
        }
        tracing::trace!(?point, ?delay, "settling");
        tokio::time::sleep(delay).await;
    }
}
