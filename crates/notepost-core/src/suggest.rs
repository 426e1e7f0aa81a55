//! Suggestion popup detection.
//!
//! After the trigger token is typed the host page opens a dropdown of
//! suggestions asynchronously. [`SuggestionPoller`] probes the configured
//! popup locators in priority order until one yields a visible container with
//! at least one selectable option. A visible but empty container is not a
//! match.

use std::time::Duration;

use notepost_types::{Locator, NoteConfig, TransportError};

use crate::dom::{Element, Page};
use crate::poll::{poll_until, PollOutcome};

/// How one trigger's popup wait ended.
///
/// The idle and polling phases live only inside
/// [`SuggestionPoller::wait_for_popup`]; callers see the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionState {
    /// A popup with this many selectable options is showing.
    Found(usize),
    TimedOut,
}

impl SuggestionState {
    pub fn is_found(self) -> bool {
        matches!(self, SuggestionState::Found(_))
    }

    /// Option count when a popup was found.
    pub fn options(self) -> Option<usize> {
        match self {
            SuggestionState::Found(count) => Some(count),
            SuggestionState::TimedOut => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionPoller {
    popup: Vec<Locator>,
    options: Vec<Locator>,
    interval: Duration,
}

impl SuggestionPoller {
    pub fn new(popup: Vec<Locator>, options: Vec<Locator>, interval: Duration) -> Self {
        Self {
            popup,
            options,
            interval,
        }
    }

    pub fn from_config(config: &NoteConfig) -> Self {
        Self::new(
            config.locators.popup.clone(),
            config.locators.popup_option.clone(),
            config.topics.poll_interval(),
        )
    }

    /// Wait up to `max_wait` for a populated popup.
    ///
    /// Returns [`SuggestionState::Found`] or [`SuggestionState::TimedOut`].
    /// Transport failures end the wait and propagate.
    pub async fn wait_for_popup<P: Page>(
        &self,
        page: &P,
        max_wait: Duration,
    ) -> Result<SuggestionState, TransportError> {
        tracing::trace!(?max_wait, "polling for suggestion popup");

        let outcome = poll_until(self.interval, max_wait, || self.probe(page)).await?;
        let state = match outcome {
            PollOutcome::Found(count) => SuggestionState::Found(count),
            PollOutcome::TimedOut => SuggestionState::TimedOut,
        };

        match state {
            SuggestionState::Found(count) => {
                tracing::debug!(options = count, "suggestion popup found")
            }
            SuggestionState::TimedOut => {
                tracing::debug!(?max_wait, "suggestion popup did not appear")
            }
        }
        Ok(state)
    }

    /// One pass over the popup locators. `Some(n)` when a visible container
    /// holds `n > 0` options.
    pub async fn probe<P: Page>(&self, page: &P) -> Result<Option<usize>, TransportError> {
        for locator in &self.popup {
            for candidate in page.find_elements(locator).await? {
                if !candidate.is_visible().await? {
                    continue;
                }
                if let Some(count) = self.count_options(&candidate).await? {
                    tracing::trace!(locator = %locator, options = count, "popup candidate matched");
                    return Ok(Some(count));
                }
            }
        }
        Ok(None)
    }

    /// Option count under the first option locator that matches anything.
    async fn count_options<E: Element>(&self, container: &E) -> Result<Option<usize>, TransportError> {
        for locator in &self.options {
            let count = container.count_matches(locator).await?;
            if count > 0 {
                return Ok(Some(count));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_reports_option_count() {
        assert!(SuggestionState::Found(3).is_found());
        assert_eq!(SuggestionState::Found(3).options(), Some(3));
        assert!(!SuggestionState::TimedOut.is_found());
        assert_eq!(SuggestionState::TimedOut.options(), None);
    }

    #[test]
    fn from_config_uses_locator_lists() {
        let config = NoteConfig::default();
        let poller = SuggestionPoller::from_config(&config);
        assert_eq!(poller.popup, config.locators.popup);
        assert_eq!(poller.options, config.locators.popup_option);
        assert_eq!(poller.interval, Duration::from_millis(200));
    }
}
