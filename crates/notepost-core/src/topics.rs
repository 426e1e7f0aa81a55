//! Topic tag entry.
//!
//! Tags are appended on a fresh line at the end of the body editor. For each
//! tag the trigger token is typed, the suggestion popup is awaited, and the
//! first suggestion is confirmed. A tag whose popup never shows is erased
//! again keystroke by keystroke so the editor is left as it was.

use std::sync::LazyLock;

use regex::Regex;

use notepost_types::{Locator, NoteConfig, NoteError, TopicConfig};

use crate::dom::{self, Element, Key, Page};
use crate::inject::{DeliverOptions, TextInjector};
use crate::suggest::{SuggestionPoller, SuggestionState};
use crate::timing::{Timing, WaitPoint};

/// Characters of the original content that must survive tag entry.
const PRESERVATION_PROBE_CHARS: usize = 10;

static TAG_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,，]|\s+#").expect("tag separator pattern is valid"));

/// Split a loosely formatted tag string.
///
/// Accepts ASCII and full-width commas and whitespace-separated `#` markers:
/// `"food, travel"`, `"food，travel"` and `"#food #travel"` all yield
/// `["food", "travel"]`. Leading `#` is stripped and empty entries dropped.
pub fn parse_tags(input: &str) -> Vec<String> {
    TAG_SEPARATOR
        .split(input)
        .filter_map(normalize_tag)
        .collect()
}

/// Trim one tag and strip its leading markers. `None` if nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim();
    (!tag.is_empty()).then(|| tag.to_string())
}

/// The text typed for `tag`, prefixed with `trigger` unless it already is.
fn tag_token(trigger: &str, tag: &str) -> String {
    if tag.starts_with(trigger) {
        tag.to_string()
    } else {
        format!("{trigger}{tag}")
    }
}

/// The leading slice of the original editor text that must still be present
/// afterwards. `None` when the editor started out blank.
fn preservation_probe(original: &str) -> Option<String> {
    let trimmed = original.trim();
    (!trimmed.is_empty()).then(|| trimmed.chars().take(PRESERVATION_PROBE_CHARS).collect())
}

/// What happened to each requested tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    /// Tags attempted, after the `max_tags` cap.
    pub requested: Vec<String>,
    pub committed: Vec<String>,
    /// Tags whose popup timed out and were rolled back.
    pub failed: Vec<String>,
    /// Extra suggestions accepted by auto-fill.
    pub auto_filled: usize,
}

impl TagReport {
    pub fn success_count(&self) -> usize {
        self.committed.len() + self.auto_filled
    }
}

/// Drives the tag-entry protocol against a body editor.
#[derive(Debug, Clone)]
pub struct TopicComposer {
    config: TopicConfig,
    editor_locators: Vec<Locator>,
    injector: TextInjector,
    poller: SuggestionPoller,
    timing: Timing,
}

impl TopicComposer {
    pub fn new(config: &NoteConfig) -> Self {
        Self {
            config: config.topics.clone(),
            editor_locators: config.locators.body_editor.clone(),
            injector: TextInjector::new(config),
            poller: SuggestionPoller::from_config(config),
            timing: Timing::new(config.timing.clone()),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.injector = self.injector.with_timing(timing.clone());
        self.timing = timing;
        self
    }

    /// First visible and enabled element under the body-editor locators.
    pub async fn find_editor<P: Page>(&self, page: &P) -> Result<P::Element, NoteError> {
        match dom::find_interactable(page, &self.editor_locators).await? {
            Some((element, _)) => Ok(element),
            None => Err(NoteError::ElementNotFound {
                locator: dom::describe_locators(&self.editor_locators),
            }),
        }
    }

    /// Append up to `max_tags` of `tags` to `editor`.
    ///
    /// A popup timeout for one tag is rolled back and recorded in
    /// [`TagReport::failed`]. Transport and injection failures abort the
    /// whole run. Afterwards the editor must still contain its original
    /// text, or the run fails with [`NoteError::ContentOverwritten`].
    pub async fn add_tags<P: Page>(
        &self,
        page: &P,
        editor: &P::Element,
        tags: &[String],
    ) -> Result<TagReport, NoteError> {
        let mut report = TagReport {
            requested: tags.iter().take(self.config.max_tags).cloned().collect(),
            ..TagReport::default()
        };
        if report.requested.is_empty() && !self.config.auto_fill {
            return Ok(report);
        }
        tracing::info!(count = report.requested.len(), "adding tags");

        let original = editor.text().await?;
        tracing::debug!(chars = original.chars().count(), "saved original editor content");

        editor.click().await?;
        self.timing.settle(WaitPoint::AfterFocus).await;
        editor.press(Key::DocumentEnd).await?;
        self.timing.settle(WaitPoint::AfterCaretMove).await;
        editor.press(Key::Enter).await?;
        self.timing.settle(WaitPoint::AfterLineBreak).await;

        let last = report.requested.len().saturating_sub(1);
        for (i, tag) in report.requested.clone().into_iter().enumerate() {
            tracing::info!(tag = %tag, index = i + 1, of = last + 1, "adding tag");
            let token = tag_token(&self.config.trigger, &tag);

            if self.commit_token(page, editor, &token).await? {
                report.committed.push(tag);
            } else {
                tracing::warn!(tag = %tag, "suggestion popup never appeared, tag rolled back");
                report.failed.push(tag);
            }

            if i < last {
                editor.press(Key::Space).await?;
                self.timing.settle(WaitPoint::AfterSeparator).await;
            }
        }

        if self.config.auto_fill {
            self.auto_fill(page, editor, &mut report).await?;
        }

        let current = editor.text().await?;
        if let Some(probe) = preservation_probe(&original) {
            if !current.contains(&probe) {
                tracing::error!(expected = %probe, "original editor content was overwritten");
                return Err(NoteError::ContentOverwritten { expected: probe });
            }
        }

        tracing::info!(
            committed = report.committed.len(),
            failed = report.failed.len(),
            auto_filled = report.auto_filled,
            "tags added"
        );
        Ok(report)
    }

    /// Type `token`, wait for the popup, and confirm or roll back.
    ///
    /// Returns whether the suggestion was accepted.
    async fn commit_token<P: Page>(
        &self,
        page: &P,
        editor: &P::Element,
        token: &str,
    ) -> Result<bool, NoteError> {
        self.injector
            .deliver(editor, token, DeliverOptions::append("tag"))
            .await?;
        self.timing.settle(WaitPoint::AfterKeystrokes).await;

        match self
            .poller
            .wait_for_popup(page, self.config.popup_timeout())
            .await?
        {
            SuggestionState::Found(_) => {
                self.timing.settle(WaitPoint::PopupSettle).await;
                editor.press(Key::Enter).await?;
                self.timing.settle(WaitPoint::AfterConfirm).await;
                Ok(true)
            }
            SuggestionState::TimedOut => {
                self.erase(editor, token.chars().count()).await?;
                Ok(false)
            }
        }
    }

    /// Accept bare-trigger suggestions until `max_tags` is reached or the
    /// popup stops appearing.
    async fn auto_fill<P: Page>(
        &self,
        page: &P,
        editor: &P::Element,
        report: &mut TagReport,
    ) -> Result<(), NoteError> {
        let remaining = self.config.max_tags.saturating_sub(report.success_count());
        if remaining > 0 {
            tracing::info!(remaining, "auto-filling tags");
        }

        for _ in 0..remaining {
            let separated = report.success_count() > 0;
            if separated {
                editor.press(Key::Space).await?;
                self.timing.settle(WaitPoint::AfterSeparator).await;
            }

            if self.commit_token(page, editor, &self.config.trigger).await? {
                report.auto_filled += 1;
            } else {
                if separated {
                    self.erase(editor, 1).await?;
                }
                break;
            }
        }
        Ok(())
    }

    async fn erase<E: Element>(&self, editor: &E, chars: usize) -> Result<(), NoteError> {
        for _ in 0..chars {
            editor.press(Key::Backspace).await?;
        }
        self.timing.settle(WaitPoint::AfterRollback).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_comma_separated() {
        assert_eq!(parse_tags("food, travel"), vec!["food", "travel"]);
        assert_eq!(parse_tags("food，travel ,  diary"), vec!["food", "travel", "diary"]);
    }

    #[test]
    fn parse_hash_markers() {
        assert_eq!(parse_tags("#food #travel"), vec!["food", "travel"]);
        assert_eq!(parse_tags("#food,#travel"), vec!["food", "travel"]);
    }

    #[test]
    fn parse_keeps_inner_spaces() {
        assert_eq!(parse_tags("new york, 中文 话题"), vec!["new york", "中文 话题"]);
    }

    #[test]
    fn parse_drops_empties() {
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ，# ").is_empty());
        assert_eq!(parse_tags("a,,b"), vec!["a", "b"]);
    }

    #[test]
    fn token_is_not_double_prefixed() {
        assert_eq!(tag_token("#", "food"), "#food");
        assert_eq!(tag_token("#", "#food"), "#food");
    }

    #[test]
    fn probe_takes_leading_chars() {
        assert_eq!(preservation_probe(""), None);
        assert_eq!(preservation_probe("  \n"), None);
        assert_eq!(preservation_probe("short"), Some("short".into()));
        assert_eq!(
            preservation_probe("  Line one\nLine two"),
            Some("Line one\nL".into())
        );
    }

    #[test]
    fn success_count_includes_auto_filled() {
        let report = TagReport {
            requested: vec!["a".into(), "b".into()],
            committed: vec!["a".into()],
            failed: vec!["b".into()],
            auto_filled: 2,
        };
        assert_eq!(report.success_count(), 3);
    }
}
