//! One compose attempt: media, title, body, tags.
//!
//! The publish button is never pressed here; composing stops once the form
//! is filled so the caller decides what happens next.

use notepost_types::{Locator, NoteConfig, NoteError, PublishOutcome};

use crate::dom::{self, Element, Page};
use crate::inject::{DeliverOptions, DeliveryStep, TextInjector};
use crate::note::NoteSpec;
use crate::poll::{poll_until, PollOutcome};
use crate::timing::{Timing, WaitPoint};
use crate::topics::{TagReport, TopicComposer};

/// What each step of a successful compose did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeReport {
    pub media_attached: usize,
    pub title_route: DeliveryStep,
    pub body_route: DeliveryStep,
    pub tags: TagReport,
}

#[derive(Debug, Clone)]
pub struct NoteComposer {
    locators: ComposeLocators,
    injector: TextInjector,
    topics: TopicComposer,
    timing: Timing,
    poll_interval: std::time::Duration,
}

#[derive(Debug, Clone)]
struct ComposeLocators {
    title: Vec<Locator>,
    file_input: Vec<Locator>,
}

impl NoteComposer {
    pub fn new(config: &NoteConfig) -> Self {
        Self {
            locators: ComposeLocators {
                title: config.locators.title.clone(),
                file_input: config.locators.file_input.clone(),
            },
            injector: TextInjector::new(config),
            topics: TopicComposer::new(config),
            timing: Timing::new(config.timing.clone()),
            poll_interval: config.topics.poll_interval(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.injector = self.injector.with_timing(timing.clone());
        self.topics = self.topics.with_timing(timing.clone());
        self.timing = timing;
        self
    }

    /// Fill the form on `page` from `note`.
    pub async fn compose<P: Page>(&self, page: &P, note: &NoteSpec) -> Result<ComposeReport, NoteError> {
        let media_attached = self.attach_media(page, note).await?;

        let title_field = self.wait_for_title(page).await?;
        let title = self
            .injector
            .deliver(&title_field, note.title(), DeliverOptions::replace("title"))
            .await?;
        self.timing.settle(WaitPoint::AfterKeystrokes).await;

        let editor = self.topics.find_editor(page).await?;
        let body = self
            .injector
            .deliver(&editor, note.body(), DeliverOptions::replace("body"))
            .await?;
        self.timing.settle(WaitPoint::AfterKeystrokes).await;

        let tags = self.topics.add_tags(page, &editor, note.tags()).await?;

        Ok(ComposeReport {
            media_attached,
            title_route: title.route,
            body_route: body.route,
            tags,
        })
    }

    /// [`NoteComposer::compose`], folded into the user-visible outcome.
    pub async fn compose_outcome<P: Page>(&self, page: &P, note: &NoteSpec) -> PublishOutcome {
        match self.compose(page, note).await {
            Ok(report) => PublishOutcome::from_tag_counts(
                note.title(),
                report.tags.requested.len(),
                report.tags.success_count(),
            ),
            Err(e) => {
                tracing::error!(error = %e, kind = %e.kind(), "compose failed");
                PublishOutcome::failed(Some(note.title()), &e)
            }
        }
    }

    async fn attach_media<P: Page>(&self, page: &P, note: &NoteSpec) -> Result<usize, NoteError> {
        let media = note.media();
        let input = dom::find_any(page, &self.locators.file_input)
            .await?
            .ok_or_else(|| NoteError::ElementNotFound {
                locator: dom::describe_locators(&self.locators.file_input),
            })?;
        input.set_files(media).await?;
        tracing::info!(count = media.len(), "media attached");
        Ok(media.len())
    }

    /// The title field appears only once uploaded media has been accepted.
    async fn wait_for_title<P: Page>(&self, page: &P) -> Result<P::Element, NoteError> {
        let outcome = poll_until(self.poll_interval, self.timing.form_ready_timeout(), || {
            dom::find_interactable(page, &self.locators.title)
        })
        .await?;
        match outcome {
            PollOutcome::Found((element, locator)) => {
                tracing::debug!(locator = %locator, "title field ready");
                Ok(element)
            }
            PollOutcome::TimedOut => Err(NoteError::ElementNotFound {
                locator: dom::describe_locators(&self.locators.title),
            }),
        }
    }
}
