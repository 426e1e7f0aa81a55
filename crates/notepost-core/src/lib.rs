//! Content injection and media resolution for browser-driven note composition.
//!
//! The crate is organised leaf-first:
//!
//! - [`unicode`]: splits text into plain and wide code-point runs.
//! - [`classify`]: picks an [`InjectionStrategy`] family for an element.
//! - [`inject`]: the [`TextInjector`] with its ordered fallback chain.
//! - [`poll`] and [`suggest`]: cooperative polling and the suggestion popup probe.
//! - [`topics`]: the [`TopicComposer`] tag-entry protocol.
//! - [`media`]: normalization and resolution of loosely-structured media input.
//! - [`note`]: the validated [`NoteSpec`] aggregate.
//! - [`compose`]: wires the pieces together for one compose attempt.
//!
//! The page itself is reached only through the [`dom::Page`] and
//! [`dom::Element`] traits; `notepost-browser` implements them over the
//! Chrome DevTools Protocol.

pub mod classify;
pub mod compose;
pub mod dom;
pub mod inject;
pub mod media;
pub mod note;
pub mod poll;
pub mod scripts;
pub mod suggest;
pub mod timing;
pub mod topics;
pub mod unicode;

pub use classify::{ElementClassifier, ElementSignals, InjectionStrategy};
pub use compose::{ComposeReport, NoteComposer};
pub use dom::{DomScript, Element, Key, Page};
pub use inject::{
    Attempt, AttemptFailure, DeliverOptions, Delivery, DeliveryStep, TextInjector, WriteMode,
};
pub use media::{
    HttpFetcher, HttpResponse, MediaInput, MediaKind, MediaPathResolver, MediaReference,
    MediaResolution, ReferenceKind, ReqwestFetcher,
};
pub use note::{NoteDraft, NoteSpec, NoteSpecBuilder};
pub use poll::{poll_until, PollOutcome};
pub use suggest::{SuggestionPoller, SuggestionState};
pub use timing::{Timing, WaitPoint};
pub use topics::{normalize_tag, parse_tags, TagReport, TopicComposer};
pub use unicode::{segment, CharClass, CodepointRun};

pub use notepost_types::{Locator, NoteConfig, NoteError, PublishOutcome, TransportError};
