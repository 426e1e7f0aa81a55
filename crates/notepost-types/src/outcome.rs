//! Structured result reported to callers after a compose attempt.

use serde::{Deserialize, Serialize};

use crate::NoteError;

/// User-visible result of one compose attempt.
///
/// Always carries a success flag and a human-readable message; `error_kind`
/// is set only on failure and holds an [`crate::ErrorKind`] string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub success: bool,
    pub message: String,
    pub note_title: Option<String>,
    pub tags_requested: usize,
    pub tags_committed: usize,
    pub error_kind: Option<String>,
}

impl PublishOutcome {
    /// Every requested step completed.
    pub fn succeeded(title: &str, tags_requested: usize, tags_committed: usize) -> Self {
        Self {
            success: true,
            message: format!("note \"{title}\" composed with {tags_committed} tag(s)"),
            note_title: Some(title.to_string()),
            tags_requested,
            tags_committed,
            error_kind: None,
        }
    }

    /// Title and body went in but only some tags were committed.
    ///
    /// Still a success: a partially tagged note is publishable.
    pub fn partial(title: &str, tags_requested: usize, tags_committed: usize) -> Self {
        Self {
            success: true,
            message: format!(
                "note \"{title}\" composed; {tags_committed} of {tags_requested} tag(s) committed"
            ),
            note_title: Some(title.to_string()),
            tags_requested,
            tags_committed,
            error_kind: None,
        }
    }

    /// The attempt failed with `err`.
    pub fn failed(title: Option<&str>, err: &NoteError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            note_title: title.map(str::to_string),
            tags_requested: 0,
            tags_committed: 0,
            error_kind: Some(err.kind().as_str().to_string()),
        }
    }

    /// Choose between success, partial, and hard failure from tag counts.
    ///
    /// Zero committed tags out of a non-empty request is a hard failure.
    pub fn from_tag_counts(title: &str, requested: usize, committed: usize) -> Self {
        if requested > 0 && committed == 0 {
            let err = NoteError::PopupTimeout {
                tag: "(all tags)".into(),
            };
            let mut outcome = Self::failed(Some(title), &err);
            outcome.message = format!("none of the {requested} tag(s) could be committed");
            outcome.tags_requested = requested;
            return outcome;
        }
        if committed < requested {
            Self::partial(title, requested, committed)
        } else {
            Self::succeeded(title, requested, committed)
        }
    }
}
