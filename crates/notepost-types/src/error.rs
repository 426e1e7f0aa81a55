//! Error types shared across notepost crates.

use std::fmt;

use thiserror::Error;

/// Failure of an underlying automation or network call.
///
/// Raised by page/element collaborators and HTTP fetchers. It is never
/// masked by the core: every transport failure bubbles to the caller, who may
/// retry the whole operation because `deliver` and `add_tags` always start
/// from a clean focus-and-clear.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport failure during {operation}: {detail}")]
pub struct TransportError {
    /// Which collaborator call failed (e.g. `"Runtime.callFunctionOn"`).
    pub operation: String,
    /// Human-readable cause.
    pub detail: String,
}

impl TransportError {
    pub fn new(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: detail.into(),
        }
    }
}

/// Machine-readable error category carried in [`crate::PublishOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    ElementNotFound,
    InjectionTimeout,
    PopupTimeout,
    MediaResolution,
    Transport,
    ContentOverwritten,
    Config,
    Io,
}

impl ErrorKind {
    /// Stable snake_case identifier used in serialized outcomes.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::InjectionTimeout => "injection_timeout",
            ErrorKind::PopupTimeout => "popup_timeout",
            ErrorKind::MediaResolution => "media_resolution_error",
            ErrorKind::Transport => "transport_error",
            ErrorKind::ContentOverwritten => "content_overwritten",
            ErrorKind::Config => "config_error",
            ErrorKind::Io => "io_error",
        }
    }

    /// Whether a caller may reasonably retry the whole operation.
    ///
    /// Validation and configuration problems will fail identically on retry.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Validation | ErrorKind::Config)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the note composition pipeline.
///
/// Each variant names the stage that failed and carries enough context
/// (field, locator, tag, stage) for a caller to log or retry at a higher level.
#[derive(Debug, Error)]
pub enum NoteError {
    /// A note field violated its invariant. Raised before any DOM interaction.
    #[error("invalid {field} ({value:?}): {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// No element matched any of the supplied locators.
    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    /// Every delivery strategy ran without an observable effect on the element.
    #[error("text injection produced no effect during {stage} after {attempts} attempt(s)")]
    InjectionTimeout { stage: String, attempts: usize },

    /// The tag suggestion popup never appeared.
    #[error("suggestion popup did not appear for tag {tag:?}")]
    PopupTimeout { tag: String },

    /// No media token could be resolved to a local file.
    #[error("{message}")]
    MediaResolution { message: String },

    /// Editor content that existed before tag entry is no longer present.
    #[error("pre-existing editor content was overwritten (expected to find {expected:?})")]
    ContentOverwritten { expected: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NoteError {
    /// Build a validation error for `field` holding `value`.
    pub fn validation(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        NoteError::Validation {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NoteError::Validation { .. } => ErrorKind::Validation,
            NoteError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            NoteError::InjectionTimeout { .. } => ErrorKind::InjectionTimeout,
            NoteError::PopupTimeout { .. } => ErrorKind::PopupTimeout,
            NoteError::MediaResolution { .. } => ErrorKind::MediaResolution,
            NoteError::ContentOverwritten { .. } => ErrorKind::ContentOverwritten,
            NoteError::Transport(_) => ErrorKind::Transport,
            NoteError::Config(_) => ErrorKind::Config,
            NoteError::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display_names_operation() {
        let err = TransportError::new("DOM.focus", "socket closed");
        assert_eq!(
            err.to_string(),
            "transport failure during DOM.focus: socket closed"
        );
    }

    #[test]
    fn validation_error_names_field_and_value() {
        let err = NoteError::validation("title", "", "must not be empty");
        let msg = err.to_string();
        assert!(msg.contains("title"));
        assert!(msg.contains("must not be empty"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn transport_converts_into_note_error() {
        let err: NoteError = TransportError::new("Input.dispatchKeyEvent", "timeout").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("Input.dispatchKeyEvent"));
    }

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(ErrorKind::Validation.as_str(), "validation_error");
        assert_eq!(ErrorKind::PopupTimeout.as_str(), "popup_timeout");
        assert_eq!(ErrorKind::MediaResolution.to_string(), "media_resolution_error");
    }

    #[test]
    fn validation_and_config_are_not_retryable() {
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Config.is_retryable());
        assert!(ErrorKind::Transport.is_retryable());
        assert!(ErrorKind::ElementNotFound.is_retryable());
    }
}
