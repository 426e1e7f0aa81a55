//! Core types shared across all notepost crates.
//!
//! Defines the configuration loaded from `notepost.toml`, the error taxonomy
//! surfaced by the injection and media pipelines, and the structured outcome
//! reported to callers after a compose attempt.

pub mod config;
pub mod error;
pub mod outcome;

pub use config::{
    InjectionConfig, Locator, LocatorConfig, MediaConfig, NoteConfig, TimingConfig,
    TopicConfig, CONFIG_FILENAME, WORKING_DIR_ENV,
};
pub use error::{ErrorKind, NoteError, TransportError};
pub use outcome::PublishOutcome;
