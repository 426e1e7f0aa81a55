//! Text delivery into editable elements.
//!
//! [`TextInjector::deliver`] picks one of two routes:
//!
//! - **Keystrokes**: text with no wide characters goes through native key
//!   dispatch.
//! - **Injection chain**: text with a wide run (or any text when forced)
//!   goes through an ordered list of [`InjectionStrategy`] attempts,
//!   clipboard paste first and then the element's classified strategy. Each
//!   attempt is judged by comparing the element's content before and after
//!   the write. The first attempt with a visible effect wins.
//!
//! Transport failures are never absorbed by the chain; they abort delivery
//! immediately. A chain where every attempt had no effect is an
//! [`NoteError::InjectionTimeout`].

use serde_json::{json, Value};

use notepost_types::{InjectionConfig, NoteConfig, NoteError};

use crate::classify::{ElementClassifier, InjectionStrategy};
use crate::dom::Element;
use crate::timing::{Timing, WaitPoint};
use crate::unicode;

/// Whether delivery replaces the element's content or inserts at the caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Focus, clear, then write. Repeated calls overwrite.
    #[default]
    Replace,
    /// Insert at the current caret without focusing or clearing.
    Append,
}

impl WriteMode {
    fn is_append(self) -> bool {
        matches!(self, WriteMode::Append)
    }
}

/// Per-call delivery options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverOptions {
    /// Take the injection chain even when the text is all plain.
    pub force_special_path: bool,
    pub mode: WriteMode,
    /// What is being written; carried into errors and logs.
    pub label: &'static str,
}

impl Default for DeliverOptions {
    fn default() -> Self {
        Self {
            force_special_path: false,
            mode: WriteMode::Replace,
            label: "text",
        }
    }
}

impl DeliverOptions {
    pub fn replace(label: &'static str) -> Self {
        Self {
            label,
            ..Self::default()
        }
    }

    pub fn append(label: &'static str) -> Self {
        Self {
            mode: WriteMode::Append,
            label,
            ..Self::default()
        }
    }

    pub fn forced(mut self) -> Self {
        self.force_special_path = true;
        self
    }
}

/// The route a delivery took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStep {
    Keystrokes,
    Inject(InjectionStrategy),
}

impl DeliveryStep {
    pub fn is_clipboard(self) -> bool {
        matches!(self, DeliveryStep::Inject(InjectionStrategy::ClipboardPaste))
    }
}

impl std::fmt::Display for DeliveryStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStep::Keystrokes => f.write_str("keystrokes"),
            DeliveryStep::Inject(strategy) => write!(f, "{strategy}"),
        }
    }
}

/// Why a single chain attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The script ran but the element's content did not change as required.
    NoEffect,
    /// The page reported an exception from inside the script.
    ScriptError(String),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::NoEffect => f.write_str("no observable effect"),
            AttemptFailure::ScriptError(msg) => write!(f, "script error: {msg}"),
        }
    }
}

/// One entry of the fallback chain and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: InjectionStrategy,
    pub result: Result<(), AttemptFailure>,
}

/// Record of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub route: DeliveryStep,
    /// Chain attempts in order, the last one being the winner. Empty for
    /// keystroke delivery.
    pub attempts: Vec<Attempt>,
}

/// Content snapshots returned by an injection script.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    before: String,
    after: String,
}

/// Decode an injection script's return value.
fn parse_snapshot(value: &Value) -> Result<Snapshot, AttemptFailure> {
    if let Some(err) = value.get("error") {
        let msg = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(AttemptFailure::ScriptError(msg));
    }
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    match (text("before"), text("after")) {
        (Some(before), Some(after)) => Ok(Snapshot { before, after }),
        _ => Err(AttemptFailure::ScriptError(format!(
            "unexpected script result: {value}"
        ))),
    }
}

/// Whether a write had the effect `mode` requires.
///
/// A replace must leave non-blank content that differs from what was there
/// (or already equals the requested text). An append must change the
/// content at all.
fn took_effect(mode: WriteMode, text: &str, snapshot: &Snapshot) -> bool {
    match mode {
        WriteMode::Replace => {
            !snapshot.after.trim().is_empty()
                && (snapshot.after != snapshot.before || snapshot.after.trim() == text.trim())
        }
        WriteMode::Append => snapshot.after != snapshot.before,
    }
}

/// Whether `text` must leave the keystroke route.
fn needs_injection(text: &str, options: &DeliverOptions, config: &InjectionConfig) -> bool {
    options.force_special_path || (config.special_path_enabled && unicode::contains_wide(text))
}

/// Fallback order for the injection chain: clipboard paste, then direct
/// assignment through the classified strategy.
fn fallback_chain(classified: InjectionStrategy) -> Vec<InjectionStrategy> {
    let mut chain = vec![InjectionStrategy::ClipboardPaste];
    if classified != InjectionStrategy::ClipboardPaste {
        chain.push(classified);
    }
    chain
}

/// Delivers text into elements. Cheap to clone; holds only configuration.
#[derive(Debug, Clone)]
pub struct TextInjector {
    config: InjectionConfig,
    classifier: ElementClassifier,
    timing: Timing,
}

impl TextInjector {
    pub fn new(config: &NoteConfig) -> Self {
        Self {
            config: config.injection.clone(),
            classifier: ElementClassifier::from_config(&config.injection),
            timing: Timing::new(config.timing.clone()),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn config(&self) -> &InjectionConfig {
        &self.config
    }

    /// The route `deliver` would take for `text`, without touching the page.
    ///
    /// `None` means the injection chain; which strategy wins is only known
    /// once the element has been classified and written.
    pub fn plan(&self, text: &str, options: &DeliverOptions) -> Option<DeliveryStep> {
        (!needs_injection(text, options, &self.config)).then_some(DeliveryStep::Keystrokes)
    }

    /// Write `text` into `element`.
    ///
    /// In [`WriteMode::Replace`] the element is focused and cleared first,
    /// so the call is safe to repeat after an abort.
    pub async fn deliver<E: Element + ?Sized>(
        &self,
        element: &E,
        text: &str,
        options: DeliverOptions,
    ) -> Result<Delivery, NoteError> {
        self.log_text(text, &options);

        if !options.mode.is_append() {
            element.focus().await?;
            self.timing.settle(WaitPoint::AfterFocus).await;
            element.clear().await?;
        }

        if !needs_injection(text, &options, &self.config) {
            element.type_text(text).await?;
            tracing::info!(label = options.label, route = "keystrokes", "text delivered");
            return Ok(Delivery {
                route: DeliveryStep::Keystrokes,
                attempts: Vec::new(),
            });
        }

        let classified = self.classifier.classify(element).await;
        let chain = fallback_chain(classified);
        let args = [json!(text), json!(options.mode.is_append())];
        let mut attempts = Vec::with_capacity(chain.len());

        for strategy in chain {
            let value = element.execute(&strategy.script(), &args).await?;
            let result = parse_snapshot(&value).and_then(|snapshot| {
                if value.get("cancelled").and_then(Value::as_bool) == Some(true) {
                    tracing::debug!(strategy = %strategy, "paste event was cancelled by the page");
                }
                if took_effect(options.mode, text, &snapshot) {
                    Ok(())
                } else {
                    Err(AttemptFailure::NoEffect)
                }
            });

            match &result {
                Ok(()) => tracing::debug!(label = options.label, strategy = %strategy, "attempt succeeded"),
                Err(failure) => tracing::debug!(
                    label = options.label,
                    strategy = %strategy,
                    reason = %failure,
                    "attempt failed"
                ),
            }

            let won = result.is_ok();
            attempts.push(Attempt { strategy, result });
            if won {
                tracing::info!(label = options.label, route = %strategy, "text delivered");
                return Ok(Delivery {
                    route: DeliveryStep::Inject(strategy),
                    attempts,
                });
            }
        }

        tracing::warn!(
            label = options.label,
            attempts = attempts.len(),
            "every injection strategy failed"
        );
        Err(NoteError::InjectionTimeout {
            stage: options.label.to_string(),
            attempts: attempts.len(),
        })
    }

    fn log_text(&self, text: &str, options: &DeliverOptions) {
        if self.config.log_text {
            tracing::debug!(label = options.label, text = %text, mode = ?options.mode, "delivering");
        } else {
            tracing::debug!(
                label = options.label,
                chars = text.chars().count(),
                mode = ?options.mode,
                "delivering"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(before: &str, after: &str) -> Snapshot {
        Snapshot {
            before: before.into(),
            after: after.into(),
        }
    }

    #[test]
    fn plain_text_stays_on_keystrokes() {
        let injector = TextInjector::new(&NoteConfig::default());
        assert_eq!(
            injector.plan("hello world", &DeliverOptions::default()),
            Some(DeliveryStep::Keystrokes)
        );
        assert_eq!(
            injector.plan("中文标题", &DeliverOptions::default()),
            Some(DeliveryStep::Keystrokes)
        );
    }

    #[test]
    fn wide_text_leaves_keystrokes() {
        let injector = TextInjector::new(&NoteConfig::default());
        assert_eq!(injector.plan("Caption 😊", &DeliverOptions::default()), None);
    }

    #[test]
    fn force_flag_leaves_keystrokes() {
        let injector = TextInjector::new(&NoteConfig::default());
        assert_eq!(
            injector.plan("plain", &DeliverOptions::replace("title").forced()),
            None
        );
    }

    #[test]
    fn disabled_special_path_keeps_wide_text_on_keystrokes() {
        let mut config = NoteConfig::default();
        config.injection.special_path_enabled = false;
        let injector = TextInjector::new(&config);
        assert_eq!(
            injector.plan("Caption 😊", &DeliverOptions::default()),
            Some(DeliveryStep::Keystrokes)
        );
        assert_eq!(
            injector.plan("Caption 😊", &DeliverOptions::default().forced()),
            None
        );
    }

    #[test]
    fn chain_starts_with_clipboard() {
        assert_eq!(
            fallback_chain(InjectionStrategy::RichEditor),
            vec![InjectionStrategy::ClipboardPaste, InjectionStrategy::RichEditor]
        );
        assert_eq!(
            fallback_chain(InjectionStrategy::ClipboardPaste),
            vec![InjectionStrategy::ClipboardPaste]
        );
    }

    #[test]
    fn replace_needs_non_blank_changed_content() {
        assert!(took_effect(WriteMode::Replace, "hi", &snap("", "hi")));
        assert!(!took_effect(WriteMode::Replace, "hi", &snap("", "")));
        assert!(!took_effect(WriteMode::Replace, "hi", &snap("", "\n")));
        assert!(!took_effect(WriteMode::Replace, "hi", &snap("old", "old")));
        assert!(took_effect(WriteMode::Replace, "same", &snap("same", "same")));
    }

    #[test]
    fn append_needs_any_change() {
        assert!(took_effect(WriteMode::Append, "#a", &snap("body", "body#a")));
        assert!(!took_effect(WriteMode::Append, "#a", &snap("body", "body")));
    }

    #[test]
    fn snapshot_parsing() {
        assert_eq!(
            parse_snapshot(&json!({"before": "", "after": "x", "cancelled": false})),
            Ok(snap("", "x"))
        );
        assert_eq!(
            parse_snapshot(&json!({"error": "TypeError: boom"})),
            Err(AttemptFailure::ScriptError("TypeError: boom".into()))
        );
        assert!(matches!(
            parse_snapshot(&Value::Null),
            Err(AttemptFailure::ScriptError(_))
        ));
    }

    #[test]
    fn delivery_step_display() {
        assert_eq!(DeliveryStep::Keystrokes.to_string(), "keystrokes");
        assert_eq!(
            DeliveryStep::Inject(InjectionStrategy::ClipboardPaste).to_string(),
            "clipboard_paste"
        );
        assert!(DeliveryStep::Inject(InjectionStrategy::ClipboardPaste).is_clipboard());
    }
}
