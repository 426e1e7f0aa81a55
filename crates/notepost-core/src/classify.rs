//! Element classification: which injection family fits a target element.

use notepost_types::{InjectionConfig, TransportError};

use crate::dom::{DomScript, Element};
use crate::scripts;

/// How text is written into an element when native keystrokes are not enough.
///
/// [`ElementClassifier`] only ever returns the first three; `ClipboardPaste`
/// works on any element and leads the chain whenever text carries wide runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionStrategy {
    /// Native `<input>` or `<textarea>`.
    PlainField,
    /// `contenteditable` host or a recognised rich-text editor.
    RichEditor,
    /// Anything else; assumed to be owned by a reactive UI framework.
    FrameworkManaged,
    ClipboardPaste,
}

impl InjectionStrategy {
    /// The in-page script that applies this strategy.
    pub fn script(self) -> DomScript {
        match self {
            InjectionStrategy::PlainField => scripts::ASSIGN_PLAIN_FIELD,
            InjectionStrategy::RichEditor => scripts::ASSIGN_RICH_EDITOR,
            InjectionStrategy::FrameworkManaged => scripts::ASSIGN_FRAMEWORK,
            InjectionStrategy::ClipboardPaste => scripts::PASTE_TEXT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InjectionStrategy::PlainField => "plain_field",
            InjectionStrategy::RichEditor => "rich_editor",
            InjectionStrategy::FrameworkManaged => "framework_managed",
            InjectionStrategy::ClipboardPaste => "clipboard_paste",
        }
    }
}

impl std::fmt::Display for InjectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three signals classification reads from an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSignals {
    pub tag: String,
    pub contenteditable: Option<String>,
    pub class: String,
}

impl ElementSignals {
    pub async fn read<E: Element + ?Sized>(element: &E) -> Result<Self, TransportError> {
        Ok(Self {
            tag: element.tag_name().await?.to_ascii_lowercase(),
            contenteditable: element.attribute("contenteditable").await?,
            class: element.attribute("class").await?.unwrap_or_default(),
        })
    }
}

/// Decides the [`InjectionStrategy`] for an element once per delivery.
#[derive(Debug, Clone)]
pub struct ElementClassifier {
    rich_editor_markers: Vec<String>,
}

impl ElementClassifier {
    pub fn new(rich_editor_markers: Vec<String>) -> Self {
        Self {
            rich_editor_markers: rich_editor_markers
                .into_iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &InjectionConfig) -> Self {
        Self::new(config.rich_editor_markers.clone())
    }

    /// Pure decision over already-read signals.
    ///
    /// Order: native form fields, then editable hosts or rich-editor class
    /// fingerprints, then the framework-managed default.
    pub fn classify_signals(&self, signals: &ElementSignals) -> InjectionStrategy {
        if matches!(signals.tag.as_str(), "input" | "textarea") {
            return InjectionStrategy::PlainField;
        }

        let editable = signals
            .contenteditable
            .as_deref()
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "" | "plaintext-only"))
            .unwrap_or(false);
        if editable {
            return InjectionStrategy::RichEditor;
        }

        let class = signals.class.to_ascii_lowercase();
        if self
            .rich_editor_markers
            .iter()
            .any(|marker| class.contains(marker.as_str()))
        {
            return InjectionStrategy::RichEditor;
        }

        InjectionStrategy::FrameworkManaged
    }

    /// Read the element and classify it. Introspection failures degrade to
    /// [`InjectionStrategy::FrameworkManaged`] instead of erroring.
    pub async fn classify<E: Element + ?Sized>(&self, element: &E) -> InjectionStrategy {
        match ElementSignals::read(element).await {
            Ok(signals) => {
                let strategy = self.classify_signals(&signals);
                tracing::debug!(
                    tag = %signals.tag,
                    contenteditable = ?signals.contenteditable,
                    class = %signals.class,
                    strategy = %strategy,
                    "classified element"
                );
                strategy
            }
            Err(e) => {
                tracing::warn!(error = %e, "element introspection failed, assuming framework-managed");
                InjectionStrategy::FrameworkManaged
            }
        }
    }
}

impl Default for ElementClassifier {
    fn default() -> Self {
        Self::from_config(&InjectionConfig::default())
    }
}
