//! Page-automation collaborator interfaces.
//!
//! The core never talks to a browser directly. It drives a [`Page`] that can
//! locate elements and an [`Element`] that can be focused, typed into, and
//! scripted. Every call returns a [`TransportError`] when the underlying
//! automation channel fails; the core always propagates those.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use notepost_types::{Locator, TransportError};

/// Non-text keys the core needs to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Backspace,
    Space,
    /// End of the current line.
    End,
    /// End of the whole document (Ctrl+End).
    DocumentEnd,
}

/// A named in-page script.
///
/// `source` is a JavaScript function declaration run with the target element
/// bound as `this`; arguments are passed positionally. Test doubles dispatch
/// on `name` instead of evaluating the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomScript {
    pub name: &'static str,
    pub source: &'static str,
}

/// A handle to one element on the page.
#[async_trait]
pub trait Element: Send + Sync {
    async fn focus(&self) -> Result<(), TransportError>;

    async fn click(&self) -> Result<(), TransportError>;

    /// Remove all existing content from the element.
    async fn clear(&self) -> Result<(), TransportError>;

    /// Type `text` through native key dispatch, one character at a time.
    async fn type_text(&self, text: &str) -> Result<(), TransportError>;

    async fn press(&self, key: Key) -> Result<(), TransportError>;

    /// Lower-case tag name (`"input"`, `"div"`, ...).
    async fn tag_name(&self) -> Result<String, TransportError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, TransportError>;

    /// Rendered text (for form fields, the current value).
    async fn text(&self) -> Result<String, TransportError>;

    async fn is_visible(&self) -> Result<bool, TransportError>;

    async fn is_enabled(&self) -> Result<bool, TransportError>;

    /// Number of descendants matching `locator`.
    async fn count_matches(&self, locator: &Locator) -> Result<usize, TransportError>;

    /// Run `script` with this element bound as `this`.
    async fn execute(&self, script: &DomScript, args: &[Value]) -> Result<Value, TransportError>;

    /// Hand local files to a file input.
    async fn set_files(&self, paths: &[PathBuf]) -> Result<(), TransportError> {
        let _ = paths;
        Err(TransportError::new(
            "set_files",
            "this element does not accept files",
        ))
    }
}

/// A page that elements can be located on.
#[async_trait]
pub trait Page: Send + Sync {
    type Element: Element;

    /// All elements matching `locator`, in document order.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Self::Element>, TransportError>;

    /// The first element matching `locator`, if any.
    async fn find_element(
        &self,
        locator: &Locator,
    ) -> Result<Option<Self::Element>, TransportError> {
        Ok(self.find_elements(locator).await?.into_iter().next())
    }
}

/// Scan `locators` in order and return the first element that is both
/// visible and enabled, together with the locator that found it.
pub async fn find_interactable<P: Page>(
    page: &P,
    locators: &[Locator],
) -> Result<Option<(P::Element, Locator)>, TransportError> {
    for locator in locators {
        for element in page.find_elements(locator).await? {
            if element.is_visible().await? && element.is_enabled().await? {
                tracing::debug!(locator = %locator, "found interactable element");
                return Ok(Some((element, locator.clone())));
            }
        }
    }
    Ok(None)
}

/// Scan `locators` in order and return the first match regardless of
/// visibility (file inputs are usually hidden).
pub async fn find_any<P: Page>(
    page: &P,
    locators: &[Locator],
) -> Result<Option<P::Element>, TransportError> {
    for locator in locators {
        if let Some(element) = page.find_element(locator).await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// Render a locator list for error messages.
pub fn describe_locators(locators: &[Locator]) -> String {
    locators
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_locators_joins_in_order() {
        let locators = vec![Locator::css("#a"), Locator::xpath("//b")];
        assert_eq!(describe_locators(&locators), "css:#a | xpath://b");
    }

    #[test]
    fn describe_locators_empty() {
        assert_eq!(describe_locators(&[]), "");
    }

    #[test]
    fn dom_script_is_copy() {
        let script = DomScript {
            name: "noop",
            source: "function() {}",
        };
        let copy = script;
        assert_eq!(copy, script);
    }
}
