//! [`Page`] and [`Element`] over CDP.
//!
//! Elements are remote object handles (`objectId`) obtained from
//! `Runtime.evaluate`; every element operation is either a DOM/Input domain
//! command addressed by that id or a `Runtime.callFunctionOn` with the
//! element bound as `this`.
//!
//! Each query evaluates into its own object group. The group is released
//! once the last element handle from that query is dropped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use notepost_core::dom::{DomScript, Element, Key, Page};
use notepost_core::{poll_until, scripts, PollOutcome};
use notepost_types::{Locator, TransportError};

use crate::cdp::{exception_message, CdpClient};
use crate::error::BrowserError;

// ---------------------------------------------------------------------------
// In-page helpers
// ---------------------------------------------------------------------------

const TAG_NAME: &str = "function() { return this.tagName.toLowerCase(); }";

const GET_ATTRIBUTE: &str = "function(name) { return this.getAttribute(name); }";

const IS_VISIBLE: &str = r#"function() {
  if (!this.isConnected) return false;
  const style = window.getComputedStyle(this);
  if (style.display === 'none' || style.visibility === 'hidden') return false;
  const rect = this.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
}"#;

const IS_ENABLED: &str = r#"function() {
  return !this.disabled && this.getAttribute('aria-disabled') !== 'true';
}"#;

const CLEAR: &str = r#"function() {
  const tag = this.tagName.toLowerCase();
  this.focus();
  if (tag === 'input' || tag === 'textarea') {
    const proto = tag === 'textarea' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    Object.getOwnPropertyDescriptor(proto, 'value').set.call(this, '');
  } else {
    const range = document.createRange();
    range.selectNodeContents(this);
    const selection = window.getSelection();
    selection.removeAllRanges();
    selection.addRange(range);
    if (!document.execCommand('delete')) this.textContent = '';
  }
  this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

const COUNT_MATCHES: &str = r#"function(kind, expr) {
  if (kind === 'css') return this.querySelectorAll(expr).length;
  return document.evaluate(expr, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength;
}"#;

/// Expression evaluating to an array of the elements `locator` matches, in
/// document order.
pub fn locator_expression(locator: &Locator) -> String {
    // serde_json string encoding doubles as a JS string literal.
    let literal = Value::String(locator.expression().to_string()).to_string();
    match locator {
        Locator::Css(_) => format!("Array.from(document.querySelectorAll({literal}))"),
        Locator::XPath(_) => format!(
            "(() => {{ const r = document.evaluate({literal}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
             return out; }})()"
        ),
    }
}

fn locator_kind(locator: &Locator) -> &'static str {
    match locator {
        Locator::Css(_) => "css",
        Locator::XPath(_) => "xpath",
    }
}

// ---------------------------------------------------------------------------
// Key dispatch
// ---------------------------------------------------------------------------

/// `Input.dispatchKeyEvent` parameters for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: &'static str,
    pub code: &'static str,
    pub key_code: u32,
    /// Text inserted by the key, if it inserts any.
    pub text: Option<&'static str>,
    /// CDP modifier bitmask (2 = Ctrl).
    pub modifiers: u32,
}

pub fn key_stroke(key: Key) -> KeyStroke {
    match key {
        Key::Enter => KeyStroke {
            key: "Enter",
            code: "Enter",
            key_code: 13,
            text: Some("\r"),
            modifiers: 0,
        },
        Key::Backspace => KeyStroke {
            key: "Backspace",
            code: "Backspace",
            key_code: 8,
            text: None,
            modifiers: 0,
        },
        Key::Space => KeyStroke {
            key: " ",
            code: "Space",
            key_code: 32,
            text: Some(" "),
            modifiers: 0,
        },
        Key::End => KeyStroke {
            key: "End",
            code: "End",
            key_code: 35,
            text: None,
            modifiers: 0,
        },
        Key::DocumentEnd => KeyStroke {
            key: "End",
            code: "End",
            key_code: 35,
            text: None,
            modifiers: 2,
        },
    }
}

impl KeyStroke {
    fn down(&self) -> Value {
        let mut params = json!({
            "type": if self.text.is_some() { "keyDown" } else { "rawKeyDown" },
            "key": self.key,
            "code": self.code,
            "windowsVirtualKeyCode": self.key_code,
            "nativeVirtualKeyCode": self.key_code,
            "modifiers": self.modifiers,
        });
        if let Some(text) = self.text {
            params["text"] = json!(text);
            params["unmodifiedText"] = json!(text);
        }
        params
    }

    fn up(&self) -> Value {
        json!({
            "type": "keyUp",
            "key": self.key,
            "code": self.code,
            "windowsVirtualKeyCode": self.key_code,
            "nativeVirtualKeyCode": self.key_code,
            "modifiers": self.modifiers,
        })
    }
}

/// Center of the content quad returned by `DOM.getBoxModel`.
pub fn box_center(box_model: &Value) -> Result<(f64, f64), BrowserError> {
    let quad: Vec<f64> = box_model
        .get("model")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)
        .ok_or_else(|| BrowserError::Protocol {
            detail: "DOM.getBoxModel did not return a content quad".to_string(),
        })?
        .iter()
        .filter_map(Value::as_f64)
        .collect();

    if quad.len() < 8 {
        return Err(BrowserError::Protocol {
            detail: format!("content quad has {} values, expected 8", quad.len()),
        });
    }

    let xs = quad.iter().step_by(2);
    let ys = quad.iter().skip(1).step_by(2);
    let (min_x, max_x) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
        (lo.min(x), hi.max(x))
    });
    let (min_y, max_y) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| {
        (lo.min(y), hi.max(y))
    });

    let (width, height) = (max_x - min_x, max_y - min_y);
    if width <= 0.0 || height <= 0.0 {
        return Err(BrowserError::ElementNotInteractable {
            reason: format!("element has zero or negative size: {width}x{height}"),
        });
    }

    Ok((min_x + width / 2.0, min_y + height / 2.0))
}

// ---------------------------------------------------------------------------
// CdpPage
// ---------------------------------------------------------------------------

/// A page target driven over one CDP connection.
#[derive(Clone)]
pub struct CdpPage {
    client: Arc<CdpClient>,
    next_group: Arc<AtomicU64>,
}

/// Remote object group owning the handles produced by one query.
struct ObjectGroup {
    client: Arc<CdpClient>,
    name: String,
}

impl Drop for ObjectGroup {
    fn drop(&mut self) {
        // Outside a runtime the connection is already gone with it.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let name = std::mem::take(&mut self.name);
        runtime.spawn(async move {
            let released = client
                .send_command("Runtime.releaseObjectGroup", json!({ "objectGroup": name }))
                .await;
            if let Err(e) = released {
                tracing::debug!(group = %name, error = %e, "failed to release object group");
            }
        });
    }
}

impl CdpPage {
    /// Connect to a page target and enable the domains element handles use.
    pub async fn connect(ws_url: &str) -> Result<Self, BrowserError> {
        let client = CdpClient::connect(ws_url).await?;
        client.enable_domain("Page").await?;
        client.enable_domain("DOM").await?;
        client.enable_domain("Runtime").await?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: CdpClient) -> Self {
        Self {
            client: Arc::new(client),
            next_group: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn client(&self) -> &CdpClient {
        &self.client
    }

    /// Start navigating to `url`. Use [`CdpPage::wait_for_load`] to wait.
    pub async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self
            .client
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::NavigationFailed {
                reason: error_text.to_string(),
            });
        }
        Ok(())
    }

    /// Wait until `document.readyState` is `complete`.
    pub async fn wait_for_load(&self, interval: Duration, timeout: Duration) -> Result<(), BrowserError> {
        let outcome = poll_until(interval, timeout, || self.load_complete()).await?;

        match outcome {
            PollOutcome::Found(()) => Ok(()),
            PollOutcome::TimedOut => Err(BrowserError::PageLoadTimeout { duration: timeout }),
        }
    }

    async fn load_complete(&self) -> Result<Option<()>, BrowserError> {
        let state = self.evaluate("document.readyState").await?;
        Ok((state.as_str() == Some("complete")).then_some(()))
    }

    /// Evaluate `expression` and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(message) = exception_message(&result) {
            return Err(BrowserError::JsException { message });
        }
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn query(&self, locator: &Locator) -> Result<Vec<CdpElement>, BrowserError> {
        let seq = self.next_group.fetch_add(1, Ordering::Relaxed);
        let group = Arc::new(ObjectGroup {
            client: Arc::clone(&self.client),
            name: format!("notepost-query-{seq}"),
        });

        // getProperties results inherit the array's group.
        let result = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": locator_expression(locator),
                    "returnByValue": false,
                    "objectGroup": group.name,
                }),
            )
            .await?;

        if let Some(message) = exception_message(&result) {
            return Err(BrowserError::JsException { message });
        }
        let Some(array_id) = result
            .get("result")
            .and_then(|r| r.get("objectId"))
            .and_then(Value::as_str)
        else {
            return Ok(Vec::new());
        };

        let props = self
            .client
            .send_command(
                "Runtime.getProperties",
                json!({ "objectId": array_id, "ownProperties": true }),
            )
            .await?;

        let mut indexed: Vec<(usize, String)> = props
            .get("result")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let index = entry.get("name")?.as_str()?.parse::<usize>().ok()?;
                        let object_id = entry.get("value")?.get("objectId")?.as_str()?;
                        Some((index, object_id.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed
            .into_iter()
            .map(|(_, object_id)| CdpElement {
                group: Arc::clone(&group),
                object_id,
            })
            .collect())
    }
}

#[async_trait]
impl Page for CdpPage {
    type Element = CdpElement;

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<CdpElement>, TransportError> {
        let found = self
            .query(locator)
            .await
            .map_err(|e| e.into_transport("find_elements"))?;
        tracing::trace!(locator = %locator, count = found.len(), "queried elements");
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// CdpElement
// ---------------------------------------------------------------------------

/// Remote handle to one DOM element.
#[derive(Clone)]
pub struct CdpElement {
    group: Arc<ObjectGroup>,
    object_id: String,
}

impl std::fmt::Debug for CdpElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpElement")
            .field("object_id", &self.object_id)
            .field("group", &self.group.name)
            .finish()
    }
}

impl CdpElement {
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Run `declaration` with this element as `this` and return its value.
    async fn call(&self, declaration: &str, args: &[Value]) -> Result<Value, TransportError> {
        const METHOD: &str = "Runtime.callFunctionOn";
        let arguments: Vec<Value> = args.iter().map(|v| json!({ "value": v })).collect();
        let result = self
            .group
            .client
            .send_command(
                METHOD,
                json!({
                    "functionDeclaration": declaration,
                    "objectId": self.object_id,
                    "arguments": arguments,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await
            .map_err(|e| e.into_transport(METHOD))?;

        if let Some(message) = exception_message(&result) {
            return Err(BrowserError::JsException { message }.into_transport(METHOD));
        }
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn command(&self, method: &'static str, params: Value) -> Result<Value, TransportError> {
        self.group
            .client
            .send_command(method, params)
            .await
            .map_err(|e| e.into_transport(method))
    }

    async fn stroke(&self, stroke: &KeyStroke) -> Result<(), TransportError> {
        self.command("Input.dispatchKeyEvent", stroke.down()).await?;
        self.command("Input.dispatchKeyEvent", stroke.up()).await?;
        Ok(())
    }

    async fn mouse(&self, kind: &str, x: f64, y: f64) -> Result<(), TransportError> {
        self.command(
            "Input.dispatchMouseEvent",
            json!({ "type": kind, "x": x, "y": y, "button": "left", "clickCount": 1 }),
        )
        .await?;
        Ok(())
    }
}

fn as_bool(value: &Value, operation: &str) -> Result<bool, TransportError> {
    value
        .as_bool()
        .ok_or_else(|| TransportError::new(operation, format!("expected a boolean, got {value}")))
}

#[async_trait]
impl Element for CdpElement {
    async fn focus(&self) -> Result<(), TransportError> {
        self.command("DOM.focus", json!({ "objectId": self.object_id }))
            .await?;
        Ok(())
    }

    async fn click(&self) -> Result<(), TransportError> {
        self.command(
            "DOM.scrollIntoViewIfNeeded",
            json!({ "objectId": self.object_id }),
        )
        .await?;
        let model = self
            .command("DOM.getBoxModel", json!({ "objectId": self.object_id }))
            .await?;
        let (x, y) = box_center(&model).map_err(|e| e.into_transport("DOM.getBoxModel"))?;
        self.mouse("mousePressed", x, y).await?;
        self.mouse("mouseReleased", x, y).await
    }

    async fn clear(&self) -> Result<(), TransportError> {
        self.call(CLEAR, &[]).await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), TransportError> {
        for ch in text.chars() {
            if ch == '\n' {
                self.stroke(&key_stroke(Key::Enter)).await?;
                continue;
            }
            let ch = ch.to_string();
            self.command(
                "Input.dispatchKeyEvent",
                json!({ "type": "keyDown", "text": ch, "unmodifiedText": ch, "key": ch }),
            )
            .await?;
            self.command(
                "Input.dispatchKeyEvent",
                json!({ "type": "keyUp", "key": ch }),
            )
            .await?;
        }
        Ok(())
    }

    async fn press(&self, key: Key) -> Result<(), TransportError> {
        self.stroke(&key_stroke(key)).await
    }

    async fn tag_name(&self) -> Result<String, TransportError> {
        Ok(self
            .call(TAG_NAME, &[])
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, TransportError> {
        Ok(self
            .call(GET_ATTRIBUTE, &[json!(name)])
            .await?
            .as_str()
            .map(str::to_string))
    }

    async fn text(&self) -> Result<String, TransportError> {
        Ok(self
            .call(scripts::READ_CONTENT.source, &[])
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn is_visible(&self) -> Result<bool, TransportError> {
        as_bool(&self.call(IS_VISIBLE, &[]).await?, "is_visible")
    }

    async fn is_enabled(&self) -> Result<bool, TransportError> {
        as_bool(&self.call(IS_ENABLED, &[]).await?, "is_enabled")
    }

    async fn count_matches(&self, locator: &Locator) -> Result<usize, TransportError> {
        let count = self
            .call(
                COUNT_MATCHES,
                &[json!(locator_kind(locator)), json!(locator.expression())],
            )
            .await?;
        Ok(count.as_u64().unwrap_or(0) as usize)
    }

    async fn execute(&self, script: &DomScript, args: &[Value]) -> Result<Value, TransportError> {
        tracing::trace!(script = script.name, "running in-page script");
        self.call(script.source, args).await
    }

    async fn set_files(&self, paths: &[PathBuf]) -> Result<(), TransportError> {
        let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        tracing::info!(count = files.len(), "attaching files");
        self.command(
            "DOM.setFileInputFiles",
            json!({ "files": files, "objectId": self.object_id }),
        )
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
