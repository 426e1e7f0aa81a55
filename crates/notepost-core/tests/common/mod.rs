//! Shared helpers for integration tests.
//!
//! [`FakePage`] is an in-memory stand-in for a browser page. Elements keep
//! their text in a shared state table; in-page scripts are dispatched on
//! their name instead of being evaluated. The suggestion popup opens
//! whenever the editor's trailing word starts with `#` and has not been
//! confirmed yet, subject to the page's [`PopupMode`].
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use notepost_core::dom::{DomScript, Element, Key, Page};
use notepost_core::{Locator, NoteConfig, TransportError};

pub type NodeId = usize;

/// When the fake popup shows up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupMode {
    Always,
    Never,
    /// Only for these tokens (without the leading `#`). `""` allows the
    /// bare trigger.
    ForTags(HashSet<String>),
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Field,
    Editor,
    FileInput,
    /// Popup container tied to an editor node.
    Popup { editor: NodeId, options: usize },
}

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub kind: NodeKind,
    pub tag: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    /// Whether a synthetic paste event changes the content.
    pub paste_effective: bool,
    /// Whether direct assignment scripts change the content.
    pub assign_effective: bool,
    pub files: Vec<PathBuf>,
    /// Confirming a suggestion replaces the whole text with the token.
    pub wipe_on_confirm: bool,
    /// Char length of editor text already confirmed through the popup.
    pub committed_upto: usize,
}

impl FakeNode {
    fn base(kind: NodeKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.into(),
            attrs: HashMap::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            paste_effective: true,
            assign_effective: true,
            files: Vec::new(),
            wipe_on_confirm: false,
            committed_upto: 0,
        }
    }

    pub fn field() -> Self {
        let mut node = Self::base(NodeKind::Field, "input");
        node.attrs.insert("type".into(), "text".into());
        node
    }

    pub fn editor() -> Self {
        let mut node = Self::base(NodeKind::Editor, "div");
        node.attrs.insert("contenteditable".into(), "true".into());
        node.attrs.insert("class".into(), "ql-editor".into());
        node
    }

    pub fn file_input() -> Self {
        let mut node = Self::base(NodeKind::FileInput, "input");
        node.attrs.insert("type".into(), "file".into());
        node.visible = false;
        node
    }

    pub fn popup(editor: NodeId, options: usize) -> Self {
        Self::base(NodeKind::Popup { editor, options }, "ul")
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn without_paste(mut self) -> Self {
        self.paste_effective = false;
        self
    }

    pub fn without_assign(mut self) -> Self {
        self.assign_effective = false;
        self
    }

    pub fn wiping_on_confirm(mut self) -> Self {
        self.wipe_on_confirm = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct PageState {
    pub nodes: Vec<FakeNode>,
    pub bindings: Vec<(Locator, NodeId)>,
    pub popup: Option<PopupMode>,
    /// Every script run, as (node, script name).
    pub scripts: Vec<(NodeId, &'static str)>,
    /// Every key press, as (node, key).
    pub keys: Vec<(NodeId, Key)>,
    /// Tokens confirmed through the popup, in order.
    pub accepted: Vec<String>,
    /// Fail every call touching this node.
    pub broken: HashSet<NodeId>,
}

impl PageState {
    fn trailing_token(&self, editor: NodeId) -> Option<String> {
        let node = &self.nodes[editor];
        let pending: String = node.text.chars().skip(node.committed_upto).collect();
        let token = pending
            .rsplit(|c: char| c == ' ' || c == '\n')
            .next()
            .unwrap_or("");
        token.starts_with('#').then(|| token.to_string())
    }

    fn popup_showing(&self, editor: NodeId) -> bool {
        let Some(token) = self.trailing_token(editor) else {
            return false;
        };
        match &self.popup {
            None | Some(PopupMode::Never) => false,
            Some(PopupMode::Always) => true,
            Some(PopupMode::ForTags(tags)) => tags.contains(token.trim_start_matches('#')),
        }
    }

    fn popup_for(&self, editor: NodeId) -> Option<NodeId> {
        self.nodes.iter().position(|n| match n.kind {
            NodeKind::Popup { editor: e, .. } => e == editor,
            _ => false,
        })
    }

    fn is_visible(&self, id: NodeId) -> bool {
        match self.nodes[id].kind {
            NodeKind::Popup { editor, .. } => self.popup_showing(editor),
            _ => self.nodes[id].visible,
        }
    }
}

/// In-memory page.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().expect("fake page state poisoned")
    }

    /// Add `node` and make it findable under `locator`.
    pub fn add(&self, locator: &Locator, node: FakeNode) -> NodeId {
        let mut state = self.state();
        state.nodes.push(node);
        let id = state.nodes.len() - 1;
        state.bindings.push((locator.clone(), id));
        id
    }

    /// Bind an existing node to another locator.
    pub fn bind(&self, locator: &Locator, id: NodeId) {
        self.state().bindings.push((locator.clone(), id));
    }

    pub fn set_popup(&self, mode: PopupMode) {
        self.state().popup = Some(mode);
    }

    pub fn element(&self, id: NodeId) -> FakeElement {
        FakeElement {
            id,
            state: self.state.clone(),
        }
    }

    pub fn text(&self, id: NodeId) -> String {
        self.state().nodes[id].text.clone()
    }

    pub fn scripts_on(&self, id: NodeId) -> Vec<&'static str> {
        self.state()
            .scripts
            .iter()
            .filter(|(n, _)| *n == id)
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn break_node(&self, id: NodeId) {
        self.state().broken.insert(id);
    }
}

#[async_trait]
impl Page for FakePage {
    type Element = FakeElement;

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<FakeElement>, TransportError> {
        let ids: Vec<NodeId> = self
            .state()
            .bindings
            .iter()
            .filter(|(l, _)| l == locator)
            .map(|(_, id)| *id)
            .collect();
        Ok(ids.into_iter().map(|id| self.element(id)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    id: NodeId,
    state: Arc<Mutex<PageState>>,
}

impl FakeElement {
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn with<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut PageState, NodeId) -> T,
    ) -> Result<T, TransportError> {
        let mut state = self.state.lock().expect("fake page state poisoned");
        if state.broken.contains(&self.id) {
            return Err(TransportError::new(operation, "target closed"));
        }
        Ok(f(&mut state, self.id))
    }
}

fn arg_str(args: &[Value], i: usize) -> String {
    args.get(i).and_then(Value::as_str).unwrap_or_default().to_string()
}

#[async_trait]
impl Element for FakeElement {
    async fn focus(&self) -> Result<(), TransportError> {
        self.with("focus", |_, _| ())
    }

    async fn click(&self) -> Result<(), TransportError> {
        self.with("click", |_, _| ())
    }

    async fn clear(&self) -> Result<(), TransportError> {
        self.with("clear", |state, id| {
            let node = &mut state.nodes[id];
            node.text.clear();
            node.committed_upto = 0;
        })
    }

    async fn type_text(&self, text: &str) -> Result<(), TransportError> {
        self.with("type_text", |state, id| state.nodes[id].text.push_str(text))
    }

    async fn press(&self, key: Key) -> Result<(), TransportError> {
        self.with("press", |state, id| {
            state.keys.push((id, key));
            match key {
                Key::Enter => {
                    if state.popup_showing(id) {
                        let token = state.trailing_token(id).unwrap_or_default();
                        state.accepted.push(token.clone());
                        let node = &mut state.nodes[id];
                        if node.wipe_on_confirm {
                            node.text = token;
                        }
                        node.committed_upto = node.text.chars().count();
                    } else {
                        state.nodes[id].text.push('\n');
                    }
                }
                Key::Backspace => {
                    let node = &mut state.nodes[id];
                    node.text.pop();
                    let len = node.text.chars().count();
                    node.committed_upto = node.committed_upto.min(len);
                }
                Key::Space => state.nodes[id].text.push(' '),
                Key::End | Key::DocumentEnd => {}
            }
        })
    }

    async fn tag_name(&self) -> Result<String, TransportError> {
        self.with("tag_name", |state, id| state.nodes[id].tag.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, TransportError> {
        self.with("attribute", |state, id| state.nodes[id].attrs.get(name).cloned())
    }

    async fn text(&self) -> Result<String, TransportError> {
        self.with("text", |state, id| state.nodes[id].text.clone())
    }

    async fn is_visible(&self) -> Result<bool, TransportError> {
        self.with("is_visible", |state, id| state.is_visible(id))
    }

    async fn is_enabled(&self) -> Result<bool, TransportError> {
        self.with("is_enabled", |state, id| state.nodes[id].enabled)
    }

    async fn count_matches(&self, _locator: &Locator) -> Result<usize, TransportError> {
        self.with("count_matches", |state, id| match state.nodes[id].kind {
            NodeKind::Popup { editor, options } if state.popup_showing(editor) => options,
            _ => 0,
        })
    }

    async fn execute(&self, script: &DomScript, args: &[Value]) -> Result<Value, TransportError> {
        let name = script.name;
        let text = arg_str(args, 0);
        let append = args.get(1).and_then(Value::as_bool).unwrap_or(false);

        self.with("execute", |state, id| {
            state.scripts.push((id, name));
            let node = &mut state.nodes[id];
            let before = node.text.clone();
            match name {
                "read_content" => json!(before),
                "paste_text" => {
                    if node.paste_effective {
                        node.text.push_str(&text);
                    }
                    json!({
                        "before": before,
                        "after": node.text,
                        "cancelled": !node.paste_effective,
                    })
                }
                "assign_plain_field" | "assign_rich_editor" | "assign_framework" => {
                    if node.assign_effective {
                        if append {
                            node.text.push_str(&text);
                        } else {
                            node.text = text.clone();
                        }
                    }
                    json!({ "before": before, "after": node.text })
                }
                other => json!({ "error": format!("unknown script {other}") }),
            }
        })
    }

    async fn set_files(&self, paths: &[PathBuf]) -> Result<(), TransportError> {
        self.with("set_files", |state, id| match state.nodes[id].kind {
            NodeKind::FileInput => {
                state.nodes[id].files = paths.to_vec();
                Ok(())
            }
            _ => Err(TransportError::new("set_files", "not a file input")),
        })?
    }
}

/// Handles into a page laid out like the real publish form.
pub struct Form {
    pub page: FakePage,
    pub file_input: NodeId,
    pub title: NodeId,
    pub editor: NodeId,
    pub popup: NodeId,
}

/// A publish form wired to the first locator of each configured list.
pub fn publish_form(config: &NoteConfig, editor: FakeNode) -> Form {
    let page = FakePage::new();
    let locators = &config.locators;
    let file_input = page.add(&locators.file_input[0], FakeNode::file_input());
    let title = page.add(&locators.title[0], FakeNode::field());
    let editor = page.add(&locators.body_editor[0], editor);
    let popup = page.add(&locators.popup[0], FakeNode::popup(editor, 5));
    page.set_popup(PopupMode::Always);
    Form {
        page,
        file_input,
        title,
        editor,
        popup,
    }
}

/// Config suited to fake pages: short popup timeout.
pub fn test_config() -> NoteConfig {
    let mut config = NoteConfig::default();
    config.topics.popup_timeout_secs = 2;
    config
}

pub fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

pub fn only_tags(list: &[&str]) -> PopupMode {
    PopupMode::ForTags(list.iter().map(|t| t.to_string()).collect())
}

pub const SHORT: Duration = Duration::from_secs(2);

/// Canned HTTP responses keyed by URL; unknown URLs fail at transport level.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: HashMap<String, notepost_core::HttpResponse>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, content_type: Option<&str>, body: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            notepost_core::HttpResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_vec(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("stub fetcher poisoned").clone()
    }
}

#[async_trait]
impl notepost_core::HttpFetcher for StubFetcher {
    async fn get(
        &self,
        url: &str,
        _timeout: Duration,
    ) -> Result<notepost_core::HttpResponse, TransportError> {
        self.requests
            .lock()
            .expect("stub fetcher poisoned")
            .push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::new("http_get", format!("connection refused: {url}")))
    }
}

/// A media directory with the given empty files in it.
pub fn media_dir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("should create temp media dir");
    for name in files {
        std::fs::write(dir.path().join(name), b"media").expect("should write media file");
    }
    dir
}

/// Media config rooted at `dir`, downloading into `dir/scratch`.
pub fn media_config(dir: &std::path::Path) -> notepost_types::MediaConfig {
    let mut config = NoteConfig::default().media;
    config.base_dir = Some(dir.to_path_buf());
    config.scratch_dir = dir.join("scratch");
    config
}
