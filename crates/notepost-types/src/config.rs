//! Configuration types for note composition.
//!
//! [`NoteConfig`] is the top-level configuration loaded from `notepost.toml`.
//! It carries the per-component toggles that control injection, the tag
//! protocol, media resolution, settle delays, and every DOM locator the
//! pipeline uses. Locators live here and nowhere else, so a change in the
//! target page's markup is a config edit rather than a code change.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::NoteError;

/// Default configuration file name.
pub const CONFIG_FILENAME: &str = "notepost.toml";

/// Environment variable consulted for the media base directory when the
/// config does not set one.
pub const WORKING_DIR_ENV: &str = "NOTEPOST_WORKING_DIR";

/// Strategy for locating DOM elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    /// The raw selector or path expression.
    pub fn expression(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Controls how text reaches editable elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Route text containing wide characters through clipboard paste.
    ///
    /// When disabled, only an explicit `force_special_path` request leaves
    /// the native keystroke path.
    pub special_path_enabled: bool,
    /// Include injected text in debug logs (otherwise only its length).
    pub log_text: bool,
    /// Class-name fragments identifying rich-text editors.
    pub rich_editor_markers: Vec<String>,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            special_path_enabled: true,
            log_text: false,
            rich_editor_markers: vec!["ql-editor".into(), "editor".into()],
        }
    }
}

/// Tag-entry protocol settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Upper bound on tags committed in one run.
    pub max_tags: usize,
    /// How long to wait for the suggestion popup after each trigger.
    pub popup_timeout_secs: u64,
    /// Interval between popup probes.
    pub poll_interval_ms: u64,
    /// Fill remaining slots by accepting the first bare-trigger suggestion.
    pub auto_fill: bool,
    /// Marker typed to open the suggestion popup.
    pub trigger: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            max_tags: 10,
            popup_timeout_secs: 10,
            poll_interval_ms: 200,
            auto_fill: false,
            trigger: "#".into(),
        }
    }
}

impl TopicConfig {
    pub fn popup_timeout(&self) -> Duration {
        Duration::from_secs(self.popup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Media resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Where remote media is downloaded to.
    pub scratch_dir: PathBuf,
    /// Base directory for relative paths. See [`MediaConfig::effective_base_dir`].
    pub base_dir: Option<PathBuf>,
    pub download_timeout_secs: u64,
    /// Scratch files older than this are reclaimed by the janitor.
    pub janitor_max_age_hours: u64,
    pub max_images: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("notepost-media"),
            base_dir: None,
            download_timeout_secs: 30,
            janitor_max_age_hours: 24,
            max_images: 9,
        }
    }
}

impl MediaConfig {
    /// Base directory for relative media paths.
    ///
    /// Precedence: explicit `base_dir`, then `NOTEPOST_WORKING_DIR`, then the
    /// process working directory.
    pub fn effective_base_dir(&self) -> PathBuf {
        if let Some(dir) = &self.base_dir {
            return dir.clone();
        }
        if let Some(dir) = std::env::var_os(WORKING_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn janitor_max_age(&self) -> Duration {
        Duration::from_secs(self.janitor_max_age_hours.saturating_mul(3600))
    }
}

/// Settle delays after DOM mutations, in milliseconds.
///
/// Each field except `form_ready_timeout` is one named wait point. Zero
/// disables the wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub after_focus: u64,
    pub after_keystrokes: u64,
    pub after_caret_move: u64,
    pub after_line_break: u64,
    pub after_confirm: u64,
    pub after_rollback: u64,
    pub after_separator: u64,
    pub popup_settle: u64,
    /// Upper bound on waiting for the title field after media is attached.
    pub form_ready_timeout: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            after_focus: 300,
            after_keystrokes: 500,
            after_caret_move: 300,
            after_line_break: 500,
            after_confirm: 500,
            after_rollback: 300,
            after_separator: 300,
            popup_settle: 500,
            form_ready_timeout: 15_000,
        }
    }
}

impl TimingConfig {
    pub fn form_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.form_ready_timeout)
    }

    /// All settle delays disabled.
    pub fn none() -> Self {
        Self {
            after_focus: 0,
            after_keystrokes: 0,
            after_caret_move: 0,
            after_line_break: 0,
            after_confirm: 0,
            after_rollback: 0,
            after_separator: 0,
            popup_settle: 0,
            form_ready_timeout: 0,
        }
    }
}

/// Ordered locator lists. Earlier entries win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub title: Vec<Locator>,
    pub body_editor: Vec<Locator>,
    /// Suggestion popup containers, in priority order.
    pub popup: Vec<Locator>,
    /// Selectable children inside a popup container.
    pub popup_option: Vec<Locator>,
    pub file_input: Vec<Locator>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            title: vec![
                Locator::css(".d-text"),
                Locator::css("input[placeholder*='标题']"),
                Locator::css(".title-wrap input"),
                Locator::css("input[type='text']"),
            ],
            body_editor: vec![
                Locator::css("div[contenteditable='true']"),
                Locator::css(".ql-editor"),
                Locator::css("[contenteditable='true']"),
                Locator::css("div.content-editor"),
            ],
            popup: vec![
                // structural: floating containers holding a list
                Locator::xpath(
                    "//div[contains(@style, 'position') and contains(@style, 'absolute')]//ul",
                ),
                Locator::xpath(
                    "//div[contains(@style, 'position') and contains(@style, 'fixed')]//ul",
                ),
                // semantic
                Locator::xpath("//*[@role='listbox']"),
                Locator::xpath("//*[@role='menu']"),
                // class and attribute heuristics
                Locator::xpath("//div[contains(@class, 'mention')]"),
                Locator::xpath("//div[contains(@class, 'dropdown')]"),
                Locator::xpath("//div[contains(@class, 'suggest')]"),
                Locator::xpath("//div[contains(@class, 'popover')]"),
                Locator::xpath("//ul[contains(@class, 'mention')]"),
                Locator::xpath("//div[@data-mentionable]"),
                Locator::css(".mention-dropdown"),
                Locator::css(".topic-suggestions"),
            ],
            popup_option: vec![
                Locator::css("li, [role='option'], .item, .suggestion"),
                Locator::xpath(".//li | .//*[@role='option']"),
            ],
            file_input: vec![Locator::css("input[type='file']")],
        }
    }
}

/// Top-level configuration, loaded from `notepost.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteConfig {
    pub injection: InjectionConfig,
    pub topics: TopicConfig,
    pub media: MediaConfig,
    pub timing: TimingConfig,
    pub locators: LocatorConfig,
}

impl NoteConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, NoteError> {
        let config: NoteConfig =
            toml::from_str(content).map_err(|e| NoteError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, NoteError> {
        toml::to_string_pretty(self).map_err(|e| NoteError::Config(e.to_string()))
    }

    /// Load from a file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &std::path::Path) -> Result<Self, NoteError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<(), NoteError> {
        if self.topics.trigger.is_empty() {
            return Err(NoteError::Config("topics.trigger must not be empty".into()));
        }
        if self.topics.poll_interval_ms == 0 {
            return Err(NoteError::Config(
                "topics.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.locators.body_editor.is_empty() {
            return Err(NoteError::Config(
                "locators.body_editor needs at least one locator".into(),
            ));
        }
        if self.locators.popup.is_empty() || self.locators.popup_option.is_empty() {
            return Err(NoteError::Config(
                "locators.popup and locators.popup_option must not be empty".into(),
            ));
        }
        Ok(())
    }
}
