// Layoutfix Config Parser - TOML with Serde
// Layout pair, keymap, timings and hotkey table

use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::capture::{SelectionCapture, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::dispatch::{ActionDispatcher, DEFAULT_SETTLE_DELAY};
use crate::hotkey::{parse_hotkey, parse_key, parse_modifier, HotkeyBinding, Modifiers};
use crate::keymap::{KeyMap, KeyMapError, LayoutPair};
use crate::layout::{LayoutDetector, LayoutId, LayoutSpec};
use crate::Action;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid keymap entry: {0}")]
    InvalidKeymapEntry(String),

    #[error("Invalid hotkey #{id}: {reason}")]
    InvalidHotkey { id: i32, reason: String },

    #[error("Duplicate hotkey id: {0}")]
    DuplicateHotkeyId(i32),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("Invalid layout [{section}]: {reason}")]
    InvalidLayout {
        section: &'static str,
        reason: String,
    },

    #[error(transparent)]
    KeyMap(#[from] KeyMapError),
}

/// Root TOML table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// Emit per-event diagnostic lines
    pub debug: Option<bool>,

    /// Switch to the opposite layout after retyping
    pub auto_flip: Option<bool>,

    /// Reject keymaps whose reverse lookup would be ambiguous
    pub strict_keymap: Option<bool>,

    pub primary: Option<LayoutToml>,
    pub secondary: Option<LayoutToml>,

    /// Primary character -> secondary character, replaces the built-in table
    pub keymap: Option<IndexMap<String, String>>,

    pub clipboard: Option<ClipboardToml>,
    pub selection: Option<SelectionToml>,

    /// Hotkey table, replaces the built-in bindings
    #[serde(rename = "hotkey")]
    pub hotkeys: Option<Vec<HotkeyToml>>,
}

/// `[primary]` / `[secondary]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutToml {
    pub name: Option<String>,
    /// Primary language id (e.g. 0x09 for English)
    pub lang: Option<u16>,
    /// Sub-language id (e.g. 0x01 for the default variant)
    pub sublang: Option<u16>,
}

/// `[clipboard]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipboardToml {
    pub poll_interval_ms: Option<u64>,
    pub poll_timeout_ms: Option<u64>,
}

/// `[selection]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionToml {
    pub settle_delay_ms: Option<u64>,
}

/// One `[[hotkey]]` entry
///
/// Either `keys = "Ctrl+Alt+M"` or `modifiers = ["ctrl", "alt"]` plus
/// `key = "M"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotkeyToml {
    pub id: i32,
    pub keys: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub key: Option<String>,
    pub action: String,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub debug: bool,
    pub auto_flip: bool,
    pub strict_keymap: bool,
    pub primary: LayoutSpec,
    pub secondary: LayoutSpec,
    pub keymap: KeyMap,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub settle_delay: Duration,
    pub hotkeys: Vec<HotkeyBinding>,
}

const PRIMARY_NAME: &str = "English";
const PRIMARY_LANG: u16 = 0x09;
const SECONDARY_NAME: &str = "Hebrew";
const SECONDARY_LANG: u16 = 0x0D;
const SUBLANG_DEFAULT: u16 = 0x01;

/// Standard Hebrew keyboard, keyed by the US-English key in the same position
const DEFAULT_KEYMAP: &[(char, char)] = &[
    ('q', '/'), ('w', '\''), ('e', 'ק'), ('r', 'ר'), ('t', 'א'),
    ('y', 'ט'), ('u', 'ו'), ('i', 'ן'), ('o', 'ם'), ('p', 'פ'),
    ('a', 'ש'), ('s', 'ד'), ('d', 'ג'), ('f', 'כ'), ('g', 'ע'),
    ('h', 'י'), ('j', 'ח'), ('k', 'ל'), ('l', 'ך'), (';', 'ף'), ('\'', ','),
    ('z', 'ז'), ('x', 'ס'), ('c', 'ב'), ('v', 'ה'), ('b', 'נ'),
    ('n', 'מ'), ('m', 'צ'), (',', 'ת'), ('.', 'ץ'), ('/', '.'),
];

const DEFAULT_CONFIG: &str = r#"# layoutfix configuration
#
# Every key is optional; omitted values fall back to the defaults below.

# Log every selection, conversion and layout flip
debug = false

# Switch the keyboard layout to the other language after retyping
auto_flip = true

# Refuse to start when two keys map to the same character
strict_keymap = false

[primary]
name = "English"
lang = 0x09
sublang = 0x01

[secondary]
name = "Hebrew"
lang = 0x0D
sublang = 0x01

# Primary character -> secondary character (single characters only).
# Characters not listed pass through unchanged.
[keymap]
q = "/"
w = "'"
e = "ק"
r = "ר"
t = "א"
y = "ט"
u = "ו"
i = "ן"
o = "ם"
p = "פ"
a = "ש"
s = "ד"
d = "ג"
f = "כ"
g = "ע"
h = "י"
j = "ח"
k = "ל"
l = "ך"
";" = "ף"
"'" = ","
z = "ז"
x = "ס"
c = "ב"
v = "ה"
b = "נ"
n = "מ"
m = "צ"
"," = "ת"
"." = "ץ"
"/" = "."

[clipboard]
# How often to check whether the copy reached the clipboard
poll_interval_ms = 5
# Give up (nothing selected) after this long
poll_timeout_ms = 200

[selection]
# Wait after widening the selection before copying
settle_delay_ms = 50

# action: retype-selection | retype-current-line | retype-all
[[hotkey]]
id = 1
keys = "Ctrl+M"
action = "retype-selection"

[[hotkey]]
id = 2
keys = "Ctrl+Alt+M"
action = "retype-current-line"

[[hotkey]]
id = 3
keys = "Ctrl+Alt+N"
action = "retype-all"
"#;

/// Commented configuration file holding every default
pub fn default_config_content() -> &'static str {
    DEFAULT_CONFIG
}

/// Built-in English -> Hebrew table
pub fn default_keymap() -> KeyMap {
    DEFAULT_KEYMAP.iter().copied().collect()
}

/// Built-in hotkeys: Ctrl+M, Ctrl+Alt+M and Ctrl+Alt+N
pub fn default_hotkeys() -> Vec<HotkeyBinding> {
    use crate::hotkey::Modifier::{Alt, Ctrl};
    vec![
        HotkeyBinding::new(1, [Ctrl].into_iter().collect(), 'M' as u32, Action::RetypeSelection),
        HotkeyBinding::new(
            2,
            [Ctrl, Alt].into_iter().collect(),
            'M' as u32,
            Action::RetypeCurrentLine,
        ),
        HotkeyBinding::new(3, [Ctrl, Alt].into_iter().collect(), 'N' as u32, Action::RetypeAll),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            auto_flip: true,
            strict_keymap: false,
            primary: LayoutSpec::new(
                PRIMARY_NAME,
                LayoutId::from_parts(PRIMARY_LANG, SUBLANG_DEFAULT),
            ),
            secondary: LayoutSpec::new(
                SECONDARY_NAME,
                LayoutId::from_parts(SECONDARY_LANG, SUBLANG_DEFAULT),
            ),
            keymap: default_keymap(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            hotkeys: default_hotkeys(),
        }
    }
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// Get the default config path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("layoutfix").join("config.toml"))
    }

    /// Load from default location (~/.config/layoutfix/config.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                log::debug!("loading config from {}", path.display());
                return Self::from_toml_path(path);
            }
        }
        log::debug!("no config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load an explicit path (which must exist) or fall back to the default location
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml_path(path),
            None => Self::load_default(),
        }
    }

    /// Forward/inverse table pair, honoring `strict_keymap`
    pub fn layout_pair(&self) -> Result<LayoutPair, ConfigError> {
        if self.strict_keymap {
            Ok(LayoutPair::strict(self.keymap.clone())?)
        } else {
            Ok(LayoutPair::new(self.keymap.clone()))
        }
    }

    pub fn detector(&self) -> LayoutDetector {
        LayoutDetector::new(self.primary.clone(), self.secondary.clone())
    }

    pub fn selection_capture(&self) -> SelectionCapture {
        SelectionCapture::new(self.poll_interval, self.poll_timeout)
    }

    pub fn dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(self.hotkeys.iter().cloned(), self.settle_delay)
    }
}

impl ConfigToml {
    /// Convert to a validated Config, filling gaps with defaults
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let defaults = Config::default();

        let keymap = match &self.keymap {
            Some(entries) => parse_keymap(entries)?,
            None => defaults.keymap,
        };
        let strict_keymap = self.strict_keymap.unwrap_or(defaults.strict_keymap);
        if strict_keymap {
            keymap.check_injective()?;
        }

        let clipboard = self.clipboard.clone().unwrap_or_default();
        let poll_interval = clipboard
            .poll_interval_ms
            .map_or(defaults.poll_interval, Duration::from_millis);
        let poll_timeout = clipboard
            .poll_timeout_ms
            .map_or(defaults.poll_timeout, Duration::from_millis);
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidTiming(
                "clipboard.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if poll_interval > poll_timeout {
            return Err(ConfigError::InvalidTiming(format!(
                "clipboard.poll_interval_ms ({}) exceeds poll_timeout_ms ({})",
                poll_interval.as_millis(),
                poll_timeout.as_millis()
            )));
        }

        let settle_delay = self
            .selection
            .as_ref()
            .and_then(|s| s.settle_delay_ms)
            .map_or(defaults.settle_delay, Duration::from_millis);

        let hotkeys = match &self.hotkeys {
            Some(entries) => parse_hotkeys(entries)?,
            None => defaults.hotkeys,
        };

        Ok(Config {
            debug: self.debug.unwrap_or(defaults.debug),
            auto_flip: self.auto_flip.unwrap_or(defaults.auto_flip),
            strict_keymap,
            primary: resolve_layout("primary", self.primary.as_ref(), defaults.primary)?,
            secondary: resolve_layout("secondary", self.secondary.as_ref(), defaults.secondary)?,
            keymap,
            poll_interval,
            poll_timeout,
            settle_delay,
            hotkeys,
        })
    }
}

fn resolve_layout(
    name: &'static str,
    section: Option<&LayoutToml>,
    default: LayoutSpec,
) -> Result<LayoutSpec, ConfigError> {
    let Some(section) = section else {
        return Ok(default);
    };
    let lang = section.lang.unwrap_or(default.id.lang());
    let sublang = section.sublang.unwrap_or(default.id.sublang());
    let Some(id) = LayoutId::try_from_parts(lang, sublang) else {
        return Err(ConfigError::InvalidLayout {
            section: name,
            reason: format!(
                "lang {:#x} / sublang {:#x} out of range (max {:#x} / {:#x})",
                lang,
                sublang,
                LayoutId::MAX_LANG,
                LayoutId::MAX_SUBLANG
            ),
        });
    };
    let layout_name = section.name.clone().unwrap_or(default.name);
    Ok(LayoutSpec::new(layout_name, id))
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}

fn parse_keymap(entries: &IndexMap<String, String>) -> Result<KeyMap, ConfigError> {
    let mut keymap = KeyMap::new();
    for (from, to) in entries {
        let (Some(from_ch), Some(to_ch)) = (single_char(from), single_char(to)) else {
            return Err(ConfigError::InvalidKeymapEntry(format!(
                "{:?} = {:?} (both sides must be a single character)",
                from, to
            )));
        };
        // Lookups fold case first, so uppercase entries can never match
        if from_ch.is_uppercase() {
            log::warn!("keymap key {:?} is uppercase and will never match", from_ch);
        }
        if to_ch.is_uppercase() {
            log::warn!(
                "keymap value {:?} (for {:?}) is uppercase; the reverse lookup will never match it",
                to_ch,
                from_ch
            );
        }
        keymap.insert(from_ch, to_ch);
    }
    Ok(keymap)
}

fn parse_hotkeys(entries: &[HotkeyToml]) -> Result<Vec<HotkeyBinding>, ConfigError> {
    let mut bindings: Vec<HotkeyBinding> = Vec::with_capacity(entries.len());
    for entry in entries {
        if bindings.iter().any(|b| b.id == entry.id) {
            return Err(ConfigError::DuplicateHotkeyId(entry.id));
        }
        bindings.push(entry.to_binding()?);
    }
    Ok(bindings)
}

impl HotkeyToml {
    /// Convert one entry into a binding
    pub fn to_binding(&self) -> Result<HotkeyBinding, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidHotkey {
            id: self.id,
            reason,
        };

        let action = Action::from_str(&self.action)
            .map_err(|_| invalid(format!("unknown action '{}'", self.action)))?;

        let (modifiers, vk) = match (&self.keys, &self.key) {
            (Some(_), Some(_)) => {
                return Err(invalid("use either 'keys' or 'key', not both".to_string()))
            }
            (Some(keys), None) => {
                let (mut modifiers, vk) = parse_hotkey(keys).map_err(|e| invalid(e.to_string()))?;
                for name in &self.modifiers {
                    modifiers.insert(parse_modifier(name).map_err(|e| invalid(e.to_string()))?);
                }
                (modifiers, vk)
            }
            (None, Some(key)) => {
                let vk = parse_key(key).map_err(|e| invalid(e.to_string()))?;
                let modifiers = self
                    .modifiers
                    .iter()
                    .map(|name| parse_modifier(name))
                    .collect::<Result<Modifiers, _>>()
                    .map_err(|e| invalid(e.to_string()))?;
                (modifiers, vk)
            }
            (None, None) => return Err(invalid("missing 'keys' or 'key'".to_string())),
        };

        Ok(HotkeyBinding::new(self.id, modifiers, vk, action))
    }
}
