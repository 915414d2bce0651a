// Layoutfix Hotkeys
// Hotkey bindings, combo string parsing and registration with the OS

use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use crate::platform::{HotkeyService, PlatformError};
use crate::Action;

/// A modifier key that can be part of a hotkey chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Modifier {
    #[strum(to_string = "Ctrl", serialize = "control")]
    Ctrl,
    #[strum(to_string = "Alt", serialize = "option")]
    Alt,
    #[strum(to_string = "Shift")]
    Shift,
    #[strum(to_string = "Win", serialize = "super", serialize = "meta")]
    Win,
}

/// Modifier set of a hotkey, kept sorted and free of duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(SmallVec<[Modifier; 4]>);

impl Modifiers {
    /// Create an empty modifier set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a modifier (ignored if already present)
    pub fn insert(&mut self, modifier: Modifier) {
        if let Err(pos) = self.0.binary_search(&modifier) {
            self.0.insert(pos, modifier);
        }
    }

    /// Check if a modifier is part of the set
    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0.binary_search(&modifier).is_ok()
    }

    /// True when no modifiers are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in canonical order (Ctrl, Alt, Shift, Win)
    pub fn iter(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        let mut set = Modifiers::new();
        for modifier in iter {
            set.insert(modifier);
        }
        set
    }
}

/// Errors that can occur while parsing a hotkey description
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyParseError {
    #[error("hotkey string cannot be empty")]
    EmptyInput,

    #[error("unknown key name: '{0}'")]
    UnknownKey(String),

    #[error("unknown modifier: '{0}'")]
    UnknownModifier(String),

    #[error("hotkey string cannot end with a separator")]
    TrailingSeparator,
}

/// Static declaration of one trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    /// Identifier delivered back by the OS when the hotkey fires
    pub id: i32,
    /// Modifier chord
    pub modifiers: Modifiers,
    /// Windows virtual key code of the main key
    pub vk: u32,
    /// What to do when it fires
    pub action: Action,
}

impl HotkeyBinding {
    /// Create a new binding
    pub fn new(id: i32, modifiers: Modifiers, vk: u32, action: Action) -> Self {
        Self {
            id,
            modifiers,
            vk,
            action,
        }
    }

    /// Create a binding from a combo string such as "Ctrl+Alt+M"
    pub fn parse(id: i32, combo: &str, action: Action) -> Result<Self, HotkeyParseError> {
        let (modifiers, vk) = parse_hotkey(combo)?;
        Ok(Self::new(id, modifiers, vk, action))
    }

    /// Human-readable chord, e.g. "Ctrl+Alt+M"
    pub fn display_name(&self) -> String {
        let mut name = String::new();
        for modifier in self.modifiers.iter() {
            name.push_str(&modifier.to_string());
            name.push('+');
        }
        name.push_str(&key_name(self.vk));
        name
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.id, self.display_name(), self.action)
    }
}

/// Parse a combo string like "Ctrl+Alt+M" (or "Ctrl-Alt-M") into a
/// modifier set and a virtual key code
///
/// The last component is the key, everything before it is a modifier.
pub fn parse_hotkey(exp: &str) -> Result<(Modifiers, u32), HotkeyParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Err(HotkeyParseError::EmptyInput);
    }

    // Separators are never keys, so "+", "-" and "Ctrl++" all lack one
    if trimmed.ends_with('+') || trimmed.ends_with('-') {
        return Err(HotkeyParseError::TrailingSeparator);
    }

    let parts: Vec<&str> = trimmed.split(['+', '-']).map(str::trim).collect();
    let (key_str, modifier_strs) = match parts.split_last() {
        Some(split) => split,
        None => return Err(HotkeyParseError::EmptyInput),
    };

    let vk = parse_key(key_str)?;
    let mut modifiers = Modifiers::new();
    for modifier_str in modifier_strs {
        modifiers.insert(parse_modifier(modifier_str)?);
    }

    Ok((modifiers, vk))
}

/// Parse a single modifier name
pub fn parse_modifier(name: &str) -> Result<Modifier, HotkeyParseError> {
    Modifier::from_str(name.trim())
        .map_err(|_| HotkeyParseError::UnknownModifier(name.trim().to_string()))
}

/// Parse a key name into a virtual key code.
///
/// Supports A-Z, 0-9, F1-F24, a few named keys, and raw numeric codes
/// written as decimal ("77") or hex ("0x4D").
pub fn parse_key(name: &str) -> Result<u32, HotkeyParseError> {
    let trimmed = name.trim();
    let unknown = || HotkeyParseError::UnknownKey(trimmed.to_string());
    if trimmed.is_empty() {
        return Err(HotkeyParseError::EmptyInput);
    }

    let upper = trimmed.to_uppercase();
    match upper.as_str() {
        "SPACE" => return Ok(0x20),
        "TAB" => return Ok(0x09),
        "ENTER" | "RETURN" => return Ok(0x0D),
        "ESC" | "ESCAPE" => return Ok(0x1B),
        "INSERT" | "INS" => return Ok(0x2D),
        "PAUSE" => return Ok(0x13),
        _ => {}
    }

    let mut chars = upper.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return if ch.is_ascii_alphanumeric() {
            Ok(ch as u32)
        } else {
            Err(unknown())
        };
    }

    if let Some(number) = upper.strip_prefix('F') {
        if let Ok(n) = number.parse::<u32>() {
            return if (1..=24).contains(&n) {
                // VK_F1 = 0x70
                Ok(0x70 + n - 1)
            } else {
                Err(unknown())
            };
        }
    }

    if let Some(hex) = upper.strip_prefix("0X") {
        return u32::from_str_radix(hex, 16).map_err(|_| unknown());
    }

    upper.parse::<u32>().map_err(|_| unknown())
}

/// Name of a virtual key code, as accepted by `parse_key`
pub fn key_name(vk: u32) -> String {
    match vk {
        0x20 => "Space".to_string(),
        0x09 => "Tab".to_string(),
        0x0D => "Enter".to_string(),
        0x1B => "Esc".to_string(),
        0x2D => "Insert".to_string(),
        0x13 => "Pause".to_string(),
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(vk).map_or_else(|| vk.to_string(), String::from),
        0x70..=0x87 => format!("F{}", vk - 0x70 + 1),
        _ => format!("0x{:02X}", vk),
    }
}

/// Error raised when a hotkey cannot be registered
#[derive(Debug, thiserror::Error)]
#[error("failed to register hotkey {hotkey}: {source}")]
pub struct RegistrationError {
    /// Display name of the failing chord
    pub hotkey: String,
    /// Id of the failing binding
    pub id: i32,
    #[source]
    pub source: PlatformError,
}

/// Register every binding in order.
///
/// On the first failure every binding registered so far is unregistered
/// again, so either all hotkeys are live or none are.
pub fn register_all(
    bindings: &[HotkeyBinding],
    service: &mut dyn HotkeyService,
) -> Result<Vec<i32>, RegistrationError> {
    let mut registered = Vec::with_capacity(bindings.len());
    for binding in bindings {
        if let Err(source) = service.register(binding) {
            log::error!("Failed to register hotkey {}: {}", binding.display_name(), source);
            unregister_all(&registered, service);
            return Err(RegistrationError {
                hotkey: binding.display_name(),
                id: binding.id,
                source,
            });
        }
        log::info!("Hotkey registered {} -> {}", binding.display_name(), binding.action);
        registered.push(binding.id);
    }
    Ok(registered)
}

/// Unregister previously registered hotkeys (in reverse order)
pub fn unregister_all(ids: &[i32], service: &mut dyn HotkeyService) {
    for id in ids.iter().rev() {
        service.unregister(*id);
        log::debug!("Hotkey #{} unregistered", id);
    }
}
