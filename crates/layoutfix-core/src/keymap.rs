// Layoutfix KeyMap Engine
// Character substitution tables for one layout pair and their inverse

use indexmap::IndexMap;
use std::fmt;

use crate::layout::LayoutRole;

/// Errors raised while building a layout pair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyMapError {
    #[error("keymap is not one-to-one: {0}")]
    NotInjective(String),
}

/// One secondary character claimed by more than one primary character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// The secondary character both entries map to
    pub secondary: char,
    /// The primary characters mapping to it, in insertion order
    pub primaries: Vec<char>,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primaries: Vec<String> = self.primaries.iter().map(|c| format!("'{}'", c)).collect();
        write!(f, "{} -> '{}'", primaries.join(", "), self.secondary)
    }
}

/// Ordered character substitution table (one direction)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMap {
    entries: IndexMap<char, char>,
}

impl KeyMap {
    /// Create an empty KeyMap
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping, replacing any previous target for `from`
    pub fn insert(&mut self, from: char, to: char) -> Option<char> {
        self.entries.insert(from, to)
    }

    /// Get the substitution for a character
    pub fn get(&self, ch: char) -> Option<char> {
        self.entries.get(&ch).copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// Derive the reverse table.
    ///
    /// Entries are inverted in insertion order, so when two characters map to
    /// the same target the one inserted last wins.
    pub fn build_inverse(&self) -> KeyMap {
        let mut inverse = KeyMap::new();
        for (from, to) in self.iter() {
            inverse.insert(to, from);
        }
        inverse
    }

    /// List every target character claimed by more than one source character
    pub fn collisions(&self) -> Vec<Collision> {
        let mut by_target: IndexMap<char, Vec<char>> = IndexMap::new();
        for (from, to) in self.iter() {
            by_target.entry(to).or_default().push(from);
        }
        by_target
            .into_iter()
            .filter(|(_, sources)| sources.len() > 1)
            .map(|(secondary, primaries)| Collision {
                secondary,
                primaries,
            })
            .collect()
    }

    /// Fail when two entries share a target, listing every collision
    pub fn check_injective(&self) -> Result<(), KeyMapError> {
        let collisions = self.collisions();
        if collisions.is_empty() {
            return Ok(());
        }
        let detail: Vec<String> = collisions.iter().map(|c| c.to_string()).collect();
        Err(KeyMapError::NotInjective(detail.join("; ")))
    }

    /// Substitute every mapped character of `text`.
    ///
    /// Alphabetic characters are lowercased before lookup; unmapped
    /// characters pass through unchanged. The result always has as many
    /// characters as the input.
    pub fn apply(&self, text: &str) -> String {
        text.chars()
            .map(|ch| {
                let folded = fold_case(ch);
                self.get(folded).unwrap_or(folded)
            })
            .collect()
    }
}

impl FromIterator<(char, char)> for KeyMap {
    fn from_iter<I: IntoIterator<Item = (char, char)>>(iter: I) -> Self {
        let mut map = KeyMap::new();
        for (from, to) in iter {
            map.insert(from, to);
        }
        map
    }
}

/// Lowercase a character when that keeps it a single character
fn fold_case(ch: char) -> char {
    if !ch.is_alphabetic() {
        return ch;
    }
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}

/// Forward and inverse tables for a primary/secondary layout pair
#[derive(Debug, Clone)]
pub struct LayoutPair {
    forward: KeyMap,
    inverse: KeyMap,
}

impl LayoutPair {
    /// Build the pair, keeping the last entry on inverse collisions
    pub fn new(forward: KeyMap) -> Self {
        let collisions = forward.collisions();
        for collision in &collisions {
            log::warn!(
                "keymap collision, reverse lookup keeps the last entry: {}",
                collision
            );
        }
        let inverse = forward.build_inverse();
        Self { forward, inverse }
    }

    /// Build the pair, rejecting maps that cannot be inverted losslessly
    pub fn strict(forward: KeyMap) -> Result<Self, KeyMapError> {
        forward.check_injective()?;
        let inverse = forward.build_inverse();
        Ok(Self { forward, inverse })
    }

    /// Secondary to primary table
    pub fn inverse(&self) -> &KeyMap {
        &self.inverse
    }

    /// Table to use for text typed while `role` was active
    pub fn table_for(&self, role: LayoutRole) -> Option<&KeyMap> {
        match role {
            LayoutRole::Primary => Some(&self.forward),
            LayoutRole::Secondary => Some(&self.inverse),
            LayoutRole::Unsupported => None,
        }
    }

    /// Transform text typed while `role` was active
    pub fn transform(&self, text: &str, role: LayoutRole) -> Option<String> {
        self.table_for(role).map(|table| table.apply(text))
    }
}
