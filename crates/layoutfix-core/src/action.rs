use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// What a hotkey does when it fires.
///
/// The string forms are the ones accepted in the configuration file:
///   "retype-selection"     == fix the current selection
///   "retype-current-line"  == select to line start, then fix
///   "retype-all"           == select everything, then fix
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Action {
    RetypeSelection,
    RetypeCurrentLine,
    RetypeAll,
}

/// Selection change issued before capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widening {
    /// Extend the selection to the start of the current line
    ToLineStart,
    /// Select the whole document
    All,
}

impl Action {
    /// Selection widening this action needs, if any
    pub fn widening(self) -> Option<Widening> {
        match self {
            Action::RetypeSelection => None,
            Action::RetypeCurrentLine => Some(Widening::ToLineStart),
            Action::RetypeAll => Some(Widening::All),
        }
    }
}
