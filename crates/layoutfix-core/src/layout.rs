// Layoutfix Layout Detection
// Layout identifiers and classification of the foreground layout

use std::fmt;

use crate::platform::LayoutService;

/// Keyboard layout identifier (a 16-bit language id such as 0x0409)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutId(u16);

impl LayoutId {
    /// Wrap a raw language id
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Largest primary language id (10 bits)
    pub const MAX_LANG: u16 = 0x03ff;

    /// Largest sublanguage id (6 bits)
    pub const MAX_SUBLANG: u16 = 0x3f;

    /// Combine a primary language and sublanguage (`(sublang << 10) | lang`).
    /// Out-of-range parts are truncated; use `try_from_parts` for input.
    pub const fn from_parts(lang: u16, sublang: u16) -> Self {
        Self(((sublang & Self::MAX_SUBLANG) << 10) | (lang & Self::MAX_LANG))
    }

    /// Like `from_parts`, but None when either part does not fit its field
    pub const fn try_from_parts(lang: u16, sublang: u16) -> Option<Self> {
        if lang > Self::MAX_LANG || sublang > Self::MAX_SUBLANG {
            return None;
        }
        Some(Self::from_parts(lang, sublang))
    }

    /// Raw language id
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Primary language part
    pub const fn lang(self) -> u16 {
        self.0 & Self::MAX_LANG
    }

    /// Sublanguage part
    pub const fn sublang(self) -> u16 {
        self.0 >> 10
    }

    /// Eight-digit layout name accepted by the OS ("00000409")
    pub fn klid(self) -> String {
        format!("{:08X}", self.0)
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Which half of the layout pair is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutRole {
    Primary,
    Secondary,
    Unsupported,
}

impl LayoutRole {
    /// The role to switch to after correcting text typed in this role
    pub fn opposite(self) -> Option<LayoutRole> {
        match self {
            LayoutRole::Primary => Some(LayoutRole::Secondary),
            LayoutRole::Secondary => Some(LayoutRole::Primary),
            LayoutRole::Unsupported => None,
        }
    }
}

impl fmt::Display for LayoutRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutRole::Primary => write!(f, "primary"),
            LayoutRole::Secondary => write!(f, "secondary"),
            LayoutRole::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A configured layout: identifier plus a name for log lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSpec {
    /// Human-readable name ("English", "Hebrew")
    pub name: String,
    /// OS layout identifier
    pub id: LayoutId,
}

impl LayoutSpec {
    /// Create a new LayoutSpec
    pub fn new(name: impl Into<String>, id: LayoutId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Classifies the foreground layout against the configured pair
#[derive(Debug, Clone)]
pub struct LayoutDetector {
    primary: LayoutSpec,
    secondary: LayoutSpec,
}

impl LayoutDetector {
    /// Create a detector for a primary/secondary pair
    pub fn new(primary: LayoutSpec, secondary: LayoutSpec) -> Self {
        Self { primary, secondary }
    }

    /// Classify a layout id (`None` means no foreground window)
    pub fn classify(&self, layout: Option<LayoutId>) -> LayoutRole {
        match layout {
            Some(id) if id == self.primary.id => LayoutRole::Primary,
            Some(id) if id == self.secondary.id => LayoutRole::Secondary,
            _ => LayoutRole::Unsupported,
        }
    }

    /// Query the foreground layout and classify it
    pub fn detect(&self, service: &dyn LayoutService) -> LayoutRole {
        let current = service.foreground_layout();
        let role = self.classify(current);
        log::debug!(
            "foreground layout {} classified as {}",
            current.map_or_else(|| "(none)".to_string(), |id| id.to_string()),
            role
        );
        role
    }

    /// Configured layout for a role
    pub fn spec(&self, role: LayoutRole) -> Option<&LayoutSpec> {
        match role {
            LayoutRole::Primary => Some(&self.primary),
            LayoutRole::Secondary => Some(&self.secondary),
            LayoutRole::Unsupported => None,
        }
    }

    /// Display name for a role
    pub fn name(&self, role: LayoutRole) -> &str {
        self.spec(role).map_or("unsupported", |spec| spec.name.as_str())
    }
}
