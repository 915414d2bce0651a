// Layoutfix Core Library
// Retype text typed in the wrong keyboard layout

pub mod action;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod hotkey;
pub mod keymap;
pub mod layout;
pub mod orchestrator;
pub mod platform;

#[cfg(test)]
mod test_log;

pub use action::{Action, Widening};
pub use capture::{CaptureOutcome, SelectionCapture};
pub use config::{Config, ConfigError};
pub use dispatch::ActionDispatcher;
pub use hotkey::{
    parse_hotkey, register_all, unregister_all, HotkeyBinding, HotkeyParseError, Modifier,
    Modifiers, RegistrationError,
};
pub use keymap::{Collision, KeyMap, KeyMapError, LayoutPair};
pub use layout::{LayoutDetector, LayoutId, LayoutRole, LayoutSpec};
pub use orchestrator::{EventOutcome, Transliterator};
pub use platform::{
    ClipboardService, Clock, HotkeyService, InputService, LayoutService, PlatformError, Services,
    SystemClock,
};
