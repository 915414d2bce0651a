//! Platform services module
//!
//! Capability traits for every OS primitive the orchestrator touches, plus
//! the Win32 implementation used on Windows.

mod provider;

#[cfg(windows)]
mod win32;

pub use provider::{
    Clock, ClipboardService, HotkeyService, InputService, LayoutService, PlatformError, Services,
    SystemClock,
};

#[cfg(windows)]
pub use win32::{
    show_fatal_error, MessageLoop, QuitHandle, Win32Clipboard, Win32Hotkeys, Win32Input, Win32Layouts,
};
