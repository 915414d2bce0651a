// Platform Service Traits
//
// This module defines the narrow OS capabilities the orchestrator needs:
// clipboard sampling, synthetic input, keyboard layouts, hotkeys and time.
// Every call is best-effort; none of them is ever retried.

use std::time::{Duration, Instant};

use crate::hotkey::{HotkeyBinding, Modifiers};
use crate::layout::LayoutId;

/// Error type for platform operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The clipboard could not be opened or read
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),

    /// Synthetic input was not (fully) delivered
    #[error("Input injection failed: {0}")]
    Input(String),

    /// Hotkey registration was refused
    #[error("Hotkey rejected: {0}")]
    Hotkey(String),

    /// No backend exists for this operating system
    #[error("Not supported on this platform")]
    Unsupported,
}

/// Shared system clipboard
pub trait ClipboardService {
    /// Current clipboard sequence counter.
    ///
    /// The OS bumps this every time the clipboard content changes.
    fn sequence_number(&self) -> u32;

    /// Read the clipboard's text payload
    fn read_text(&mut self) -> Result<String, PlatformError>;
}

/// Synthetic keyboard input aimed at the foreground application
pub trait InputService {
    /// Send key-up events for the given modifiers
    fn release_modifiers(&mut self, modifiers: &Modifiers) -> Result<(), PlatformError>;

    /// Send the copy chord (Ctrl+C)
    fn send_copy(&mut self) -> Result<(), PlatformError>;

    /// Extend the selection to the start of the current line (Shift+Home)
    fn select_line(&mut self) -> Result<(), PlatformError>;

    /// Select everything (Ctrl+A)
    fn select_all(&mut self) -> Result<(), PlatformError>;

    /// Type text as unicode key events
    fn type_text(&mut self, text: &str) -> Result<(), PlatformError>;
}

/// Keyboard layout queries and switching
pub trait LayoutService {
    /// Layout of the foreground window's input thread.
    ///
    /// Returns None when there is no foreground window.
    fn foreground_layout(&self) -> Option<LayoutId>;

    /// Ask the system to switch to `layout`; returns true on success
    fn request_switch(&mut self, layout: LayoutId) -> bool;
}

/// Global hotkey registration
pub trait HotkeyService {
    /// Register a binding with the OS
    fn register(&mut self, binding: &HotkeyBinding) -> Result<(), PlatformError>;

    /// Release a previously registered binding
    fn unregister(&mut self, id: i32);
}

/// Time source used for polling and settle delays
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bundle of the services one hotkey event needs
pub struct Services<'a> {
    pub clipboard: &'a mut dyn ClipboardService,
    pub input: &'a mut dyn InputService,
    pub layout: &'a mut dyn LayoutService,
    pub clock: &'a dyn Clock,
}
