// Layoutfix Selection Capture
// Copy the current selection and wait (bounded) for it to reach the clipboard

use std::time::Duration;

use crate::hotkey::Modifiers;
use crate::platform::{ClipboardService, Clock, InputService, PlatformError};

/// Default interval between clipboard sequence polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Default upper bound on waiting for the copy to land
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Result of one capture attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// New clipboard text produced by the copy command
    Captured(String),
    /// The sequence counter never moved: nothing was selected
    Unchanged,
    /// The counter moved but the clipboard could not be read
    Unreadable(PlatformError),
    /// The counter moved but the clipboard holds no text
    Empty,
}

/// Bounded-wait clipboard capture protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCapture {
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl Default for SelectionCapture {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

impl SelectionCapture {
    /// Create a capture protocol with the given poll interval and timeout
    pub fn new(poll_interval: Duration, poll_timeout: Duration) -> Self {
        // A zero interval would spin without ever yielding.
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        Self {
            poll_interval,
            poll_timeout,
        }
    }

    /// Interval between sequence polls
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Maximum time to wait for the clipboard to change
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Release modifiers that may still be held from the hotkey chord
    pub fn release_modifiers(&self, input: &mut dyn InputService, modifiers: &Modifiers) {
        if let Err(e) = input.release_modifiers(modifiers) {
            log::warn!("Releasing modifiers failed: {}", e);
        }
    }

    /// Full capture: release modifiers, then copy and fetch
    pub fn capture(
        &self,
        modifiers: &Modifiers,
        clipboard: &mut dyn ClipboardService,
        input: &mut dyn InputService,
        clock: &dyn Clock,
    ) -> CaptureOutcome {
        self.release_modifiers(input, modifiers);
        self.copy_and_fetch(clipboard, input, clock)
    }

    /// Record the baseline, send the copy command, wait for the counter to
    /// move and read the new text
    pub fn copy_and_fetch(
        &self,
        clipboard: &mut dyn ClipboardService,
        input: &mut dyn InputService,
        clock: &dyn Clock,
    ) -> CaptureOutcome {
        let baseline = clipboard.sequence_number();

        if let Err(e) = input.send_copy() {
            // Keep waiting: the application may still have received the chord
            log::warn!("Sending copy command failed: {}", e);
        }

        let Some(sequence) = self.wait_for_change(clipboard, baseline, clock) else {
            log::debug!(
                "clipboard sequence stayed at {} for {:?}",
                baseline,
                self.poll_timeout
            );
            return CaptureOutcome::Unchanged;
        };
        log::debug!("clipboard sequence {} -> {}", baseline, sequence);

        match clipboard.read_text() {
            Ok(text) if text.is_empty() => CaptureOutcome::Empty,
            Ok(text) => CaptureOutcome::Captured(text),
            Err(e) => {
                log::debug!("clipboard read failed: {}", e);
                CaptureOutcome::Unreadable(e)
            }
        }
    }

    /// Poll until the sequence counter differs from `baseline`.
    ///
    /// The counter is sampled one final time at the deadline, so a change
    /// that lands just before expiry is still observed. Returns the new
    /// sequence number, or None on timeout.
    pub fn wait_for_change(
        &self,
        clipboard: &dyn ClipboardService,
        baseline: u32,
        clock: &dyn Clock,
    ) -> Option<u32> {
        let deadline = clock.now() + self.poll_timeout;
        loop {
            let current = clipboard.sequence_number();
            if current != baseline {
                return Some(current);
            }
            let now = clock.now();
            if now >= deadline {
                return None;
            }
            clock.sleep(self.poll_interval.min(deadline - now));
        }
    }
}
