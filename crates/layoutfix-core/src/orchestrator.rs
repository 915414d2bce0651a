// Layoutfix Transliteration Orchestrator
// Per-event pipeline: capture, detect, transform, retype and optional flip

use crate::capture::{CaptureOutcome, SelectionCapture};
use crate::config::{Config, ConfigError};
use crate::dispatch::ActionDispatcher;
use crate::keymap::LayoutPair;
use crate::layout::{LayoutDetector, LayoutRole};
use crate::platform::{LayoutService, Services};

/// Branch taken by one hotkey event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The hotkey id is not bound to any action
    Ignored,
    /// Capture produced no text
    NothingSelected,
    /// The foreground layout is neither half of the pair
    UnsupportedLayout,
    /// The transformed text was retyped
    Retyped {
        /// Text that was typed back
        text: String,
        /// Layout the selection was typed in
        from: LayoutRole,
        /// Result of the layout switch request, None when auto-flip is off
        flip: Option<bool>,
    },
}

/// Ties the keymap, detector, capture protocol and dispatcher together
#[derive(Debug, Clone)]
pub struct Transliterator {
    pair: LayoutPair,
    detector: LayoutDetector,
    capture: SelectionCapture,
    dispatcher: ActionDispatcher,
    auto_flip: bool,
    diagnostics: bool,
}

impl Transliterator {
    /// Create an orchestrator with auto-flip on and diagnostics off
    pub fn new(
        pair: LayoutPair,
        detector: LayoutDetector,
        capture: SelectionCapture,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            pair,
            detector,
            capture,
            dispatcher,
            auto_flip: true,
            diagnostics: false,
        }
    }

    /// Build the whole pipeline from a loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.layout_pair()?,
            config.detector(),
            config.selection_capture(),
            config.dispatcher(),
        )
        .with_auto_flip(config.auto_flip)
        .with_diagnostics(config.debug))
    }

    /// Switch to the opposite layout after each retype
    pub fn with_auto_flip(mut self, auto_flip: bool) -> Self {
        self.auto_flip = auto_flip;
        self
    }

    /// Emit per-event info lines
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn pair(&self) -> &LayoutPair {
        &self.pair
    }

    pub fn detector(&self) -> &LayoutDetector {
        &self.detector
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn auto_flip(&self) -> bool {
        self.auto_flip
    }

    /// Handle one fired hotkey.
    ///
    /// Unknown ids return immediately without touching any service.
    pub fn handle_hotkey(&mut self, id: i32, services: &mut Services<'_>) -> EventOutcome {
        let Some(binding) = self.dispatcher.binding(id) else {
            log::debug!("ignoring unbound hotkey id {}", id);
            return EventOutcome::Ignored;
        };
        log::debug!("hotkey {} fired", binding);

        self.capture
            .release_modifiers(services.input, &binding.modifiers);
        self.dispatcher
            .widen(binding.action, services.input, services.clock);

        let text = match self
            .capture
            .copy_and_fetch(services.clipboard, services.input, services.clock)
        {
            CaptureOutcome::Captured(text) => text,
            other => {
                log::debug!("capture gave {:?}", other);
                self.diag(format_args!("nothing selected"));
                return EventOutcome::NothingSelected;
            }
        };
        self.diag(format_args!("selected: {}", text));

        let from = self.detector.detect(services.layout);
        let Some(target) = from.opposite() else {
            self.diag(format_args!("unsupported layout"));
            return EventOutcome::UnsupportedLayout;
        };
        let Some(converted) = self.pair.transform(&text, from) else {
            return EventOutcome::UnsupportedLayout;
        };
        self.diag(format_args!(
            "{}\u{2192}{}: {}",
            self.detector.name(from),
            self.detector.name(target),
            converted
        ));

        if let Err(e) = services.input.type_text(&converted) {
            log::warn!("Retyping {} characters failed: {}", converted.chars().count(), e);
        }

        let flip = if self.auto_flip {
            Some(self.flip(target, services.layout))
        } else {
            None
        };

        EventOutcome::Retyped {
            text: converted,
            from,
            flip,
        }
    }

    fn flip(&self, target: LayoutRole, layouts: &mut dyn LayoutService) -> bool {
        let Some(spec) = self.detector.spec(target) else {
            return false;
        };
        if layouts.request_switch(spec.id) {
            self.diag(format_args!("Layout flipped \u{25BA} {}", spec.name));
            true
        } else {
            log::warn!("Failed to switch layout to {} ({})", spec.name, spec.id);
            false
        }
    }

    fn diag(&self, line: std::fmt::Arguments<'_>) {
        if self.diagnostics {
            log::info!("{}", line);
        }
    }
}
