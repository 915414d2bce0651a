// Layoutfix Action Dispatcher
// Maps fired hotkey ids to actions and widens the selection before capture

use indexmap::IndexMap;
use std::time::Duration;

use crate::action::{Action, Widening};
use crate::hotkey::HotkeyBinding;
use crate::platform::{Clock, InputService};

/// Default wait after a selection-widening command
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Static hotkey table plus the widening step
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    bindings: IndexMap<i32, HotkeyBinding>,
    settle_delay: Duration,
}

impl ActionDispatcher {
    /// Create a dispatcher over the given bindings.
    ///
    /// If two bindings share an id the later one wins; the configuration
    /// loader rejects that case before it gets here.
    pub fn new(bindings: impl IntoIterator<Item = HotkeyBinding>, settle_delay: Duration) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|binding| (binding.id, binding))
            .collect();
        Self {
            bindings,
            settle_delay,
        }
    }

    /// All bindings in declaration order
    pub fn bindings(&self) -> impl Iterator<Item = &HotkeyBinding> + '_ {
        self.bindings.values()
    }

    /// Binding registered under `id`
    pub fn binding(&self, id: i32) -> Option<&HotkeyBinding> {
        self.bindings.get(&id)
    }

    /// Action bound to `id`, or None for identifiers we never registered
    pub fn resolve(&self, id: i32) -> Option<Action> {
        self.bindings.get(&id).map(|binding| binding.action)
    }

    /// Issue the widening command for `action` and wait the settle delay.
    ///
    /// Returns the widening performed, or None when the action captures the
    /// selection as-is. Failures are logged and capture still proceeds.
    pub fn widen(
        &self,
        action: Action,
        input: &mut dyn InputService,
        clock: &dyn Clock,
    ) -> Option<Widening> {
        let widening = action.widening()?;
        let result = match widening {
            Widening::ToLineStart => input.select_line(),
            Widening::All => input.select_all(),
        };
        if let Err(e) = result {
            log::warn!("Widening selection ({:?}) failed: {}", widening, e);
        }
        clock.sleep(self.settle_delay);
        Some(widening)
    }
}
