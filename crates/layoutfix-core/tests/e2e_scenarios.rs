// Layoutfix End-to-End Test Scenarios
//
// These tests drive the full hotkey pipeline against a simulated desktop:
// a clipboard with a sequence counter, a text field with a selection, a
// foreground keyboard layout and a manual clock. No OS access is needed.
//
// Run with: cargo test --test e2e_scenarios

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use layoutfix_core::{
    register_all, unregister_all, Action, ClipboardService, Clock, Config, EventOutcome,
    HotkeyBinding, HotkeyService, InputService, KeyMap, LayoutId, LayoutRole, LayoutService,
    Modifier, Modifiers, PlatformError, Services, Transliterator,
};

const ENGLISH: LayoutId = LayoutId::from_parts(0x09, 0x01);
const HEBREW: LayoutId = LayoutId::from_parts(0x0D, 0x01);
const GERMAN: LayoutId = LayoutId::from_parts(0x07, 0x01);

// =========================================================================
// Simulated desktop
// =========================================================================

/// Everything the fakes observe, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Release(Modifiers),
    Copy,
    SelectLine,
    SelectAll,
    Type(String),
    Sleep(Duration),
    Switch(LayoutId),
    Register(i32),
    Unregister(i32),
}

#[derive(Debug, Default)]
struct Desktop {
    journal: Vec<Event>,
    sequence: u32,
    clipboard: String,
    /// Currently selected text, if any
    selection: Option<String>,
    /// Text from the caret back to the line start
    line: Option<String>,
    /// Whole document
    document: Option<String>,
    layout: Option<LayoutId>,
    refuse_switch: bool,
    refuse_hotkey: Option<i32>,
    elapsed: Duration,
}

type Shared = Arc<Mutex<Desktop>>;

struct FakeClipboard(Shared);

impl ClipboardService for FakeClipboard {
    fn sequence_number(&self) -> u32 {
        self.0.lock().sequence
    }

    fn read_text(&mut self) -> Result<String, PlatformError> {
        Ok(self.0.lock().clipboard.clone())
    }
}

struct FakeInput(Shared);

impl InputService for FakeInput {
    fn release_modifiers(&mut self, modifiers: &Modifiers) -> Result<(), PlatformError> {
        self.0.lock().journal.push(Event::Release(modifiers.clone()));
        Ok(())
    }

    fn send_copy(&mut self) -> Result<(), PlatformError> {
        let mut desktop = self.0.lock();
        desktop.journal.push(Event::Copy);
        if let Some(selection) = desktop.selection.clone() {
            desktop.clipboard = selection;
            desktop.sequence += 1;
        }
        Ok(())
    }

    fn select_line(&mut self) -> Result<(), PlatformError> {
        let mut desktop = self.0.lock();
        desktop.journal.push(Event::SelectLine);
        desktop.selection = desktop.line.clone();
        Ok(())
    }

    fn select_all(&mut self) -> Result<(), PlatformError> {
        let mut desktop = self.0.lock();
        desktop.journal.push(Event::SelectAll);
        desktop.selection = desktop.document.clone();
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<(), PlatformError> {
        let mut desktop = self.0.lock();
        desktop.journal.push(Event::Type(text.to_string()));
        // Typing replaces the selection and leaves the caret after the text
        desktop.selection = None;
        Ok(())
    }
}

struct FakeLayouts(Shared);

impl LayoutService for FakeLayouts {
    fn foreground_layout(&self) -> Option<LayoutId> {
        self.0.lock().layout
    }

    fn request_switch(&mut self, layout: LayoutId) -> bool {
        let mut desktop = self.0.lock();
        desktop.journal.push(Event::Switch(layout));
        if desktop.refuse_switch {
            return false;
        }
        desktop.layout = Some(layout);
        true
    }
}

struct FakeHotkeys(Shared);

impl HotkeyService for FakeHotkeys {
    fn register(&mut self, binding: &HotkeyBinding) -> Result<(), PlatformError> {
        let mut desktop = self.0.lock();
        desktop.journal.push(Event::Register(binding.id));
        if desktop.refuse_hotkey == Some(binding.id) {
            return Err(PlatformError::Hotkey("already registered".to_string()));
        }
        Ok(())
    }

    fn unregister(&mut self, id: i32) {
        self.0.lock().journal.push(Event::Unregister(id));
    }
}

struct ManualClock {
    start: Instant,
    desktop: Shared,
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.desktop.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut desktop = self.desktop.lock();
        desktop.elapsed += duration;
        desktop.journal.push(Event::Sleep(duration));
    }
}

fn desktop(layout: Option<LayoutId>, selection: Option<&str>) -> Shared {
    Arc::new(Mutex::new(Desktop {
        sequence: 100,
        clipboard: "stale".to_string(),
        selection: selection.map(str::to_string),
        layout,
        ..Desktop::default()
    }))
}

/// Fire one hotkey against the desktop
fn fire(transliterator: &mut Transliterator, shared: &Shared, id: i32) -> EventOutcome {
    let mut clipboard = FakeClipboard(Arc::clone(shared));
    let mut input = FakeInput(Arc::clone(shared));
    let mut layouts = FakeLayouts(Arc::clone(shared));
    let clock = ManualClock {
        start: Instant::now(),
        desktop: Arc::clone(shared),
    };
    let mut services = Services {
        clipboard: &mut clipboard,
        input: &mut input,
        layout: &mut layouts,
        clock: &clock,
    };
    transliterator.handle_hotkey(id, &mut services)
}

fn journal(shared: &Shared) -> Vec<Event> {
    std::mem::take(&mut shared.lock().journal)
}

fn mods(list: &[Modifier]) -> Modifiers {
    list.iter().copied().collect()
}

/// Small two-entry setup from the classic example
fn qw_transliterator() -> Transliterator {
    let config = Config {
        keymap: [('q', '/'), ('w', '\'')].into_iter().collect(),
        ..Config::default()
    };
    Transliterator::from_config(&config).unwrap()
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_scenario_retype_selection_and_flip() {
    let mut transliterator = qw_transliterator();
    let shared = desktop(Some(ENGLISH), Some("Qw"));

    let outcome = fire(&mut transliterator, &shared, 1);

    assert_eq!(
        outcome,
        EventOutcome::Retyped {
            text: "/'".to_string(),
            from: LayoutRole::Primary,
            flip: Some(true),
        }
    );
    assert_eq!(
        journal(&shared),
        vec![
            Event::Release(mods(&[Modifier::Ctrl])),
            Event::Copy,
            Event::Type("/'".to_string()),
            Event::Switch(HEBREW),
        ]
    );
    assert_eq!(shared.lock().layout, Some(HEBREW));
}

#[test]
fn test_scenario_unsupported_layout() {
    let mut transliterator = qw_transliterator();
    let shared = desktop(Some(GERMAN), Some("qw"));

    let outcome = fire(&mut transliterator, &shared, 1);

    assert_eq!(outcome, EventOutcome::UnsupportedLayout);
    assert_eq!(
        journal(&shared),
        vec![Event::Release(mods(&[Modifier::Ctrl])), Event::Copy]
    );
    assert_eq!(shared.lock().layout, Some(GERMAN));
}

#[test]
fn test_scenario_retype_current_line_order() {
    let mut transliterator = Transliterator::from_config(&Config::default()).unwrap();
    let shared = desktop(Some(ENGLISH), None);
    shared.lock().line = Some("akuo".to_string());

    let outcome = fire(&mut transliterator, &shared, 2);

    assert_eq!(
        outcome,
        EventOutcome::Retyped {
            text: "שלום".to_string(),
            from: LayoutRole::Primary,
            flip: Some(true),
        }
    );
    assert_eq!(
        journal(&shared),
        vec![
            Event::Release(mods(&[Modifier::Ctrl, Modifier::Alt])),
            Event::SelectLine,
            Event::Sleep(Duration::from_millis(50)),
            Event::Copy,
            Event::Type("שלום".to_string()),
            Event::Switch(HEBREW),
        ]
    );
}

#[test]
fn test_scenario_retype_all() {
    let mut transliterator = Transliterator::from_config(&Config::default()).unwrap();
    let shared = desktop(Some(HEBREW), None);
    shared.lock().document = Some("יקט".to_string());

    let outcome = fire(&mut transliterator, &shared, 3);

    assert_eq!(
        outcome,
        EventOutcome::Retyped {
            text: "hey".to_string(),
            from: LayoutRole::Secondary,
            flip: Some(true),
        }
    );
    let events = journal(&shared);
    assert_eq!(events[1], Event::SelectAll);
    assert_eq!(events[2], Event::Sleep(Duration::from_millis(50)));
    assert_eq!(events.last(), Some(&Event::Switch(ENGLISH)));
}

#[test]
fn test_scenario_unknown_hotkey_has_no_side_effects() {
    let mut transliterator = qw_transliterator();
    let shared = desktop(Some(ENGLISH), Some("qw"));

    let outcome = fire(&mut transliterator, &shared, 77);

    assert_eq!(outcome, EventOutcome::Ignored);
    assert!(journal(&shared).is_empty());
    assert_eq!(shared.lock().sequence, 100);
    assert_eq!(shared.lock().elapsed, Duration::ZERO);
}

#[test]
fn test_scenario_nothing_selected_times_out() {
    let mut transliterator = qw_transliterator();
    let shared = desktop(Some(ENGLISH), None);

    let outcome = fire(&mut transliterator, &shared, 1);

    assert_eq!(outcome, EventOutcome::NothingSelected);
    assert_eq!(shared.lock().elapsed, Duration::from_millis(200));
    let events = journal(&shared);
    assert!(!events.iter().any(|e| matches!(e, Event::Type(_) | Event::Switch(_))));
}

#[test]
fn test_scenario_flip_failure_still_retypes() {
    let mut transliterator = qw_transliterator();
    let shared = desktop(Some(ENGLISH), Some("wq"));
    shared.lock().refuse_switch = true;

    let outcome = fire(&mut transliterator, &shared, 1);

    assert_eq!(
        outcome,
        EventOutcome::Retyped {
            text: "'/".to_string(),
            from: LayoutRole::Primary,
            flip: Some(false),
        }
    );
    let events = journal(&shared);
    assert!(events.contains(&Event::Type("'/".to_string())));
    assert_eq!(shared.lock().layout, Some(ENGLISH));
}

#[test]
fn test_scenario_auto_flip_disabled() {
    let config = Config::from_toml("auto_flip = false\n").unwrap();
    let mut transliterator = Transliterator::from_config(&config).unwrap();
    let shared = desktop(Some(ENGLISH), Some("v"));

    let outcome = fire(&mut transliterator, &shared, 1);

    assert!(matches!(outcome, EventOutcome::Retyped { flip: None, .. }));
    assert!(!journal(&shared).iter().any(|e| matches!(e, Event::Switch(_))));
}

#[test]
fn test_scenario_fix_and_fix_back() {
    let mut transliterator = Transliterator::from_config(&Config::default()).unwrap();
    let shared = desktop(Some(ENGLISH), Some("Hello, world"));

    let hebrew = match fire(&mut transliterator, &shared, 1) {
        EventOutcome::Retyped { text, .. } => text,
        other => panic!("expected a retype, got {:?}", other),
    };
    assert_eq!(shared.lock().layout, Some(HEBREW));

    // Select what was just typed and fix it again
    shared.lock().selection = Some(hebrew);
    let second = fire(&mut transliterator, &shared, 1);

    assert_eq!(
        second,
        EventOutcome::Retyped {
            text: "hello, world".to_string(),
            from: LayoutRole::Secondary,
            flip: Some(true),
        }
    );
    assert_eq!(shared.lock().layout, Some(ENGLISH));
}

#[test]
fn test_default_keymap_round_trips() {
    let config = Config::default();
    let pair = config.layout_pair().unwrap();
    for (primary, _) in config.keymap.iter() {
        let there = pair.transform(&primary.to_string(), LayoutRole::Primary).unwrap();
        let back = pair.transform(&there, LayoutRole::Secondary).unwrap();
        assert_eq!(back, primary.to_string(), "round trip of {:?}", primary);
    }
}

#[test]
fn test_custom_config_end_to_end() {
    let toml = r#"
        [primary]
        name = "English"

        [secondary]
        name = "Russian"
        lang = 0x19

        [keymap]
        g = "п"
        h = "р"
        b = "и"
        d = "в"
        t = "е"
        n = "т"

        [[hotkey]]
        id = 9
        keys = "Shift+Pause"
        action = "retype-selection"
    "#;
    let config = Config::from_toml(toml).unwrap();
    let mut transliterator = Transliterator::from_config(&config).unwrap();
    let russian = LayoutId::from_parts(0x19, 0x01);
    let shared = desktop(Some(ENGLISH), Some("ghbdtn"));

    assert_eq!(fire(&mut transliterator, &shared, 1), EventOutcome::Ignored);
    let outcome = fire(&mut transliterator, &shared, 9);

    assert_eq!(
        outcome,
        EventOutcome::Retyped {
            text: "привет".to_string(),
            from: LayoutRole::Primary,
            flip: Some(true),
        }
    );
    assert_eq!(shared.lock().layout, Some(russian));
    assert_eq!(
        journal(&shared)[0],
        Event::Release(mods(&[Modifier::Shift]))
    );
}

#[test]
fn test_registration_rolls_back_on_failure() {
    let shared = desktop(None, None);
    shared.lock().refuse_hotkey = Some(3);
    let mut hotkeys = FakeHotkeys(Arc::clone(&shared));

    let err = register_all(&Config::default().hotkeys, &mut hotkeys).unwrap_err();

    assert_eq!(err.id, 3);
    assert_eq!(err.hotkey, "Ctrl+Alt+N");
    assert_eq!(
        journal(&shared),
        vec![
            Event::Register(1),
            Event::Register(2),
            Event::Register(3),
            Event::Unregister(2),
            Event::Unregister(1),
        ]
    );
}

#[test]
fn test_registration_and_shutdown() {
    let shared = desktop(None, None);
    let mut hotkeys = FakeHotkeys(Arc::clone(&shared));
    let bindings = vec![
        HotkeyBinding::parse(1, "Ctrl+M", Action::RetypeSelection).unwrap(),
        HotkeyBinding::parse(2, "Ctrl+Alt+M", Action::RetypeCurrentLine).unwrap(),
    ];

    let registered = register_all(&bindings, &mut hotkeys).unwrap();
    assert_eq!(registered, vec![1, 2]);

    unregister_all(&registered, &mut hotkeys);
    assert_eq!(
        journal(&shared),
        vec![
            Event::Register(1),
            Event::Register(2),
            Event::Unregister(2),
            Event::Unregister(1),
        ]
    );
}

#[test]
fn test_keymap_is_plain_value() {
    // Two independent pipelines with different tables do not interfere
    let mut a = qw_transliterator();
    let config = Config {
        keymap: KeyMap::from_iter([('q', 'x')]),
        ..Config::default()
    };
    let mut b = Transliterator::from_config(&config).unwrap();

    let shared_a = desktop(Some(ENGLISH), Some("q"));
    let shared_b = desktop(Some(ENGLISH), Some("q"));

    assert!(matches!(fire(&mut a, &shared_a, 1), EventOutcome::Retyped { ref text, .. } if text == "/"));
    assert!(matches!(fire(&mut b, &shared_b, 1), EventOutcome::Retyped { ref text, .. } if text == "x"));
}
