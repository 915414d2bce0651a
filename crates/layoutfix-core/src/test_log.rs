// Layoutfix Test Logging
// Per-thread capture of info and warn records for assertions

use std::cell::RefCell;
use std::sync::Once;

pub type Records = Vec<(log::Level, String)>;

struct CaptureLogger;

thread_local! {
    static RECORDS: RefCell<Records> = RefCell::new(Vec::new());
}

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        if record.level() <= log::Level::Info {
            let line = record.args().to_string();
            RECORDS.with(|r| r.borrow_mut().push((record.level(), line)));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Run `f` and return the info and warn records it logged on this thread
pub fn logged<T>(f: impl FnOnce() -> T) -> (T, Records) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }
    });
    RECORDS.with(|r| r.borrow_mut().clear());
    let value = f();
    (value, RECORDS.with(|r| r.borrow_mut().drain(..).collect()))
}

pub fn info_lines(records: &[(log::Level, String)]) -> Vec<&str> {
    records
        .iter()
        .filter(|(level, _)| *level == log::Level::Info)
        .map(|(_, line)| line.as_str())
        .collect()
}

pub fn has_warning(records: &[(log::Level, String)], needle: &str) -> bool {
    records
        .iter()
        .any(|(level, line)| *level == log::Level::Warn && line.contains(needle))
}
