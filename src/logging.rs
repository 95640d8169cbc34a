//! Browser console backend for the `log` facade.

use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Install the panic hook and, in the browser, route `log` records to the
/// devtools console. Safe to call from every exported function.
pub fn init(level: LevelFilter) {
    INIT.call_once(|| {
        console_error_panic_hook::set_once();

        #[cfg(target_arch = "wasm32")]
        {
            if log::set_logger(&console::ConsoleLogger).is_ok() {
                log::set_max_level(level);
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            // native hosts install their own logger
            let _ = level;
        }
    });
}

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, Log, Metadata, Record};
    use wasm_bindgen::JsValue;

    pub(super) struct ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record<'_>) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
            match record.level() {
                Level::Error => web_sys::console::error_1(&line),
                Level::Warn => web_sys::console::warn_1(&line),
                Level::Info => web_sys::console::info_1(&line),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
            }
        }

        fn flush(&self) {}
    }
}
