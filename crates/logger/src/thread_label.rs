use std::cell::RefCell;

pub const UNKNOWN_THREAD_LABEL: &str = "UNKNOWN";

thread_local! {
    static THREAD_LABEL: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub fn set_thread_label(label: &str) {
    THREAD_LABEL.with(|cell| *cell.borrow_mut() = Some(label.to_string()));
}

pub fn clear_thread_label() {
    THREAD_LABEL.with(|cell| *cell.borrow_mut() = None);
}

pub fn thread_label() -> Option<String> {
    THREAD_LABEL.with(|cell| cell.borrow().clone())
}

/// The label stamped on log entries: the explicit label, else the OS thread
/// name, else `UNKNOWN`.
pub fn current_thread_label() -> String {
    thread_label()
        .or_else(|| std::thread::current().name().map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_THREAD_LABEL.to_string())
}
