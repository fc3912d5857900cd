mod logger; pub use logger::*;
mod entry; pub use entry::*;
mod msg_fmt;
mod logger_macro;
mod ring_buffer;
pub mod log_queue; pub use log_queue::{LogQueue, LogSink, LOG_QUEUE_SIZE};
pub mod targets; pub use targets::*;
pub mod thread_label; pub use thread_label::{current_thread_label, set_thread_label};
pub mod writer; pub use writer::{start_consumer_thread, LogWriter};

use std::sync::{Arc, OnceLock};

static LOGGER: OnceLock<Arc<Logger>> = OnceLock::new();

/// Makes `logger` the target of the logging macros. Only the first call
/// wins; later calls hand their logger back.
pub fn install(logger: Arc<Logger>) -> Result<(), Arc<Logger>> {
    LOGGER.set(logger)
}

pub fn installed() -> Option<Arc<Logger>> {
    LOGGER.get().cloned()
}

pub fn log(level: LogLevel, message: String) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, &message);
    }
}

pub fn level_enabled(level: LogLevel) -> bool {
    LOGGER.get().is_some_and(|logger| logger.is_enabled(level))
}

pub fn get_logger_level() -> LogLevel {
    LOGGER.get().map_or(LogLevel::Info, |logger| logger.get_log_level())
}

pub fn set_logger_level(level: LogLevel) {
    if let Some(logger) = LOGGER.get() {
        logger.update_level(level);
    }
}
