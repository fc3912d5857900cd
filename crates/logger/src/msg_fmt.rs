use std::io::IsTerminal;

use crate::{LogEntry, LogLevel};

fn color_code(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "\x1b[1;35m",    // magenta
        LogLevel::Debug => "\x1b[1;34m",    // blue
        LogLevel::Info => "\x1b[1;32m",     // green
        LogLevel::Notice => "\x1b[1;36m",   // cyan
        LogLevel::Warn => "\x1b[1;33m",     // yellow
        LogLevel::Error => "\x1b[1;31m",    // red
        LogLevel::Critical => "\x1b[1;41m", // red background
        LogLevel::Fatal => "\x1b[1;45m",    // magenta background
    }
}

/// Wraps a formatted line in the level's colour when stdout is a terminal.
pub(crate) fn colorize(level: LogLevel, line: String) -> String {
    if std::io::stdout().is_terminal() {
        format!("{}{}\x1b[0m", color_code(level), line)
    } else {
        line
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self,
           f: &mut std::fmt::Formatter
    ) -> std::fmt::Result {
        write!(f, "{} - {} [{:8}] - {}",
               self.thread_label(),
               self.timestamp.format("%d/%m/%Y %H:%M:%S.%f"),
               self.level.as_str(),
               self.message()
        )
    }
}
