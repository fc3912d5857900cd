use app_config::AppConfig;
use comm::{CommConfig, HexDumpLayout};
use logger::{ConsoleLogTarget, FileLogTarget, LogLevel, Logger, LOG_QUEUE_SIZE};
use message_queue::{DEFAULT_QUEUE_CAPACITY, MESSAGE_CONTENT_SIZE};

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_COMMAND_PORT: u16 = 4100;

const EXPECTED_SECTIONS: [&str; 4] = ["logger", "network", "queues", "threads"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    Console,
    File,
    Both,
}

impl LogDestination {
    fn parse(raw: &str) -> LogDestination {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" => LogDestination::File,
            "both" => LogDestination::Both,
            _ => LogDestination::Console,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Once,
    Loop,
}

#[derive(Debug, Clone)]
pub struct FileReaderConfig {
    pub path: PathBuf,
    pub target: String,
    pub read_mode: ReadMode,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub reload_delay_ms: u64,
    pub queue_timeout_ms: u32,
    pub log_progress: bool,
    pub progress_interval_ms: u64,
}

impl FileReaderConfig {
    pub fn new(path: PathBuf, target: &str) -> Self {
        FileReaderConfig {
            path,
            target: target.to_string(),
            read_mode: ReadMode::Once,
            chunk_size: MESSAGE_CONTENT_SIZE,
            chunk_delay_ms: 0,
            reload_delay_ms: 1000,
            queue_timeout_ms: 100,
            log_progress: true,
            progress_interval_ms: 1000,
        }
    }
}

pub struct RecorderConfig {
    pub log_level: LogLevel,
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
    pub log_queue_capacity: usize,
    pub server_bind: Option<String>,
    pub client_host: Option<String>,
    pub connect_retry: Duration,
    pub suppressed: String,
    pub comm: CommConfig,
    pub file_reader: Option<FileReaderConfig>,
    pub command_port: Option<u16>,
}

impl RecorderConfig {
    pub fn from_app_config(config: &AppConfig) -> RecorderConfig {
        let log_level = config
            .get_string("logger", "log_level", "info")
            .parse()
            .unwrap_or(LogLevel::Info);

        let server_bind = config
            .get_bool("network", "server.enabled", true)
            .then(|| config.get_string("network", "server.bind", "0.0.0.0:4200"));
        let client_host = config
            .get_bool("network", "client.enabled", false)
            .then(|| config.get_string("network", "client.host", "127.0.0.1:4300"));

        let comm = CommConfig {
            io_timeout: Duration::from_millis(config.get_int("network", "io_timeout_ms", 100).max(1) as u64),
            relay_enabled: config.get_bool("network", "enable_relay", false),
            queue_capacity: config.get_usize("queues", "capacity", DEFAULT_QUEUE_CAPACITY),
            hex_dump: HexDumpLayout::new(
                config.get_usize("logger", "hex_dump_bytes_per_row", 32),
                config.get_usize("logger", "hex_dump_bytes_per_col", 4),
            ),
            ..CommConfig::default()
        };

        RecorderConfig {
            log_level,
            log_destination: LogDestination::parse(&config.get_string("logger", "log_destination", "console")),
            log_file: PathBuf::from(config.get_string("logger", "log_file", "recorder.log")),
            log_queue_capacity: config.get_usize("logger", "queue_capacity", LOG_QUEUE_SIZE),
            server_bind,
            client_host,
            connect_retry: Duration::from_millis(config.get_int("network", "connect_retry_ms", 1000).max(0) as u64),
            suppressed: config.get_string("threads", "suppressed", ""),
            comm,
            file_reader: Self::file_reader(config),
            command_port: config
                .get_bool("command_interface", "enabled", true)
                .then(|| config.get_u16("command_interface", "listening_port", DEFAULT_COMMAND_PORT)),
        }
    }

    /// Top level sections the recorder reads that `config` does not have.
    pub fn missing_sections(config: &AppConfig) -> Vec<&'static str> {
        EXPECTED_SECTIONS
            .into_iter()
            .filter(|section| !config.has_section(section))
            .collect()
    }

    fn file_reader(config: &AppConfig) -> Option<FileReaderConfig> {
        if !config.get_bool("file_reader", "enabled", false) {
            return None;
        }
        let path = config.get("file_reader", "path")?;
        let mut reader = FileReaderConfig::new(
            PathBuf::from(path),
            &config.get_string("file_reader", "target", "CLIENT.SEND"),
        );
        if config.get_string("file_reader", "read_mode", "once").eq_ignore_ascii_case("loop") {
            reader.read_mode = ReadMode::Loop;
        }
        // zero means one full message per chunk
        reader.chunk_size = match config.get_usize("file_reader", "chunk_size", 0) {
            0 => MESSAGE_CONTENT_SIZE,
            size => size.min(MESSAGE_CONTENT_SIZE),
        };
        reader.chunk_delay_ms = config.get_int("file_reader", "chunk_delay_ms", 0).max(0) as u64;
        reader.reload_delay_ms = config.get_int("file_reader", "reload_delay_ms", 1000).max(0) as u64;
        reader.queue_timeout_ms = config.get_u32("file_reader", "queue_timeout_ms", reader.queue_timeout_ms);
        reader.log_progress = config.get_bool("file_reader", "log_progress", true);
        reader.progress_interval_ms = config.get_int("file_reader", "progress_interval_ms", 1000).max(1) as u64;
        Some(reader)
    }

    /// Builds the logger for the configured destination. A log file that
    /// cannot be opened leaves the console as the only target.
    pub fn build_logger(&self) -> Logger {
        let console: Box<dyn logger::LogTarget + Send + Sync> = Box::new(ConsoleLogTarget);
        let file = match self.log_destination {
            LogDestination::Console => None,
            LogDestination::File | LogDestination::Both => match FileLogTarget::new(&self.log_file) {
                Ok(target) => Some(target),
                Err(err) => {
                    eprintln!("Cannot open log file {}: {}", self.log_file.display(), err);
                    None
                }
            },
        };

        match (self.log_destination, file) {
            (LogDestination::File, Some(file)) => Logger::new(self.log_level, self.log_queue_capacity, Box::new(file)),
            (LogDestination::Both, Some(file)) => {
                let logger = Logger::new(self.log_level, self.log_queue_capacity, console);
                logger.add_target(Box::new(file));
                logger
            }
            _ => Logger::new(self.log_level, self.log_queue_capacity, console),
        }
    }
}
