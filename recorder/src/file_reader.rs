use std::fs::File;
use std::io::Read;
use std::time::{Duration, Instant};

use app_thread::{ThreadContext, ThreadLifecycle};
use error_handler::{RegistryError, ThreadError};
use message_queue::{Message, MessageType, MESSAGE_CONTENT_SIZE};

use crate::config::{FileReaderConfig, ReadMode};

pub const FILE_READER_LABEL: &str = "FILE_READER";

/// Streams a file into another thread's mailbox as FILE_CHUNK messages.
pub struct FileReader {
    config: FileReaderConfig,
}

impl FileReader {
    pub fn new(config: FileReaderConfig) -> Self {
        FileReader { config }
    }

    /// Pushes `message`, waiting while the target is missing or full.
    /// Returns false if shutdown interrupted the wait.
    fn deliver(&self, ctx: &ThreadContext, message: &Message) -> Result<bool, ThreadError> {
        loop {
            match ctx.push_to(&self.config.target, message, self.config.queue_timeout_ms) {
                Ok(()) => return Ok(true),
                Err(RegistryError::QueueFull) => {}
                Err(RegistryError::NotFound) | Err(RegistryError::QueueError) => {
                    let timeout = Duration::from_millis(u64::from(self.config.queue_timeout_ms));
                    ctx.shutdown().wait(timeout);
                }
                Err(err) => return Err(err.into()),
            }
            if ctx.shutdown_signalled() {
                return Ok(false);
            }
        }
    }

    fn read_through(&self, ctx: &ThreadContext) -> Result<u64, ThreadError> {
        let path = self.config.path.display();
        let mut file = File::open(&self.config.path)
            .map_err(|err| ThreadError::Run(format!("cannot open {}: {}", path, err)))?;
        let file_size = file.metadata().map(|meta| meta.len()).unwrap_or(0);

        let chunk_size = self.config.chunk_size.clamp(1, MESSAGE_CONTENT_SIZE);
        let progress_interval = Duration::from_millis(self.config.progress_interval_ms);
        let mut buffer = [0u8; MESSAGE_CONTENT_SIZE];
        let mut total: u64 = 0;
        let mut last_progress = Instant::now();

        while !ctx.shutdown_signalled() {
            let count = file
                .read(&mut buffer[..chunk_size])
                .map_err(|err| ThreadError::Run(format!("cannot read {}: {}", path, err)))?;
            if count == 0 {
                break;
            }
            let message = Message::new(MessageType::FileChunk, &buffer[..count])
                .ok_or_else(|| ThreadError::Run("chunk exceeds message content".to_string()))?;
            if !self.deliver(ctx, &message)? {
                break;
            }
            total += count as u64;

            if self.config.log_progress && last_progress.elapsed() >= progress_interval {
                logger::info!("Read {} of {} bytes ({:.1}%)",
                              total, file_size, total as f64 * 100.0 / file_size.max(1) as f64);
                last_progress = Instant::now();
            }
            if self.config.chunk_delay_ms > 0 {
                ctx.shutdown().wait(Duration::from_millis(self.config.chunk_delay_ms));
            }
        }
        Ok(total)
    }
}

impl ThreadLifecycle for FileReader {
    fn label(&self) -> &str {
        FILE_READER_LABEL
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        logger::info!("Reading {} into {}", self.config.path.display(), self.config.target);
        loop {
            let total = self.read_through(ctx)?;
            logger::info!("Finished reading {} ({} bytes)", self.config.path.display(), total);
            if self.config.read_mode == ReadMode::Once
                || ctx.shutdown().wait(Duration::from_millis(self.config.reload_delay_ms))
            {
                return Ok(());
            }
        }
    }
}
