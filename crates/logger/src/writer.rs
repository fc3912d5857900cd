use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};

use crate::thread_label::set_thread_label;
use crate::Logger;

pub const LOGGER_THREAD_LABEL: &str = "LOGGER";

pub enum LogCommand {
    Flush,
    Terminate,
}

/// Handle to the thread draining the log queue.
pub struct LogWriter {
    sender: Sender<LogCommand>,
    handle: Option<JoinHandle<()>>,
}

pub fn start_consumer_thread(logger: Arc<Logger>,
                             poll_interval: Duration
) -> std::io::Result<LogWriter> {
    let (sender, receiver) = unbounded();
    logger.set_running(true);

    let worker_logger = logger.clone();
    let spawned = thread::Builder::new()
        .name(LOGGER_THREAD_LABEL.to_string())
        .spawn(move || {
            set_thread_label(LOGGER_THREAD_LABEL);
            loop {
                worker_logger.drain();
                match receiver.recv_timeout(poll_interval) {
                    Ok(LogCommand::Flush) | Err(RecvTimeoutError::Timeout) => continue,
                    Ok(LogCommand::Terminate) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            worker_logger.set_running(false);
            worker_logger.drain();
        });

    match spawned {
        Ok(handle) => Ok(LogWriter { sender, handle: Some(handle) }),
        Err(err) => {
            logger.set_running(false);
            Err(err)
        }
    }
}

impl LogWriter {
    /// Wakes the writer so it drains the queue now.
    pub fn flush(&self) {
        let _ = self.sender.send(LogCommand::Flush);
    }

    pub fn terminate(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(LogCommand::Terminate);
            let _ = handle.join();
        }
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
