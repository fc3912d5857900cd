mod context; pub use context::*;
pub mod error; pub use error::CommError;
pub mod hex_dump; pub use hex_dump::{HexDumpLayout, HexDumper};
mod threads; pub use threads::{ReceiveThread, SendThread};

use std::sync::Arc;

use app_thread::{spawn_app_thread, AppThreadHandle, Shutdown};
use error_handler::ThreadError;
use logger_proc_macro::log;
use thread_registry::ThreadRegistry;

/// Starts the send/receive pair for `comm`. The send thread goes first so
/// its mailbox and relay port exist before the receiver looks them up.
#[log(debug)]
pub fn start_connection_threads(comm: Arc<CommContext>,
                                registry: &Arc<ThreadRegistry>,
                                shutdown: &Shutdown
) -> Result<(AppThreadHandle, AppThreadHandle), ThreadError> {
    let sender = spawn_app_thread(SendThread::new(comm.clone()), registry, shutdown, true)?;
    match spawn_app_thread(ReceiveThread::new(comm.clone()), registry, shutdown, true) {
        Ok(receiver) => Ok((sender, receiver)),
        Err(err) => {
            comm.close();
            let _ = sender.join();
            let _ = registry.deregister(&comm.send_label());
            Err(err)
        }
    }
}

/// Waits for both threads of a closed connection and removes them from the
/// registry so the labels can be reused by the next connection.
pub fn retire_connection_threads(comm: &CommContext,
                                 threads: (AppThreadHandle, AppThreadHandle),
                                 registry: &ThreadRegistry
) {
    comm.close();
    let (sender, receiver) = threads;
    for handle in [sender, receiver] {
        let label = handle.label().to_string();
        if let Err(err) = handle.join() {
            logger::warn!("{} ended with error: {}", label, err);
        }
        if let Err(err) = registry.deregister(&label) {
            logger::warn!("Could not deregister {}: {}", label, err);
        }
    }
}
