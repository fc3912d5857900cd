use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use app_thread::ThreadContext;
use comm::{retire_connection_threads, start_connection_threads, CommConfig, CommContext};
use error_handler::{RegistryError, ThreadError};
use thread_registry::ThreadRegistry;

pub const SERVER_NAME: &str = "SERVER";
pub const CLIENT_NAME: &str = "CLIENT";

const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cross-wires the server and client mailboxes. Succeeds quietly when one
/// side is not connected yet; that side links up when it arrives.
pub fn link_relay(registry: &ThreadRegistry) -> Result<bool, RegistryError> {
    let server = format!("{}.SEND", SERVER_NAME);
    let client = format!("{}.SEND", CLIENT_NAME);
    match registry.setup_relay(&server, &client) {
        Ok(()) => {
            logger::info!("Relay established between {} and {}", server, client);
            Ok(true)
        }
        Err(RegistryError::NotFound) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Runs the send/receive pair for one connection until the peer goes away
/// or shutdown is signalled, then retires both threads.
pub fn serve_connection(name: &str,
                        stream: TcpStream,
                        config: &CommConfig,
                        ctx: &ThreadContext
) -> Result<(), ThreadError> {
    let comm = CommContext::new(name, stream, config.clone())
        .map_err(|err| ThreadError::Run(err.to_string()))?;
    let comm = Arc::new(comm);
    logger::info!("{} connected to {:?}", name, comm.peer());

    let threads = start_connection_threads(comm.clone(), ctx.registry(), ctx.shutdown())?;
    if config.relay_enabled {
        if let Err(err) = link_relay(ctx.registry()) {
            logger::warn!("Could not link relay: {}", err);
        }
    }

    while !comm.is_closed() && !ctx.shutdown().wait(SESSION_POLL_INTERVAL) {}

    retire_connection_threads(&comm, threads, ctx.registry());
    logger::info!("{} disconnected", name);
    Ok(())
}
