use std::io::ErrorKind;
use std::net::TcpListener;
use std::time::Duration;

use app_thread::{ThreadContext, ThreadLifecycle};
use comm::CommConfig;
use error_handler::ThreadError;

use crate::session::{serve_connection, SERVER_NAME};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Listens on the configured address and serves one peer at a time.
pub struct ServerManager {
    bind: String,
    retry: Duration,
    comm: CommConfig,
}

impl ServerManager {
    pub fn new(bind: &str, retry: Duration, comm: CommConfig) -> Self {
        ServerManager { bind: bind.to_string(), retry, comm }
    }

    fn listen(&self, ctx: &ThreadContext) -> Option<TcpListener> {
        while !ctx.shutdown_signalled() {
            match TcpListener::bind(&self.bind).and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            }) {
                Ok(listener) => {
                    logger::info!("Server listening on {}", self.bind);
                    return Some(listener);
                }
                Err(err) => {
                    logger::warn!("Cannot listen on {}: {}, will retry", self.bind, err);
                    ctx.shutdown().wait(self.retry);
                }
            }
        }
        None
    }
}

impl ThreadLifecycle for ServerManager {
    fn label(&self) -> &str {
        "SERVER_MANAGER"
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        let Some(listener) = self.listen(ctx) else {
            return Ok(());
        };

        while !ctx.shutdown_signalled() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    logger::info!("Accepted connection from {}", peer);
                    if let Err(err) = stream.set_nonblocking(false) {
                        logger::warn!("Dropping {}: {}", peer, err);
                        continue;
                    }
                    if let Err(err) = serve_connection(SERVER_NAME, stream, &self.comm, ctx) {
                        logger::error!("Connection from {} failed: {}", peer, err);
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    ctx.shutdown().wait(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => {
                    logger::error!("Accept failed: {}, will retry", err);
                    ctx.shutdown().wait(self.retry);
                }
            }
        }
        logger::info!("Server shutting down, closing listener");
        Ok(())
    }
}
