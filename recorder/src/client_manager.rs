use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use app_thread::{ThreadContext, ThreadLifecycle};
use comm::CommConfig;
use error_handler::ThreadError;

use crate::session::{serve_connection, CLIENT_NAME};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Keeps a connection to the configured host, reconnecting after a fixed
/// delay whenever it fails or drops.
pub struct ClientManager {
    host: String,
    retry: Duration,
    comm: CommConfig,
}

impl ClientManager {
    pub fn new(host: &str, retry: Duration, comm: CommConfig) -> Self {
        ClientManager { host: host.to_string(), retry, comm }
    }

    fn connect(&self) -> std::io::Result<TcpStream> {
        let addrs: Vec<SocketAddr> = self.host.to_socket_addrs()?.collect();
        let mut last_error = std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }
}

impl ThreadLifecycle for ClientManager {
    fn label(&self) -> &str {
        "CLIENT_MANAGER"
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        while !ctx.shutdown_signalled() {
            match self.connect() {
                Ok(stream) => {
                    if let Err(err) = serve_connection(CLIENT_NAME, stream, &self.comm, ctx) {
                        logger::error!("Connection to {} failed: {}", self.host, err);
                    }
                }
                Err(err) => logger::warn!("Cannot connect to {}: {}", self.host, err),
            }
            ctx.shutdown().wait(self.retry);
        }
        Ok(())
    }
}
