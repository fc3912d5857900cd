use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown as SocketShutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use error_handler::RegistryError;
use thread_registry::{RelayPort, ThreadRegistry};

use crate::hex_dump::{HexDumpLayout, HexDumper};
use crate::CommError;

#[derive(Debug, Clone)]
pub struct CommConfig {
    pub io_timeout: Duration,
    pub relay_enabled: bool,
    pub relay_timeout_ms: u32,
    pub queue_timeout_ms: u32,
    pub queue_capacity: usize,
    pub read_buffer_size: usize,
    pub hex_dump: HexDumpLayout,
}

impl Default for CommConfig {
    fn default() -> Self {
        CommConfig {
            io_timeout: Duration::from_millis(100),
            relay_enabled: false,
            relay_timeout_ms: 5000,
            queue_timeout_ms: 100,
            queue_capacity: message_queue::DEFAULT_QUEUE_CAPACITY,
            read_buffer_size: 4096,
            hex_dump: HexDumpLayout::default(),
        }
    }
}

/// Outcome of one read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Data(usize),
    Idle,
    Closed,
}

/// One TCP connection shared by its send and receive threads.
pub struct CommContext {
    name: String,
    stream: TcpStream,
    peer: Option<SocketAddr>,
    closed: AtomicBool,
    config: CommConfig,
}

impl CommContext {
    pub fn new(name: &str,
               stream: TcpStream,
               config: CommConfig
    ) -> Result<Self, CommError> {
        stream.set_read_timeout(Some(config.io_timeout))?;
        stream.set_write_timeout(Some(config.io_timeout))?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr().ok();
        Ok(CommContext {
            name: name.to_string(),
            stream,
            peer,
            closed: AtomicBool::new(false),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn config(&self) -> &CommConfig {
        &self.config
    }

    /// Label of the thread that writes to the socket and owns the mailbox.
    pub fn send_label(&self) -> String {
        format!("{}.SEND", self.name)
    }

    pub fn receive_label(&self) -> String {
        format!("{}.RECEIVE", self.name)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.stream.shutdown(SocketShutdown::Both);
            logger::info!("Connection {} closed", self.name);
        }
    }

    /// Relays this connection's traffic into `other`'s mailbox and the other
    /// way round. Both send threads must be registered with mailboxes.
    pub fn relay_with(&self,
                      other: &CommContext,
                      registry: &ThreadRegistry
    ) -> Result<(), RegistryError> {
        registry.setup_relay(&self.send_label(), &other.send_label())
    }

    /// Reads once. A read timeout is not an error; end of stream and socket
    /// errors close the context.
    pub fn receive_once(&self, buffer: &mut [u8]) -> Result<Received, CommError> {
        if self.is_closed() {
            return Ok(Received::Closed);
        }
        match (&self.stream).read(buffer) {
            Ok(0) => {
                self.close();
                Ok(Received::Closed)
            }
            Ok(count) => Ok(Received::Data(count)),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                Ok(Received::Idle)
            }
            Err(err) => {
                self.close();
                Err(err.into())
            }
        }
    }

    pub fn send_all(&self, bytes: &[u8]) -> Result<(), CommError> {
        if self.is_closed() {
            return Err(CommError::Closed(self.name.clone()));
        }
        if let Err(err) = (&self.stream).write_all(bytes) {
            self.close();
            return Err(err.into());
        }
        Ok(())
    }

    /// Logs `bytes` as a hex dump and forwards them through `port` when
    /// relaying is enabled. Returns the number of relay messages pushed.
    pub fn handle_received(&self,
                           bytes: &[u8],
                           dumper: &mut HexDumper,
                           port: &RelayPort
    ) -> Result<usize, CommError> {
        logger::info!("{} bytes received: top", bytes.len());
        for row in dumper.rows(bytes) {
            logger::info!("{}", row);
        }
        logger::info!("{} bytes received: bottom", bytes.len());

        if !self.config.relay_enabled {
            return Ok(0);
        }
        Ok(port.forward(bytes, self.config.relay_timeout_ms)?)
    }
}
