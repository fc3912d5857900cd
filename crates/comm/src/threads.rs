use std::sync::Arc;

use app_thread::{ThreadContext, ThreadLifecycle};
use error_handler::{RegistryError, ThreadError};
use thread_registry::RelayPort;

use crate::hex_dump::HexDumper;
use crate::{CommContext, Received};

/// Writes whatever lands in its mailbox to the socket.
pub struct SendThread {
    label: String,
    comm: Arc<CommContext>,
}

impl SendThread {
    pub fn new(comm: Arc<CommContext>) -> Self {
        SendThread { label: comm.send_label(), comm }
    }
}

impl ThreadLifecycle for SendThread {
    fn label(&self) -> &str {
        &self.label
    }

    fn queue_capacity(&self) -> Option<usize> {
        Some(self.comm.config().queue_capacity)
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        let timeout = self.comm.config().queue_timeout_ms;
        while !ctx.shutdown_signalled() && !self.comm.is_closed() {
            match ctx.pop_message(timeout) {
                Ok(message) => {
                    if let Err(err) = self.comm.send_all(message.payload()) {
                        logger::warn!("{}: send failed: {}", self.label, err);
                        break;
                    }
                }
                Err(RegistryError::QueueEmpty) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn exit(&mut self, _ctx: &ThreadContext) {
        self.comm.close();
    }
}

/// Reads from the socket, hex-dumps what arrives and relays it.
pub struct ReceiveThread {
    label: String,
    comm: Arc<CommContext>,
    port: Option<Arc<RelayPort>>,
}

impl ReceiveThread {
    pub fn new(comm: Arc<CommContext>) -> Self {
        ReceiveThread { label: comm.receive_label(), comm, port: None }
    }
}

impl ThreadLifecycle for ReceiveThread {
    fn label(&self) -> &str {
        &self.label
    }

    fn init(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        // the relay port lives on the entry that owns this side's mailbox
        self.port = Some(ctx.registry().relay_port(&self.comm.send_label())?);
        Ok(())
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        let port = self.port.clone().ok_or(ThreadError::Registry(RegistryError::NotFound))?;
        let mut dumper = HexDumper::new(self.comm.config().hex_dump);
        let mut buffer = vec![0u8; self.comm.config().read_buffer_size.max(1)];

        while !ctx.shutdown_signalled() {
            match self.comm.receive_once(&mut buffer) {
                Ok(Received::Data(count)) => {
                    if let Err(err) = self.comm.handle_received(&buffer[..count], &mut dumper, &port) {
                        logger::error!("{}: {}", self.label, err);
                    }
                }
                Ok(Received::Idle) => continue,
                Ok(Received::Closed) => break,
                Err(err) => {
                    logger::warn!("{}: receive failed: {}", self.label, err);
                    break;
                }
            }
        }
        Ok(())
    }

    fn exit(&mut self, _ctx: &ThreadContext) {
        self.comm.close();
    }
}
