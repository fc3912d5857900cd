use std::sync::{Arc, PoisonError, RwLock};

use error_handler::RegistryError;
use message_queue::{Message, MessageQueue, MessageType, MESSAGE_CONTENT_SIZE};

/// Outbound side of a relay: the queue that bytes received by this side are
/// forwarded into. Disconnected until the registry wires it.
pub struct RelayPort {
    owner: String,
    foreign: RwLock<Option<Arc<MessageQueue>>>,
}

impl RelayPort {
    pub fn new(owner: &str) -> Self {
        RelayPort {
            owner: owner.to_string(),
            foreign: RwLock::new(None),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn connect(&self, queue: Arc<MessageQueue>) {
        logger::info!("Relay {} -> {} connected", self.owner, queue.owner());
        *self.foreign.write().unwrap_or_else(PoisonError::into_inner) = Some(queue);
    }

    pub fn disconnect(&self) {
        self.foreign.write().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Disconnects only if the port currently points at `queue`.
    pub(crate) fn disconnect_from(&self, queue: &Arc<MessageQueue>) {
        let mut foreign = self.foreign.write().unwrap_or_else(PoisonError::into_inner);
        if foreign.as_ref().is_some_and(|current| Arc::ptr_eq(current, queue)) {
            *foreign = None;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.foreign.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn foreign_owner(&self) -> Option<String> {
        self.foreign
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|queue| queue.owner().to_string())
    }

    /// Pushes `payload` into the foreign queue as relay messages of at most
    /// one content buffer each. Returns the number of messages pushed; an
    /// unconnected port forwards nothing.
    pub fn forward(&self,
                   payload: &[u8],
                   timeout_ms: u32
    ) -> Result<usize, RegistryError> {
        let foreign = match self.foreign.read().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(queue) => queue,
            None => return Ok(0),
        };

        let mut pushed = 0;
        for chunk in payload.chunks(MESSAGE_CONTENT_SIZE) {
            let message = Message::new(MessageType::Relay, chunk).ok_or(RegistryError::InvalidArgs)?;
            if !foreign.push(&message, timeout_ms) {
                logger::error!("Failed to relay {} bytes from {} to {}", chunk.len(), self.owner, foreign.owner());
                return Err(RegistryError::QueueFull);
            }
            pushed += 1;
        }
        Ok(pushed)
    }
}
