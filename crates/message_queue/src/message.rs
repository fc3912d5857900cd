pub const MESSAGE_CONTENT_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Relay = 1,
    Test = 2,
    FileChunk = 3,
    Control = 4,
    Data = 5,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(MessageType::Relay),
            2 => Ok(MessageType::Test),
            3 => Ok(MessageType::FileChunk),
            4 => Ok(MessageType::Control),
            5 => Ok(MessageType::Data),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub content_size: usize,
}

/// Fixed-size message exchanged between threads. Copied by value.
#[derive(Clone, Copy)]
pub struct Message {
    pub header: MessageHeader,
    content: [u8; MESSAGE_CONTENT_SIZE],
}

impl Message {
    /// Builds a message from `payload`; `None` if it does not fit.
    pub fn new(message_type: MessageType, payload: &[u8]) -> Option<Self> {
        if payload.len() > MESSAGE_CONTENT_SIZE {
            return None;
        }
        let mut content = [0u8; MESSAGE_CONTENT_SIZE];
        content[..payload.len()].copy_from_slice(payload);
        Some(Message {
            header: MessageHeader { message_type, content_size: payload.len() },
            content,
        })
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// The meaningful prefix of the content buffer.
    pub fn payload(&self) -> &[u8] {
        &self.content[..self.header.content_size.min(MESSAGE_CONTENT_SIZE)]
    }

    pub fn is_valid(&self) -> bool {
        self.header.content_size <= MESSAGE_CONTENT_SIZE
    }
}

impl Default for Message {
    fn default() -> Self {
        Message {
            header: MessageHeader { message_type: MessageType::Data, content_size: 0 },
            content: [0u8; MESSAGE_CONTENT_SIZE],
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.payload() == other.payload()
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.header.message_type)
            .field("content_size", &self.header.content_size)
            .finish()
    }
}
