mod event; pub use event::{Event, ResetMode};
mod message; pub use message::*;
mod queue; pub use queue::{MessageQueue, DEFAULT_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY};
