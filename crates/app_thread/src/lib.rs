mod group; pub use group::ThreadGroup;
mod lifecycle; pub use lifecycle::*;
mod shutdown; pub use shutdown::Shutdown;
