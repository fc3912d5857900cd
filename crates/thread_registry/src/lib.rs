mod state; pub use state::ThreadState;
mod registry; pub use registry::*;
pub mod relay; pub use relay::RelayPort;
