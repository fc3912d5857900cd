use error_handler::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("relay failed: {0}")]
    Relay(#[from] RegistryError),
    #[error("connection {0} is closed")]
    Closed(String),
}
