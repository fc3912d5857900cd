use std::fmt::Display;
use std::str::Utf8Error;

/// Failure results of the thread registry.
///
/// None of these are fatal; callers decide whether to retry, log or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    NotInitialized,
    InvalidArgs,
    LockError,
    Timeout,
    DuplicateThread,
    NotFound,
    InvalidStateTransition,
    QueueFull,
    QueueEmpty,
    QueueError,
    CleanupError,
    AllocationFailed,
}

impl RegistryError {
    pub fn message(&self) -> &'static str {
        match self {
            RegistryError::NotInitialized => "Thread registry not initialized",
            RegistryError::InvalidArgs => "Invalid arguments provided",
            RegistryError::LockError => "Failed to acquire registry lock",
            RegistryError::Timeout => "Operation timed out",
            RegistryError::DuplicateThread => "Thread already registered",
            RegistryError::NotFound => "Thread not found in registry",
            RegistryError::InvalidStateTransition => "Invalid thread state transition",
            RegistryError::QueueFull => "Message queue is full",
            RegistryError::QueueEmpty => "Message queue is empty",
            RegistryError::QueueError => "Message queue operation failed",
            RegistryError::CleanupError => "Failed to clean up thread resources",
            RegistryError::AllocationFailed => "Memory allocation failed",
        }
    }
}

impl std::error::Error for RegistryError {}

impl Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum JsonErrorType {
    ParseError,
    UnreachableChild,
    UnexpectedNode(String),
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(JsonErrorType),
    Utf8(Utf8Error),
}

impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigError::Io(a), ConfigError::Io(b)) => a.kind() == b.kind(),
            (ConfigError::Json(a), ConfigError::Json(b)) => a == b,
            (ConfigError::Utf8(a), ConfigError::Utf8(b)) => a == b,
            _ => false,
        }
    }
}

impl std::error::Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read configuration: {}", err),
            ConfigError::Json(kind) => write!(f, "malformed configuration: {:?}", kind),
            ConfigError::Utf8(err) => write!(f, "configuration is not valid UTF-8: {}", err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<Utf8Error> for ConfigError {
    fn from(err: Utf8Error) -> Self {
        ConfigError::Utf8(err)
    }
}

/// Failures of an application thread's lifecycle.
#[derive(Debug)]
pub enum ThreadError {
    Registry(RegistryError),
    Spawn(std::io::Error),
    Suppressed(String),
    Init(String),
    Run(String),
    Panicked(String),
}

impl PartialEq for ThreadError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ThreadError::Registry(a), ThreadError::Registry(b)) => a == b,
            (ThreadError::Spawn(a), ThreadError::Spawn(b)) => a.kind() == b.kind(),
            (ThreadError::Suppressed(a), ThreadError::Suppressed(b)) => a == b,
            (ThreadError::Init(a), ThreadError::Init(b)) => a == b,
            (ThreadError::Run(a), ThreadError::Run(b)) => a == b,
            (ThreadError::Panicked(a), ThreadError::Panicked(b)) => a == b,
            _ => false,
        }
    }
}

impl std::error::Error for ThreadError {}

impl Display for ThreadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadError::Registry(err) => write!(f, "registry: {}", err),
            ThreadError::Spawn(err) => write!(f, "failed to spawn thread: {}", err),
            ThreadError::Suppressed(label) => write!(f, "thread {} is suppressed", label),
            ThreadError::Init(msg) => write!(f, "init failed: {}", msg),
            ThreadError::Run(msg) => write!(f, "run failed: {}", msg),
            ThreadError::Panicked(label) => write!(f, "thread {} panicked", label),
        }
    }
}

impl From<RegistryError> for ThreadError {
    fn from(err: RegistryError) -> Self {
        ThreadError::Registry(err)
    }
}

impl From<std::io::Error> for ThreadError {
    fn from(err: std::io::Error) -> Self {
        ThreadError::Spawn(err)
    }
}

/// Framing failures on the command interface. The decoder has already
/// dropped the offending bytes when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    InvalidLength(u32),
    BadEndMarker(u32),
}

impl std::error::Error for FrameError {}

impl Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::InvalidLength(length) => write!(f, "invalid message length: {}", length),
            FrameError::BadEndMarker(marker) => write!(f, "invalid end marker: 0x{:08X}", marker),
        }
    }
}
