#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    Created,
    Running,
    Stopping,
    Terminated,
    Error,
}

impl ThreadState {
    /// Only forward moves are legal. `Error` can be entered from any state
    /// that is not terminal.
    pub fn can_transition_to(self, next: ThreadState) -> bool {
        use ThreadState::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Running, Stopping)
                | (Stopping, Terminated)
                | (Created | Running | Stopping, Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ThreadState::Terminated | ThreadState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreadState::Created => "CREATED",
            ThreadState::Running => "RUNNING",
            ThreadState::Stopping => "STOPPING",
            ThreadState::Terminated => "TERMINATED",
            ThreadState::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for ThreadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
