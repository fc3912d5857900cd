use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use error_handler::{RegistryError, ThreadError};
use logger::set_thread_label;
use message_queue::Message;
use thread_registry::{ThreadRegistry, ThreadState};

use crate::Shutdown;

/// The stages every application thread goes through.
///
/// `pre_create` runs on the spawning thread; the other hooks run on the new
/// thread in the order `init`, `run`, `exit`. `exit` runs even when `init`
/// or `run` fail.
pub trait ThreadLifecycle: Send + 'static {
    fn label(&self) -> &str;

    /// Capacity of the mailbox to attach to this thread, if it wants one.
    fn queue_capacity(&self) -> Option<usize> {
        None
    }

    fn pre_create(&mut self, _registry: &ThreadRegistry) -> Result<(), ThreadError> {
        Ok(())
    }

    fn init(&mut self, _ctx: &ThreadContext) -> Result<(), ThreadError> {
        Ok(())
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError>;

    fn exit(&mut self, _ctx: &ThreadContext) {}
}

/// What a running thread gets to see of the process.
pub struct ThreadContext {
    label: String,
    registry: Arc<ThreadRegistry>,
    shutdown: Shutdown,
}

impl ThreadContext {
    pub fn new(label: &str,
               registry: Arc<ThreadRegistry>,
               shutdown: Shutdown
    ) -> Self {
        ThreadContext { label: label.to_string(), registry, shutdown }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn shutdown_signalled(&self) -> bool {
        self.shutdown.is_signalled()
    }

    /// Takes the next message from this thread's own mailbox.
    pub fn pop_message(&self, timeout_ms: u32) -> Result<Message, RegistryError> {
        self.registry.pop_message(&self.label, timeout_ms)
    }

    pub fn push_to(&self,
                   label: &str,
                   message: &Message,
                   timeout_ms: u32
    ) -> Result<(), RegistryError> {
        self.registry.push_message(label, message, timeout_ms)
    }

    fn transition(&self, state: ThreadState) {
        if let Err(err) = self.registry.update_state(&self.label, state) {
            logger::warn!("Thread {} could not enter {}: {}", self.label, state, err);
        }
    }
}

pub struct AppThreadHandle {
    label: String,
    handle: JoinHandle<Result<(), ThreadError>>,
}

impl AppThreadHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<(), ThreadError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(ThreadError::Panicked(self.label)),
        }
    }
}

/// Comma separated, case-insensitive list of labels that must not start.
pub fn is_thread_suppressed(suppressed: &str, label: &str) -> bool {
    suppressed
        .split(',')
        .map(str::trim)
        .any(|candidate| !candidate.is_empty() && candidate.eq_ignore_ascii_case(label))
}

/// Registers `thread`, gives it a mailbox if it asks for one and starts it
/// on a named OS thread.
pub fn spawn_app_thread<T: ThreadLifecycle>(mut thread: T,
                                            registry: &Arc<ThreadRegistry>,
                                            shutdown: &Shutdown,
                                            auto_cleanup: bool
) -> Result<AppThreadHandle, ThreadError> {
    let label = thread.label().to_string();
    thread.pre_create(registry)?;

    registry.register(&label, None, auto_cleanup)?;
    if let Some(capacity) = thread.queue_capacity() {
        if let Err(err) = registry.init_queue(&label, capacity) {
            release_registration(registry, &label);
            return Err(err.into());
        }
    }

    let ctx = ThreadContext::new(&label, registry.clone(), shutdown.clone());
    let spawned = thread::Builder::new()
        .name(label.clone())
        .spawn(move || run_lifecycle(thread, ctx));

    match spawned {
        Ok(handle) => {
            registry.attach_handle(&label, handle.thread().id())?;
            Ok(AppThreadHandle { label, handle })
        }
        Err(err) => {
            logger::error!("Failed to spawn thread {}: {}", label, err);
            release_registration(registry, &label);
            Err(ThreadError::Spawn(err))
        }
    }
}

/// Drops the entry of a thread that never started so its label can be
/// registered again.
fn release_registration(registry: &ThreadRegistry, label: &str) {
    if let Err(err) = registry.deregister(label) {
        logger::warn!("Could not release registration of {}: {}", label, err);
    }
}

fn run_lifecycle<T: ThreadLifecycle>(mut thread: T, ctx: ThreadContext) -> Result<(), ThreadError> {
    set_thread_label(ctx.label());
    logger::debug!("Thread {} starting", ctx.label());

    let result = thread.init(&ctx).and_then(|()| {
        ctx.transition(ThreadState::Running);
        thread.run(&ctx)
    });

    match &result {
        Ok(()) => ctx.transition(ThreadState::Stopping),
        Err(err) => {
            logger::error!("Thread {} failed: {}", ctx.label(), err);
            ctx.transition(ThreadState::Error);
        }
    }

    thread.exit(&ctx);

    if result.is_ok() {
        ctx.transition(ThreadState::Terminated);
    }
    logger::debug!("Thread {} finished", ctx.label());
    result
}

#[cfg(test)]
mod tests {
    use super::{is_thread_suppressed, release_registration};
    use thread_registry::ThreadRegistry;

    #[test]
    fn released_label_can_register_again() {
        let registry = ThreadRegistry::new();
        registry.register("WORKER", None, false).unwrap();
        registry.init_queue("WORKER", 4).unwrap();

        release_registration(&registry, "WORKER");
        assert!(registry.get_state("WORKER").is_none());
        registry.register("WORKER", None, false).unwrap();

        // releasing twice only warns
        release_registration(&registry, "WORKER");
        release_registration(&registry, "WORKER");
        assert!(registry.get_state("WORKER").is_none());
    }

    #[test]
    fn suppression_list_matching() {
        assert!(is_thread_suppressed("FILE_READER, client.send", "CLIENT.SEND"));
        assert!(is_thread_suppressed("FILE_READER", "file_reader"));
        assert!(!is_thread_suppressed("FILE_READER_2", "FILE_READER"));
        assert!(!is_thread_suppressed("", "MAIN"));
        assert!(!is_thread_suppressed(" , ", "MAIN"));
    }
}
