#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use error_handler::RegistryError;
    use message_queue::{Message, MessageType, MESSAGE_CONTENT_SIZE};
    use thread_registry::{ThreadRegistry, ThreadState};

    fn message(text: &str) -> Message {
        Message::new(MessageType::Test, text.as_bytes()).unwrap()
    }

    #[test]
    fn test_register_and_find() {
        let registry = ThreadRegistry::new();
        let handle = thread::current().id();
        registry.register("WORKER", Some(handle), true).unwrap();

        let by_label = registry.find_by_label("WORKER").unwrap();
        assert_eq!(by_label.state, ThreadState::Created);
        assert!(by_label.auto_cleanup);
        assert!(!by_label.has_queue);
        assert_eq!(registry.find_by_handle(handle).unwrap().label, "WORKER");
        assert!(registry.is_registered("WORKER"));
        assert!(registry.find_by_label("OTHER").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = ThreadRegistry::new();
        registry.register("WORKER", None, true).unwrap();
        assert_eq!(registry.register("WORKER", None, false), Err(RegistryError::DuplicateThread));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_invalid_labels() {
        let registry = ThreadRegistry::new();
        assert_eq!(registry.register("", None, true), Err(RegistryError::InvalidArgs));
        let long = "L".repeat(64);
        assert_eq!(registry.register(&long, None, true), Err(RegistryError::InvalidArgs));
    }

    #[test]
    fn test_state_machine() {
        let registry = ThreadRegistry::new();
        registry.register("WORKER", None, true).unwrap();
        assert_eq!(registry.update_state("WORKER", ThreadState::Stopping),
                   Err(RegistryError::InvalidStateTransition));
        registry.update_state("WORKER", ThreadState::Running).unwrap();
        assert_eq!(registry.update_state("WORKER", ThreadState::Created),
                   Err(RegistryError::InvalidStateTransition));
        registry.update_state("WORKER", ThreadState::Stopping).unwrap();
        registry.update_state("WORKER", ThreadState::Terminated).unwrap();
        assert_eq!(registry.update_state("WORKER", ThreadState::Error),
                   Err(RegistryError::InvalidStateTransition));
        assert_eq!(registry.get_state("WORKER"), Some(ThreadState::Terminated));
        assert_eq!(registry.update_state("MISSING", ThreadState::Running),
                   Err(RegistryError::InvalidStateTransition));
    }

    #[test]
    fn test_deregister() {
        let registry = ThreadRegistry::new();
        registry.register("AUTO", None, true).unwrap();
        registry.register("MANUAL", None, false).unwrap();
        registry.init_queue("AUTO", 8).unwrap();
        registry.init_queue("MANUAL", 8).unwrap();
        registry.push_message("MANUAL", &message("kept"), 0).unwrap();

        assert!(registry.deregister("AUTO").unwrap().is_none());
        let queue = registry.deregister("MANUAL").unwrap().unwrap();
        assert_eq!(queue.pop(0).unwrap().payload(), b"kept");

        assert_eq!(registry.deregister("AUTO").err(), Some(RegistryError::NotFound));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_queue_by_label() {
        let registry = ThreadRegistry::new();
        registry.register("WORKER", None, true).unwrap();
        assert_eq!(registry.push_message("WORKER", &message("x"), 0), Err(RegistryError::QueueError));
        assert_eq!(registry.push_message("NOBODY", &message("x"), 0), Err(RegistryError::NotFound));

        registry.init_queue("WORKER", 3).unwrap();
        assert_eq!(registry.init_queue("WORKER", 3), Err(RegistryError::QueueError));

        registry.push_message("WORKER", &message("one"), 0).unwrap();
        registry.push_message("WORKER", &message("two"), 0).unwrap();
        assert_eq!(registry.push_message("WORKER", &message("three"), 0), Err(RegistryError::QueueFull));
        assert_eq!(registry.queue_size("WORKER"), Ok(2));

        assert_eq!(registry.pop_message("WORKER", 0).unwrap().payload(), b"one");
        registry.clear_queue("WORKER").unwrap();
        assert_eq!(registry.pop_message("WORKER", 0), Err(RegistryError::QueueEmpty));
    }

    #[test]
    fn test_relay_round_trip() {
        let registry = ThreadRegistry::new();
        for label in ["SERVER.SEND", "CLIENT.SEND"] {
            registry.register(label, None, true).unwrap();
            registry.init_queue(label, 16).unwrap();
        }
        registry.setup_relay("SERVER.SEND", "CLIENT.SEND").unwrap();
        assert_eq!(registry.find_by_label("SERVER.SEND").unwrap().relay_target.as_deref(), Some("CLIENT.SEND"));

        let server_port = registry.relay_port("SERVER.SEND").unwrap();
        let client_port = registry.relay_port("CLIENT.SEND").unwrap();

        assert_eq!(server_port.forward(b"from server side", 100), Ok(1));
        let relayed = registry.pop_message("CLIENT.SEND", 100).unwrap();
        assert_eq!(relayed.message_type(), MessageType::Relay);
        assert_eq!(relayed.payload(), b"from server side");

        let large: Vec<u8> = (0..MESSAGE_CONTENT_SIZE + 10).map(|i| i as u8).collect();
        assert_eq!(client_port.forward(&large, 100), Ok(2));
        let first = registry.pop_message("SERVER.SEND", 100).unwrap();
        let second = registry.pop_message("SERVER.SEND", 100).unwrap();
        assert_eq!([first.payload(), second.payload()].concat(), large);
    }

    #[test]
    fn test_relay_requires_queues() {
        let registry = ThreadRegistry::new();
        registry.register("A", None, true).unwrap();
        registry.register("B", None, true).unwrap();
        registry.init_queue("A", 4).unwrap();
        assert_eq!(registry.setup_relay("A", "B"), Err(RegistryError::QueueError));
        assert_eq!(registry.setup_relay("A", "C"), Err(RegistryError::NotFound));
        assert_eq!(registry.setup_relay("A", "A"), Err(RegistryError::InvalidArgs));
        assert_eq!(registry.relay_port("A").unwrap().forward(b"nowhere", 0), Ok(0));
    }

    #[test]
    fn test_deregister_disconnects_relay() {
        let registry = ThreadRegistry::new();
        for label in ["A", "B"] {
            registry.register(label, None, true).unwrap();
            registry.init_queue(label, 4).unwrap();
        }
        registry.setup_relay("A", "B").unwrap();
        let port_a = registry.relay_port("A").unwrap();
        registry.deregister("B").unwrap();
        assert!(!port_a.is_connected());
    }

    #[test]
    fn test_teardown_relay() {
        let registry = ThreadRegistry::new();
        for label in ["A", "B"] {
            registry.register(label, None, true).unwrap();
            registry.init_queue(label, 4).unwrap();
        }
        registry.setup_relay("A", "B").unwrap();
        registry.teardown_relay("A").unwrap();
        assert!(!registry.relay_port("A").unwrap().is_connected());
        assert!(!registry.relay_port("B").unwrap().is_connected());
    }

    #[test]
    fn test_wait_for_thread() {
        let registry = Arc::new(ThreadRegistry::new());
        registry.register("WORKER", None, true).unwrap();
        assert_eq!(registry.wait_for_thread("WORKER", Duration::from_millis(10)), Err(RegistryError::Timeout));

        let worker = {
            let registry = registry.clone();
            thread::spawn(move || {
                registry.update_state("WORKER", ThreadState::Running).unwrap();
                thread::sleep(Duration::from_millis(20));
                registry.update_state("WORKER", ThreadState::Error).unwrap();
            })
        };
        registry.wait_for_thread("WORKER", Duration::from_secs(2)).unwrap();
        worker.join().unwrap();
        assert_eq!(registry.wait_for_thread("NOBODY", Duration::ZERO), Err(RegistryError::NotFound));
    }

    #[test]
    fn test_wait_all_skips_caller() {
        let registry = ThreadRegistry::new();
        let me = thread::current().id();
        registry.register("MAIN", Some(me), false).unwrap();
        registry.register("WORKER", None, true).unwrap();
        assert_eq!(registry.wait_all(Duration::from_millis(30), Some(me)), Err(RegistryError::Timeout));

        registry.update_state("WORKER", ThreadState::Running).unwrap();
        registry.update_state("WORKER", ThreadState::Stopping).unwrap();
        registry.update_state("WORKER", ThreadState::Terminated).unwrap();
        registry.wait_all(Duration::from_millis(30), Some(me)).unwrap();
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_cleanup() {
        let registry = ThreadRegistry::new();
        registry.register("WORKER", None, true).unwrap();
        registry.init_queue("WORKER", 4).unwrap();
        let queue = registry.queue("WORKER").unwrap();
        assert!(queue.push(&message("pending"), 0));

        registry.cleanup().unwrap();
        assert!(queue.is_empty());
        assert_eq!(registry.register("LATE", None, true), Err(RegistryError::NotInitialized));
        assert_eq!(registry.pop_message("WORKER", 0), Err(RegistryError::NotInitialized));
        assert!(registry.labels().is_empty());
    }
}
