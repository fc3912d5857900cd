#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crossbeam::channel::{bounded, unbounded, Sender};
    use logger::targets::{FileLogTarget, LogTarget};
    use logger::{start_consumer_thread, LogLevel, Logger};

    // Mock implementation of LogTarget for testing
    struct MockLogTarget {
        log_sender: Sender<String>,
    }

    impl MockLogTarget {
        fn new(sender: Sender<String>) -> Self {
            Self {
                log_sender: sender,
            }
        }
    }

    impl LogTarget for MockLogTarget {
        fn log(&self, _level: LogLevel, message: String) {
            // Send the log message to the channel
            let _ = self.log_sender.send(message);
        }
    }

    #[test]
    fn test_logger_creation() {
        let logger = Logger::new(LogLevel::Info, 10, Box::new(MockLogTarget::new(bounded(10).0)));
        assert_eq!(logger.get_log_level(), LogLevel::Info);
        assert_eq!(logger.queue().capacity(), 10);
        assert!(!logger.is_running());
    }

    #[test]
    fn test_update_severity_level() {
        let logger = Logger::new(LogLevel::Info, 10, Box::new(MockLogTarget::new(bounded(10).0)));
        logger.update_level(LogLevel::Debug);
        assert_eq!(logger.get_log_level(), LogLevel::Debug);
        assert!(logger.is_enabled(LogLevel::Debug));
        assert!(!logger.is_enabled(LogLevel::Trace));
    }

    #[test]
    fn test_direct_emission_without_writer() {
        let (sender, receiver) = unbounded();
        let logger = Logger::new(LogLevel::Info, 10, Box::new(MockLogTarget::new(sender)));
        logger.log(LogLevel::Info, "hello");
        let line = receiver.try_recv().unwrap();
        assert!(line.contains("hello"));
        assert!(line.contains("INFO"));
    }

    #[test]
    fn test_level_filtering() {
        let (sender, receiver) = unbounded();
        let logger = Logger::new(LogLevel::Warn, 10, Box::new(MockLogTarget::new(sender)));
        logger.log(LogLevel::Info, "dropped");
        logger.log(LogLevel::Error, "kept");
        assert!(receiver.try_recv().unwrap().contains("kept"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_writer_drains_queue() {
        let (sender, receiver) = unbounded();
        let logger = Arc::new(Logger::new(LogLevel::Info, 64, Box::new(MockLogTarget::new(sender))));
        let writer = start_consumer_thread(logger.clone(), Duration::from_millis(5)).unwrap();
        assert!(logger.is_running());

        for i in 0..20 {
            logger.log(LogLevel::Info, &format!("queued {}", i));
        }
        writer.flush();
        for i in 0..20 {
            let line = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
            assert!(line.ends_with(&format!("queued {}", i)));
        }

        writer.terminate();
        assert!(!logger.is_running());
        assert!(logger.queue().is_empty());
    }

    #[test]
    fn test_terminate_drains_pending_entries() {
        let (sender, receiver) = unbounded();
        let logger = Arc::new(Logger::new(LogLevel::Info, 64, Box::new(MockLogTarget::new(sender))));
        let writer = start_consumer_thread(logger.clone(), Duration::from_secs(60)).unwrap();
        logger.log(LogLevel::Warn, "last words");
        writer.terminate();
        let line = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(line.contains("last words"));
    }

    #[test]
    fn test_file_log_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.log");
        let logger = Logger::new(LogLevel::Info, 10, Box::new(FileLogTarget::new(&path).unwrap()));
        logger.log(LogLevel::Info, "first");
        logger.log(LogLevel::Error, "second");
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }

    #[test]
    fn test_file_target_flushed_by_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queued.log");
        let logger = Arc::new(Logger::new(LogLevel::Info, 64, Box::new(FileLogTarget::new(&path).unwrap())));
        let writer = start_consumer_thread(logger.clone(), Duration::from_millis(5)).unwrap();
        for n in 0..20 {
            logger.log(LogLevel::Info, &format!("queued {}", n));
        }
        writer.terminate();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 20);
        assert!(contents.lines().last().unwrap().ends_with("queued 19"));
    }

    #[test]
    fn test_mock_log_target() {
        let (sender, receiver) = bounded::<String>(10);
        let mock_target = MockLogTarget::new(sender);
        mock_target.log(LogLevel::Info, "Mock log message".to_string());
        assert_eq!(receiver.recv().unwrap(), "Mock log message");
    }

    #[test]
    fn test_log_level_order() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Info < LogLevel::Notice);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Critical < LogLevel::Fatal);
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" DEBUG ".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
