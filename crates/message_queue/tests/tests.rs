#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use message_queue::{Message, MessageQueue, MessageType, MAX_QUEUE_CAPACITY};

    fn data(byte: u8) -> Message {
        Message::new(MessageType::Data, &[byte; 8]).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new("TEST", 16);
        for i in 0..10 {
            assert!(queue.push(&data(i), 0));
        }
        assert_eq!(queue.current_size(), 10);
        for i in 0..10 {
            assert_eq!(queue.pop(0).unwrap().payload(), &[i; 8]);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_holds_capacity_minus_one() {
        let queue = MessageQueue::new("TEST", 4);
        assert!(queue.push(&data(1), 0));
        assert!(queue.push(&data(2), 0));
        assert!(queue.push(&data(3), 0));
        assert!(queue.is_full());
        assert!(!queue.push(&data(4), 0));
        assert_eq!(queue.current_size(), 3);
    }

    #[test]
    fn test_zero_timeout_returns_promptly() {
        let queue = MessageQueue::new("TEST", 2);
        let started = Instant::now();
        assert!(queue.pop(0).is_none());
        assert!(started.elapsed() < Duration::from_millis(5));

        assert!(queue.push(&data(1), 0));
        let started = Instant::now();
        assert!(!queue.push(&data(2), 0));
        assert!(started.elapsed() < Duration::from_millis(5));
    }

    #[test]
    fn test_timeout_expires() {
        let queue = MessageQueue::new("TEST", 4);
        let started = Instant::now();
        assert!(queue.pop(50).is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_pop_succeeds_when_push_arrives_within_timeout() {
        let queue = Arc::new(MessageQueue::new("TEST", 4));
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                assert!(queue.push(&data(42), 0));
            })
        };
        let message = queue.pop(200).unwrap();
        assert_eq!(message.payload(), &[42; 8]);
        producer.join().unwrap();
    }

    #[test]
    fn test_push_succeeds_when_pop_frees_room_within_timeout() {
        let queue = Arc::new(MessageQueue::new("TEST", 2));
        assert!(queue.push(&data(1), 0));
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                queue.pop(0).unwrap()
            })
        };
        assert!(queue.push(&data(2), 200));
        assert_eq!(consumer.join().unwrap().payload(), &[1; 8]);
        assert_eq!(queue.pop(0).unwrap().payload(), &[2; 8]);
    }

    #[test]
    fn test_many_producers_one_consumer() {
        let queue = Arc::new(MessageQueue::new("TEST", 8));
        let producers: Vec<_> = (0..4u8)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..50u8 {
                        let message = Message::new(MessageType::Test, &[p, i]).unwrap();
                        assert!(queue.push(&message, 2000));
                    }
                })
            })
            .collect();

        let mut last = [None::<u8>; 4];
        for _ in 0..200 {
            let message = queue.pop(2000).unwrap();
            let (p, i) = (message.payload()[0] as usize, message.payload()[1]);
            if let Some(previous) = last[p] {
                assert!(i > previous);
            }
            last[p] = Some(i);
        }
        for producer in producers {
            producer.join().unwrap();
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let queue = MessageQueue::new("TEST", 4);
        queue.push(&data(1), 0);
        queue.push(&data(2), 0);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.current_size(), 0);
        assert!(queue.push(&data(3), 0));
        assert_eq!(queue.pop(0).unwrap().payload(), &[3; 8]);
    }

    #[test]
    fn test_capacity_is_clamped() {
        assert_eq!(MessageQueue::new("TEST", 0).capacity(), 2);
        assert_eq!(MessageQueue::new("TEST", MAX_QUEUE_CAPACITY * 2).capacity(), MAX_QUEUE_CAPACITY);
        assert_eq!(MessageQueue::new("TEST", 100).owner(), "TEST");
    }

    #[test]
    fn test_oversized_header_is_rejected() {
        let queue = MessageQueue::new("TEST", 4);
        let mut message = data(1);
        message.header.content_size = 4096;
        assert!(!queue.push(&message, 0));
        assert!(queue.is_empty());
    }
}
