use std::sync::Mutex;

use super::EpochCondvar;
use crate::Value;

const SIZE: usize = 50;

#[derive(Debug)]
struct Buffer {
    items: [Value; SIZE],
    head: usize,
    tail: usize,
    count: usize,
}

/// A fixed-capacity FIFO that blocks instead of failing.
///
/// A circular buffer under one mutex, with two [`EpochCondvar`]s gating the
/// full and empty edges. `enqueue` on a full buffer and `dequeue` on an
/// empty one suspend the caller until the precondition holds; neither
/// operation ever reports an error.
#[derive(Debug)]
pub struct BoundedQueue {
    buffer: Mutex<Buffer>,
    not_full: EpochCondvar,
    not_empty: EpochCondvar,
}

impl Default for BoundedQueue {
    fn default() -> Self {
        Self {
            buffer: Mutex::new(Buffer {
                items: [0; SIZE],
                head: 0,
                tail: 0,
                count: 0,
            }),
            not_full: EpochCondvar::new(),
            not_empty: EpochCondvar::new(),
        }
    }
}

impl BoundedQueue {
    /// Number of elements the buffer can hold.
    pub const CAPACITY: usize = SIZE;

    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the back of the queue, blocking while it is full.
    pub fn enqueue(&self, value: Value) {
        let mut buf = self.buffer.lock().unwrap();
        while buf.count == SIZE {
            buf = self.not_full.wait(buf);
        }

        let tail = buf.tail;
        buf.items[tail] = value;
        buf.tail = (tail + 1) % SIZE;
        buf.count += 1;

        self.not_empty.signal();
    }

    /// Removes the value at the front of the queue, blocking while it is
    /// empty.
    pub fn dequeue(&self) -> Value {
        let mut buf = self.buffer.lock().unwrap();
        while buf.count == 0 {
            buf = self.not_empty.wait(buf);
        }

        let head = buf.head;
        let value = buf.items[head];
        buf.head = (head + 1) % SIZE;
        buf.count -= 1;

        self.not_full.signal();
        value
    }
}

#[cfg(test)]
mod test {
    use std::thread::scope;
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use super::*;

    /// One producer, one consumer: everything arrives, in order.
    #[test]
    fn spsc_round_trip() {
        const COUNT: usize = 1_000;

        let q = BoundedQueue::new();

        let received: Vec<Value> = scope(|s| {
            s.spawn(|| {
                for i in 0..COUNT {
                    q.enqueue(i as Value);
                }
            });

            let consumer = s.spawn(|| (0..COUNT).map(|_| q.dequeue()).collect::<Vec<_>>());
            consumer.join().unwrap()
        });

        let expected: Vec<Value> = (0..COUNT as Value).collect();
        assert_eq!(received, expected);
        assert_eq!(received.iter().sum::<Value>(), 499_500);
    }

    /// Filling the buffer makes the next enqueue block until a dequeue
    /// frees a slot.
    #[test]
    fn enqueue_blocks_when_full() {
        let q = BoundedQueue::new();
        for i in 0..BoundedQueue::CAPACITY {
            q.enqueue(i as Value);
        }

        let (tx, rx) = bounded(1);
        scope(|s| {
            s.spawn(|| {
                q.enqueue(-7);
                tx.send(()).unwrap();
            });

            // The buffer is full: the extra enqueue must still be parked.
            assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

            assert_eq!(q.dequeue(), 0);
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        });

        for i in 1..BoundedQueue::CAPACITY {
            assert_eq!(q.dequeue(), i as Value);
        }
        assert_eq!(q.dequeue(), -7);
    }
}
