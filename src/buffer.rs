use ringbuffer::{AllocRingBuffer, RingBuffer};


/// Sliding window over the last `capacity` frames. Oldest values are dropped first.
///
/// Only the processing thread writes into the buffer. Readers get a copy
/// of the whole window so a computation never sees it change underneath.
#[derive(Debug)]
pub struct FrameBuffer<T> {
    items: AllocRingBuffer<T>,
}

impl<T: Clone> FrameBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "FrameBuffer capacity must be positive");
        Self { items: AllocRingBuffer::new(capacity) }
    }

    pub fn append(&mut self, value: T) {
        self.items.push(value);
    }

    pub fn is_full(&self) -> bool {
        self.items.is_full()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Copy of the window, oldest value first
    pub fn snapshot(&self) -> Vec<T> {
        self.items.to_vec()
    }
}

/// ------------------------------------------------------------------------------------------------
/// Module unit tests
/// ------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill() {
        let mut buffer = FrameBuffer::new(4);
        assert!(buffer.is_empty());
        for v in 0..3 {
            buffer.append(v);
        }
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.is_full());
        buffer.append(3);
        assert!(buffer.is_full());
        assert_eq!(buffer.snapshot(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_evict_oldest() {
        let mut buffer = FrameBuffer::new(128);
        for v in 0..300 {
            buffer.append(v);
        }
        assert_eq!(buffer.len(), 128);
        assert_eq!(buffer.capacity(), 128);
        assert!(buffer.is_full());
        let expected: Vec<i32> = (172..300).collect();
        assert_eq!(buffer.snapshot(), expected);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buffer = FrameBuffer::new(2);
        buffer.append(1.0);
        let snapshot = buffer.snapshot();
        buffer.append(2.0);
        buffer.append(3.0);
        assert_eq!(snapshot, vec![1.0]);
        assert_eq!(buffer.snapshot(), vec![2.0, 3.0]);
    }
}
