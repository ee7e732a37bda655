//! Snapshot-at-the-beginning buffers.
//!
//! While concurrent marking is running, the barriers record every reference that is about to be
//! overwritten, so that the marker still traces everything that was reachable when marking
//! started.  Records go to a buffer owned by the mutator ([`SatbBuffer`]).  A full buffer is
//! handed to the shared [`SatbQueueSet`] as one completed buffer, where the marker picks it up.

use crossbeam::queue::SegQueue;

use crate::util::ObjectReference;

/// A thread-local buffer of snapshot entries with a fixed capacity.
pub struct SatbBuffer {
    buffer: Vec<ObjectReference>,
    capacity: usize,
}

impl SatbBuffer {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            buffer: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    /// Record an entry.  The caller flushes the buffer when it becomes full.
    #[inline(always)]
    pub fn push(&mut self, object: ObjectReference) {
        if self.buffer.is_empty() {
            self.buffer.reserve(self.capacity);
        }
        self.buffer.push(object);
    }

    /// Take the entries out of the buffer, leaving it empty.
    pub fn take(&mut self) -> Vec<ObjectReference> {
        std::mem::take(&mut self.buffer)
    }

    /// The entries not yet flushed.
    pub fn entries(&self) -> &[ObjectReference] {
        &self.buffer
    }
}

/// The pool of completed snapshot buffers shared by all mutators.
///
/// Mutators push, the marker pops.  Both sides are lock-free.
#[derive(Default)]
pub struct SatbQueueSet {
    completed: SegQueue<Vec<ObjectReference>>,
}

impl SatbQueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand over a completed buffer.  Empty buffers are dropped.
    pub fn push_buffer(&self, buffer: Vec<ObjectReference>) {
        if buffer.is_empty() {
            return;
        }
        debug!("SATB buffer of {} entries completed", buffer.len());
        self.completed.push(buffer);
    }

    /// Take one completed buffer, if any.
    pub fn pop_completed_buffer(&self) -> Option<Vec<ObjectReference>> {
        self.completed.pop()
    }

    /// The number of completed buffers waiting to be processed.
    pub fn completed_buffers(&self) -> usize {
        self.completed.len()
    }

    /// Take all completed buffers and return their entries in the order the buffers completed.
    pub fn drain(&self) -> Vec<ObjectReference> {
        let mut entries = vec![];
        while let Some(mut buffer) = self.completed.pop() {
            entries.append(&mut buffer);
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Address;

    fn object(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) }).unwrap()
    }

    #[test]
    fn buffer_fills_to_capacity() {
        let mut buffer = SatbBuffer::new(3);
        assert!(buffer.is_empty());
        buffer.push(object(0x1000));
        buffer.push(object(0x2000));
        assert!(!buffer.is_full());
        buffer.push(object(0x1000));
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 3);

        let entries = buffer.take();
        assert_eq!(entries, vec![object(0x1000), object(0x2000), object(0x1000)]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn queue_set_drains_in_completion_order() {
        let queues = SatbQueueSet::new();
        queues.push_buffer(vec![object(0x1000)]);
        queues.push_buffer(vec![]);
        queues.push_buffer(vec![object(0x2000), object(0x3000)]);
        assert_eq!(queues.completed_buffers(), 2);
        assert_eq!(
            queues.drain(),
            vec![object(0x1000), object(0x2000), object(0x3000)]
        );
        assert_eq!(queues.pop_completed_buffer(), None);
    }

    #[test]
    fn concurrent_producers() {
        let queues = std::sync::Arc::new(SatbQueueSet::new());
        let handles: Vec<_> = (1..=4usize)
            .map(|t| {
                let queues = queues.clone();
                std::thread::spawn(move || {
                    for i in 0..100usize {
                        queues.push_buffer(vec![object((t << 20) + (i << 3) + 8)]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queues.completed_buffers(), 400);
        assert_eq!(queues.drain().len(), 400);
    }
}
