// src/acquisition/ring_buffer.rs
//! Fixed-capacity pre-trigger history

use crate::config::constants::buffers::HISTORY_CAPACITY;
use crate::hal::types::Sample;

/// Circular FIFO over a fixed array.
///
/// When full, new samples are refused and counted as dropped; whatever is
/// already stored is kept. `head` is the next write slot, `tail` the oldest
/// unread sample, and `count` the number of unread samples.
#[derive(Debug, Clone)]
pub struct SampleRingBuffer<const N: usize = HISTORY_CAPACITY> {
    slots: [Sample; N],
    head: usize,
    tail: usize,
    count: usize,
    dropped: u64,
}

impl<const N: usize> SampleRingBuffer<N> {
    pub fn new() -> Self {
        Self {
            slots: [Sample::default(); N],
            head: 0,
            tail: 0,
            count: 0,
            dropped: 0,
        }
    }

    /// Store a sample, or hand it back if there is no room
    pub fn try_push(&mut self, sample: Sample) -> Result<(), Sample> {
        if self.count == N {
            self.dropped += 1;
            return Err(sample);
        }

        self.slots[self.head] = sample;
        self.head = (self.head + 1) % N;
        self.count += 1;
        Ok(())
    }

    /// Remove the oldest sample
    pub fn pop(&mut self) -> Option<Sample> {
        if self.count == 0 {
            return None;
        }

        let sample = self.slots[self.tail];
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        Some(sample)
    }

    /// Pop everything, oldest first. Samples not consumed from the iterator
    /// are still removed when it is dropped.
    pub fn drain(&mut self) -> Drain<'_, N> {
        Drain { buffer: self }
    }

    /// Discard all stored samples without reading them
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == N
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Samples refused because the buffer was full, since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Fill level, 0.0 to 1.0
    pub fn utilization(&self) -> f32 {
        if N == 0 {
            return 0.0;
        }
        self.count as f32 / N as f32
    }
}

impl<const N: usize> Default for SampleRingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Draining iterator returned by [`SampleRingBuffer::drain`]
pub struct Drain<'a, const N: usize> {
    buffer: &'a mut SampleRingBuffer<N>,
}

impl<const N: usize> Iterator for Drain<'_, N> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        self.buffer.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.buffer.len(), Some(self.buffer.len()))
    }
}

impl<const N: usize> ExactSizeIterator for Drain<'_, N> {}

impl<const N: usize> Drop for Drain<'_, N> {
    fn drop(&mut self) {
        self.buffer.clear();
    }
}
