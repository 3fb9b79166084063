//! Byte sink whose length can be observed from another task
//!
//! The copy loop owns the [`CountingSink`] and is its only writer. Observers
//! hold a [`ByteCounter`] and never touch the buffer itself, so the length
//! read by the sampler comes from a single atomic source of truth.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared read-only view of how many bytes a sink has accepted
#[derive(Debug, Clone, Default)]
pub struct ByteCounter(Arc<AtomicU64>);

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Release);
    }
}

/// Growing byte sink for a streamed response body
#[derive(Debug)]
pub struct CountingSink {
    buffer: Option<Vec<u8>>,
    counter: ByteCounter,
}

impl CountingSink {
    /// Sink that keeps every byte it receives
    pub fn retaining() -> Self {
        Self {
            buffer: Some(Vec::new()),
            counter: ByteCounter::new(),
        }
    }

    /// Sink that only counts bytes
    pub fn discarding() -> Self {
        Self {
            buffer: None,
            counter: ByteCounter::new(),
        }
    }

    pub fn counter(&self) -> ByteCounter {
        self.counter.clone()
    }

    pub fn write(&mut self, chunk: &[u8]) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.extend_from_slice(chunk);
        }
        self.counter.add(chunk.len() as u64);
    }

    pub fn len(&self) -> u64 {
        self.counter.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retained bytes, `None` for a discarding sink
    pub fn into_inner(self) -> Option<Vec<u8>> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retaining_sink_keeps_bytes() {
        let mut sink = CountingSink::retaining();
        let counter = sink.counter();
        sink.write(b"hello ");
        sink.write(b"world");
        assert_eq!(counter.get(), 11);
        assert_eq!(sink.len(), 11);
        assert_eq!(sink.into_inner().as_deref(), Some(&b"hello world"[..]));
    }

    #[test]
    fn test_discarding_sink_only_counts() {
        let mut sink = CountingSink::discarding();
        assert!(sink.is_empty());
        sink.write(&[0u8; 4096]);
        assert_eq!(sink.len(), 4096);
        assert!(sink.into_inner().is_none());
    }

    #[test]
    fn test_counter_observed_from_other_thread() {
        let mut sink = CountingSink::discarding();
        let counter = sink.counter();
        let observer = std::thread::spawn(move || {
            let mut last = 0;
            for _ in 0..1000 {
                let now = counter.get();
                assert!(now >= last);
                last = now;
            }
        });
        for _ in 0..1000 {
            sink.write(&[1, 2, 3]);
        }
        observer.join().unwrap();
        assert_eq!(sink.len(), 3000);
    }
}
