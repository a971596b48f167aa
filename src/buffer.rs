//! ==============================================================================
//! buffer.rs - bounded most-recent-N reading table
//! ==============================================================================
//!
//! purpose:
//!     holds the last `capacity` readings in arrival order. writers are the
//!     tcp connection handlers and the simulator; the reader is the periodic
//!     refresh loop (and the json api).
//!
//! sharing:
//!     ReadingBuffer is a plain owned ring. SharedBuffer wraps it in
//!     arc<rwlock<>> so every task gets a cheap clone of the same table:
//!     - writers take the write lock for one push
//!     - readers take the read lock just long enough to copy a snapshot
//!
//! ==============================================================================

use crate::domain::{IngestStats, Reading};
use crate::protocol::{self, ParseError};

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug)]
pub struct ReadingBuffer {
    rows: VecDeque<Reading>,
    capacity: usize,
    stats: IngestStats,
}

impl ReadingBuffer {
    /// `capacity` is clamped to at least one row
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
            stats: IngestStats::default(),
        }
    }

    /// validate and insert one wire line
    ///
    /// on error the table is left exactly as it was and only the
    /// rejected counter moves.
    pub fn append(&mut self, line: &str, timestamp_ms: u64) -> Result<Reading, ParseError> {
        match protocol::parse_line(line, timestamp_ms) {
            Ok(reading) => {
                self.push(reading);
                Ok(reading)
            }
            Err(e) => {
                self.stats.rejected += 1;
                Err(e)
            }
        }
    }

    /// insert a reading, evicting the oldest rows beyond capacity
    pub fn push(&mut self, reading: Reading) {
        self.rows.push_back(reading);
        while self.rows.len() > self.capacity {
            self.rows.pop_front();
        }
        self.stats.accepted += 1;
    }

    /// count a line that was dropped before it could be parsed
    pub fn record_rejected(&mut self) {
        self.stats.rejected += 1;
    }

    /// oldest-first copy of the table
    pub fn snapshot(&self) -> Vec<Reading> {
        self.rows.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// maximum rows kept; never zero
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }
}

impl Default for ReadingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// clone-able handle to one shared ReadingBuffer
#[derive(Clone, Debug)]
pub struct SharedBuffer {
    inner: Arc<RwLock<ReadingBuffer>>,
}

impl SharedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ReadingBuffer::new(capacity))),
        }
    }

    pub async fn append(&self, line: &str, timestamp_ms: u64) -> Result<Reading, ParseError> {
        self.inner.write().await.append(line, timestamp_ms)
    }

    pub async fn push(&self, reading: Reading) {
        self.inner.write().await.push(reading);
    }

    pub async fn record_rejected(&self) {
        self.inner.write().await.record_rejected();
    }

    pub async fn snapshot(&self) -> Vec<Reading> {
        self.inner.read().await.snapshot()
    }

    /// snapshot and counters taken under one read lock
    pub async fn snapshot_with_stats(&self) -> (Vec<Reading>, IngestStats) {
        let guard = self.inner.read().await;
        (guard.snapshot(), guard.stats())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn capacity(&self) -> usize {
        self.inner.read().await.capacity()
    }

    pub async fn stats(&self) -> IngestStats {
        self.inner.read().await.stats()
    }
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32) -> String {
        let v = n as f64;
        format!("{v},{v},{v},{v},{v},{v},{v},{v},{v},{v}")
    }

    #[test]
    fn test_append_well_formed() {
        let mut buf = ReadingBuffer::default();
        let r = buf
            .append("20.0,21.0,22.0,23.0,40.0,41.0,42.0,50.0,51.0,21.5", 7)
            .unwrap();
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.snapshot(), vec![r]);
        assert_eq!(r.temperature_lm35_1, 22.0);
        assert_eq!(r.humidity_dht22, 50.0);
        assert_eq!(buf.stats(), IngestStats { accepted: 1, rejected: 0 });
    }

    #[test]
    fn test_append_malformed_leaves_buffer_unchanged() {
        let mut buf = ReadingBuffer::default();
        buf.append(&line(1), 1).unwrap();
        let before = buf.snapshot();

        assert!(buf.append("1,2,3", 2).is_err());
        assert!(buf.append("1,2,3,4,5,6,7,8,9,x", 3).is_err());
        assert!(buf.append(&format!("{},11", line(2)), 4).is_err());

        assert_eq!(buf.len(), 1);
        assert_eq!(buf.snapshot(), before);
        assert_eq!(buf.stats(), IngestStats { accepted: 1, rejected: 3 });
    }

    #[test]
    fn test_evicts_oldest_past_capacity() {
        let mut buf = ReadingBuffer::default();
        for n in 0..101 {
            buf.append(&line(n), n as u64).unwrap();
        }
        assert_eq!(buf.len(), 100);

        let snap = buf.snapshot();
        assert!(snap.iter().all(|r| r.timestamp_ms != 0));
        assert_eq!(snap.first().map(|r| r.timestamp_ms), Some(1));
        assert_eq!(snap.last().map(|r| r.timestamp_ms), Some(100));
        assert_eq!(snap.last().map(|r| r.temperature_dht22), Some(100.0));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut buf = ReadingBuffer::new(3);
        buf.append(&line(1), 1).unwrap();
        let snap = buf.snapshot();
        buf.append(&line(2), 2).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buf = ReadingBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        assert!(buf.is_empty());
        buf.append(&line(1), 1).unwrap();
        buf.append(&line(2), 2).unwrap();
        assert_eq!(buf.snapshot().len(), 1);
        assert_eq!(buf.snapshot()[0].timestamp_ms, 2);
    }

    #[tokio::test]
    async fn test_shared_buffer_concurrent_writers() {
        let shared = SharedBuffer::new(50);
        let mut handles = Vec::new();
        for w in 0..4u32 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25u32 {
                    shared.append(&line(w * 100 + i), 0).await.unwrap();
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(shared.len().await, 50);
        assert_eq!(shared.capacity().await, 50);
        assert!(!shared.is_empty().await);
        assert_eq!(shared.stats().await.accepted, 100);
    }

    #[tokio::test]
    async fn test_shared_buffer_rejects() {
        let shared = SharedBuffer::default();
        assert!(shared.append("nope", 0).await.is_err());
        shared.record_rejected().await;
        let (snap, stats) = shared.snapshot_with_stats().await;
        assert!(snap.is_empty());
        assert_eq!(stats.rejected, 2);
    }
}
