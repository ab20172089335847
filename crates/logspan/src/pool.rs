// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reusable storage for records and batches.
//!
//! Loggers take batch vectors from here when a buffer is swapped out on
//! flush and give them back once the batch has been written. Free lists are
//! bounded so an idle pool never holds more than a few dozen allocations.

use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::record::Record;

/// Batches that grew past this capacity are dropped instead of pooled.
pub const MAX_POOLED_BATCH_CAPACITY: usize = 1024;

/// Records whose message buffer grew past this many bytes are dropped
/// instead of pooled.
pub const MAX_POOLED_MESSAGE_CAPACITY: usize = 4096;

const MAX_IDLE_RECORDS: usize = 256;
const MAX_IDLE_BATCHES: usize = 32;

#[derive(Debug)]
pub struct Pool {
    records: Mutex<Vec<Record>>,
    batches: Mutex<Vec<Vec<Record>>>,
    max_idle_records: usize,
    max_idle_batches: usize,
}

impl Default for Pool {
    fn default() -> Self {
        Self::with_limits(MAX_IDLE_RECORDS, MAX_IDLE_BATCHES)
    }
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_idle_records: usize, max_idle_batches: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            max_idle_records,
            max_idle_batches,
        }
    }

    pub fn global() -> &'static Pool {
        static GLOBAL: OnceLock<Pool> = OnceLock::new();
        GLOBAL.get_or_init(Pool::new)
    }

    /// A record with every field at its zero value.
    pub fn acquire_record(&self) -> Record {
        self.records.lock().pop().unwrap_or_default()
    }

    pub fn release_record(&self, mut record: Record) {
        if record.message.capacity() > MAX_POOLED_MESSAGE_CAPACITY {
            return;
        }
        record.reset();
        let mut records = self.records.lock();
        if records.len() < self.max_idle_records {
            records.push(record);
        }
    }

    /// An empty batch, possibly with capacity left over from earlier use.
    pub fn acquire_batch(&self) -> Vec<Record> {
        self.batches.lock().pop().unwrap_or_default()
    }

    /// Releases every record in `batch`, then the batch itself unless its
    /// capacity exceeds [`MAX_POOLED_BATCH_CAPACITY`].
    pub fn release_batch(&self, mut batch: Vec<Record>) {
        for record in batch.drain(..) {
            self.release_record(record);
        }
        if batch.capacity() > MAX_POOLED_BATCH_CAPACITY {
            return;
        }
        let mut batches = self.batches.lock();
        if batches.len() < self.max_idle_batches {
            batches.push(batch);
        }
    }

    pub fn idle_records(&self) -> usize {
        self.records.lock().len()
    }

    pub fn idle_batches(&self) -> usize {
        self.batches.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Severity;

    #[test]
    fn test_released_record_is_reset() {
        let pool = Pool::new();
        let record = Record::new(Severity::Error, "payment failed").with_field("card", "visa");
        pool.release_record(record);
        assert_eq!(pool.idle_records(), 1);

        let record = pool.acquire_record();
        assert_eq!(record, Record::default());
        assert_eq!(pool.idle_records(), 0);
    }

    #[test]
    fn test_oversized_message_is_not_pooled() {
        let pool = Pool::new();
        let large = "x".repeat(MAX_POOLED_MESSAGE_CAPACITY + 1);
        pool.release_record(Record::new(Severity::Info, large));
        assert_eq!(pool.idle_records(), 0);

        let mut batch = pool.acquire_batch();
        batch.push(Record::new(Severity::Info, "x".repeat(1 << 20)));
        batch.push(Record::new(Severity::Info, "small"));
        pool.release_batch(batch);
        assert_eq!(pool.idle_records(), 1);
        assert!(pool.acquire_record().message.capacity() <= MAX_POOLED_MESSAGE_CAPACITY);
    }

    #[test]
    fn test_batch_reuse_keeps_capacity() {
        let pool = Pool::new();
        let mut batch = pool.acquire_batch();
        batch.push(Record::new(Severity::Info, "a"));
        batch.push(Record::new(Severity::Info, "b"));
        let capacity = batch.capacity();

        pool.release_batch(batch);
        assert_eq!(pool.idle_batches(), 1);
        assert_eq!(pool.idle_records(), 2);

        let batch = pool.acquire_batch();
        assert!(batch.is_empty());
        assert_eq!(batch.capacity(), capacity);
    }

    #[test]
    fn test_oversized_batch_is_dropped() {
        let pool = Pool::new();
        pool.release_batch(Vec::with_capacity(MAX_POOLED_BATCH_CAPACITY + 1));
        assert_eq!(pool.idle_batches(), 0);

        pool.release_batch(Vec::with_capacity(MAX_POOLED_BATCH_CAPACITY));
        assert_eq!(pool.idle_batches(), 1);
    }

    #[test]
    fn test_free_lists_are_bounded() {
        let pool = Pool::with_limits(2, 1);
        for i in 0..5 {
            pool.release_record(Record::new(Severity::Info, format!("{i}")));
            pool.release_batch(Vec::with_capacity(4));
        }
        assert_eq!(pool.idle_records(), 2);
        assert_eq!(pool.idle_batches(), 1);
    }

    #[test]
    fn test_empty_pool_allocates() {
        let pool = Pool::with_limits(0, 0);
        assert_eq!(pool.acquire_record(), Record::default());
        assert!(pool.acquire_batch().is_empty());
    }
}
