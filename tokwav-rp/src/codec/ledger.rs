//! Accounting for decode-time buffers
//!
//! Every buffer the batch decoder materializes (codes, scale, decoded PCM) is
//! wrapped in a [`Tracked`] handle registered with a [`BufferLedger`]. Dropping
//! the handle frees the buffer and decrements the ledger, so the ledger's peak
//! is the real high-water mark of decode memory across a run.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Live/peak counters for decode buffers
#[derive(Debug, Default)]
pub struct BufferLedger {
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_buffers: AtomicUsize,
    peak_bytes: AtomicUsize,
    total_acquired: AtomicUsize,
}

impl BufferLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn acquire(&self, bytes: usize) {
        let buffers = self.live_buffers.fetch_add(1, Ordering::AcqRel) + 1;
        let total = self.live_bytes.fetch_add(bytes, Ordering::AcqRel) + bytes;
        self.peak_buffers.fetch_max(buffers, Ordering::AcqRel);
        self.peak_bytes.fetch_max(total, Ordering::AcqRel);
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&self, bytes: usize) {
        self.live_buffers.fetch_sub(1, Ordering::AcqRel);
        self.live_bytes.fetch_sub(bytes, Ordering::AcqRel);
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::Acquire)
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Acquire)
    }

    pub fn peak_buffers(&self) -> usize {
        self.peak_buffers.load(Ordering::Acquire)
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Acquire)
    }

    /// Buffers ever registered (monotonic)
    pub fn total_acquired(&self) -> usize {
        self.total_acquired.load(Ordering::Relaxed)
    }
}

/// A buffer counted against a [`BufferLedger`] until dropped
#[derive(Debug)]
pub struct Tracked<T> {
    value: Vec<T>,
    bytes: usize,
    ledger: Arc<BufferLedger>,
}

impl<T> Tracked<T> {
    pub fn new(value: Vec<T>, ledger: &Arc<BufferLedger>) -> Self {
        let bytes = value.len() * std::mem::size_of::<T>();
        ledger.acquire(bytes);
        Self {
            value,
            bytes,
            ledger: Arc::clone(ledger),
        }
    }

    /// Shorten the buffer in place; the ledger keeps the acquired size.
    pub fn truncate(&mut self, len: usize) {
        self.value.truncate(len);
    }
}

impl<T> Deref for Tracked<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.ledger.release(self.bytes);
    }
}
