use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Scan instrumentation shared by every iterator a store hands out. Tests
/// use it to assert that bound components actually narrowed a range; it is
/// cheap enough to stay on unconditionally.
#[derive(Debug, Clone, Default)]
pub struct ScanMetrics {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    keys_scanned: AtomicU64,
    seeks: AtomicU64,
}

impl ScanMetrics {
    pub fn new() -> Self { Self::default() }

    /// Keys yielded by iterators since construction or the last reset.
    pub fn keys_scanned(&self) -> u64 { self.inner.keys_scanned.load(Ordering::Relaxed) }

    /// Repositioning seeks issued since construction or the last reset.
    pub fn seeks(&self) -> u64 { self.inner.seeks.load(Ordering::Relaxed) }

    pub fn reset(&self) {
        self.inner.keys_scanned.store(0, Ordering::Relaxed);
        self.inner.seeks.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_key(&self) {
        self.inner.keys_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_seek(&self) {
        self.inner.seeks.fetch_add(1, Ordering::Relaxed);
    }
}
