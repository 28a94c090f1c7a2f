//! Allocation metrics.
//!
//! Counters are updated on hot paths, so the per-thread record is plain
//! `Cell<u64>` arithmetic. Each thread's counters merge into the
//! process-wide sink when the thread exits (via the thread-local's `Drop`)
//! or when [`flush_local_metrics`] is called explicitly. The sink uses
//! relaxed atomics; readers accept an eventually-consistent view, since
//! live threads may not have merged yet.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide metrics sink.
///
/// Written only by merges from per-thread counters; readable at any time
/// through [`snapshot`](Self::snapshot).
#[derive(Debug)]
pub struct GlobalMetrics {
    arena_count: AtomicU64,
    block_count: AtomicU64,
    space_allocated: AtomicU64,
    space_used: AtomicU64,
    space_wasted: AtomicU64,
    allocation_count: AtomicU64,
    reset_count: AtomicU64,
    cleanup_count: AtomicU64,
}

static GLOBAL_METRICS: GlobalMetrics = GlobalMetrics::new();

/// Returns the process-wide metrics sink.
#[must_use]
pub fn global_metrics() -> &'static GlobalMetrics {
    &GLOBAL_METRICS
}

impl GlobalMetrics {
    const fn new() -> Self {
        Self {
            arena_count: AtomicU64::new(0),
            block_count: AtomicU64::new(0),
            space_allocated: AtomicU64::new(0),
            space_used: AtomicU64::new(0),
            space_wasted: AtomicU64::new(0),
            allocation_count: AtomicU64::new(0),
            reset_count: AtomicU64::new(0),
            cleanup_count: AtomicU64::new(0),
        }
    }

    /// Accumulates one thread's counters.
    fn merge(&self, local: &LocalMetrics) {
        self.arena_count
            .fetch_add(local.arena_count.get(), Ordering::Relaxed);
        self.block_count
            .fetch_add(local.block_count.get(), Ordering::Relaxed);
        self.space_allocated
            .fetch_add(local.space_allocated.get(), Ordering::Relaxed);
        self.space_used
            .fetch_add(local.space_used.get(), Ordering::Relaxed);
        self.space_wasted
            .fetch_add(local.space_wasted.get(), Ordering::Relaxed);
        self.allocation_count
            .fetch_add(local.allocation_count.get(), Ordering::Relaxed);
        self.reset_count
            .fetch_add(local.reset_count.get(), Ordering::Relaxed);
        self.cleanup_count
            .fetch_add(local.cleanup_count.get(), Ordering::Relaxed);
    }

    /// Reads the sink. Approximate: live threads may not have merged yet.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            arena_count: self.arena_count.load(Ordering::Relaxed),
            block_count: self.block_count.load(Ordering::Relaxed),
            space_allocated: self.space_allocated.load(Ordering::Relaxed),
            space_used: self.space_used.load(Ordering::Relaxed),
            space_wasted: self.space_wasted.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            reset_count: self.reset_count.load(Ordering::Relaxed),
            cleanup_count: self.cleanup_count.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the metrics counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Arenas constructed.
    pub arena_count: u64,
    /// Blocks obtained from the page source.
    pub block_count: u64,
    /// Raw bytes obtained from the page source.
    pub space_allocated: u64,
    /// Bytes handed out to callers.
    pub space_used: u64,
    /// Alignment padding plus cleanup-record bytes.
    pub space_wasted: u64,
    /// Successful allocations.
    pub allocation_count: u64,
    /// Arena resets.
    pub reset_count: u64,
    /// Cleanup thunks run.
    pub cleanup_count: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arenas: {}, blocks: {}, allocated: {} B, used: {} B, wasted: {} B, \
             allocations: {}, resets: {}, cleanups: {}",
            self.arena_count,
            self.block_count,
            self.space_allocated,
            self.space_used,
            self.space_wasted,
            self.allocation_count,
            self.reset_count,
            self.cleanup_count
        )
    }
}

/// Per-thread counters. Monotonic within the thread's lifetime.
#[derive(Debug, Default)]
pub(crate) struct LocalMetrics {
    arena_count: Cell<u64>,
    block_count: Cell<u64>,
    space_allocated: Cell<u64>,
    space_used: Cell<u64>,
    space_wasted: Cell<u64>,
    allocation_count: Cell<u64>,
    reset_count: Cell<u64>,
    cleanup_count: Cell<u64>,
}

impl LocalMetrics {
    #[inline]
    pub(crate) fn record_arena(&self) {
        self.arena_count.set(self.arena_count.get() + 1);
    }

    #[inline]
    pub(crate) fn record_block(&self, size: usize) {
        self.block_count.set(self.block_count.get() + 1);
        self.space_allocated
            .set(self.space_allocated.get() + size as u64);
    }

    #[inline]
    pub(crate) fn record_allocation(&self, size: usize, padding: usize) {
        self.allocation_count.set(self.allocation_count.get() + 1);
        self.space_used.set(self.space_used.get() + size as u64);
        self.space_wasted
            .set(self.space_wasted.get() + padding as u64);
    }

    #[inline]
    pub(crate) fn record_cleanup_slot(&self, bytes: usize) {
        self.space_wasted.set(self.space_wasted.get() + bytes as u64);
    }

    #[inline]
    pub(crate) fn record_reset(&self) {
        self.reset_count.set(self.reset_count.get() + 1);
    }

    #[inline]
    pub(crate) fn record_cleanups(&self, count: usize) {
        self.cleanup_count
            .set(self.cleanup_count.get() + count as u64);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            arena_count: self.arena_count.get(),
            block_count: self.block_count.get(),
            space_allocated: self.space_allocated.get(),
            space_used: self.space_used.get(),
            space_wasted: self.space_wasted.get(),
            allocation_count: self.allocation_count.get(),
            reset_count: self.reset_count.get(),
            cleanup_count: self.cleanup_count.get(),
        }
    }

    fn clear(&self) {
        self.arena_count.set(0);
        self.block_count.set(0);
        self.space_allocated.set(0);
        self.space_used.set(0);
        self.space_wasted.set(0);
        self.allocation_count.set(0);
        self.reset_count.set(0);
        self.cleanup_count.set(0);
    }
}

impl Drop for LocalMetrics {
    fn drop(&mut self) {
        GLOBAL_METRICS.merge(self);
    }
}

thread_local! {
    static LOCAL_METRICS: LocalMetrics = LocalMetrics::default();
}

/// Runs `f` against this thread's counters.
#[inline]
pub(crate) fn with_local<R>(f: impl FnOnce(&LocalMetrics) -> R) -> R {
    LOCAL_METRICS.with(f)
}

/// Reads this thread's counters since the last flush.
#[must_use]
pub fn local_metrics() -> MetricsSnapshot {
    LOCAL_METRICS.with(LocalMetrics::snapshot)
}

/// Merges this thread's counters into the global sink immediately.
///
/// Thread exit does this automatically; tests and long-lived worker loops
/// can call it to make the global view deterministic.
pub fn flush_local_metrics() {
    LOCAL_METRICS.with(|local| {
        GLOBAL_METRICS.merge(local);
        local.clear();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_recording() {
        flush_local_metrics();

        with_local(|m| {
            m.record_arena();
            m.record_block(4096);
            m.record_allocation(100, 4);
            m.record_cleanup_slot(16);
            m.record_reset();
            m.record_cleanups(3);
        });

        let snap = local_metrics();
        assert_eq!(snap.arena_count, 1);
        assert_eq!(snap.block_count, 1);
        assert_eq!(snap.space_allocated, 4096);
        assert_eq!(snap.space_used, 100);
        assert_eq!(snap.space_wasted, 20);
        assert_eq!(snap.allocation_count, 1);
        assert_eq!(snap.reset_count, 1);
        assert_eq!(snap.cleanup_count, 3);
    }

    #[test]
    fn test_flush_merges_and_clears() {
        flush_local_metrics();
        let before = global_metrics().snapshot();

        with_local(|m| m.record_allocation(64, 0));
        flush_local_metrics();

        let after = global_metrics().snapshot();
        assert!(after.space_used >= before.space_used + 64);
        assert_eq!(local_metrics().space_used, 0);
    }

    #[test]
    fn test_thread_exit_merges() {
        let before = global_metrics().snapshot();

        std::thread::spawn(|| {
            with_local(|m| m.record_block(8192));
        })
        .join()
        .unwrap();

        let after = global_metrics().snapshot();
        assert!(after.space_allocated >= before.space_allocated + 8192);
        assert!(after.block_count >= before.block_count + 1);
    }

    #[test]
    fn test_snapshot_display() {
        let snap = MetricsSnapshot::default();
        let text = snap.to_string();
        assert!(text.contains("allocations: 0"));
        assert!(text.contains("cleanups: 0"));
    }
}
