//! The segment allocator capability.
//!
//! The writer never allocates raw memory itself: every segment comes from a
//! [`SegmentAllocator`] supplied by the caller. In a multi-process setup that
//! allocator is the one that knows how to produce memory the other side can
//! map ([`MemfdAllocator`]); single-process users and tests can use
//! [`HeapAllocator`].

use super::defaults::{PAGE_SIZE, round_up_to_page};
use super::{HeapSegment, Segment, SharedMemorySegment};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Produces freshly backed, writable segments.
///
/// Implementations must return a segment whose length is at least `size`.
/// No zero-fill is assumed.
pub trait SegmentAllocator {
    /// Allocate a segment of at least `size` bytes.
    fn allocate(&self, size: usize) -> Result<Segment>;
}

impl<T: SegmentAllocator + ?Sized> SegmentAllocator for &T {
    fn allocate(&self, size: usize) -> Result<Segment> {
        (**self).allocate(size)
    }
}

impl<T: SegmentAllocator + ?Sized> SegmentAllocator for Box<T> {
    fn allocate(&self, size: usize) -> Result<Segment> {
        (**self).allocate(size)
    }
}

impl<T: SegmentAllocator + ?Sized> SegmentAllocator for Arc<T> {
    fn allocate(&self, size: usize) -> Result<Segment> {
        (**self).allocate(size)
    }
}

/// Allocates exact-size heap segments. Not shareable across processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl HeapAllocator {
    /// Create a heap allocator.
    pub fn new() -> Self {
        Self
    }
}

impl SegmentAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Result<Segment> {
        Ok(Segment::new(HeapSegment::new(size)?))
    }
}

/// Allocates memfd-backed shared memory, rounded up to whole pages.
#[derive(Debug, Clone)]
pub struct MemfdAllocator {
    name: String,
    page_size: usize,
}

impl MemfdAllocator {
    /// Create an allocator whose segments carry `name` as their debug name.
    pub fn new(name: impl Into<String>) -> Self {
        let page_size = rustix::param::page_size();
        Self {
            name: name.into(),
            page_size: if page_size.is_power_of_two() {
                page_size
            } else {
                PAGE_SIZE
            },
        }
    }

    /// The debug name given to each segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Page size that allocations are rounded up to.
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl Default for MemfdAllocator {
    fn default() -> Self {
        Self::new("ferry")
    }
}

impl SegmentAllocator for MemfdAllocator {
    fn allocate(&self, size: usize) -> Result<Segment> {
        let rounded = round_up_to_page(size.max(1), self.page_size).ok_or_else(|| {
            Error::AllocationFailed(format!("{size} bytes cannot be page aligned"))
        })?;
        Ok(Segment::new(SharedMemorySegment::new(&self.name, rounded)?))
    }
}

/// Caps the total number of bytes handed out by another allocator.
///
/// Once a request would take the running total past the budget, it fails
/// with [`Error::AllocationFailed`] without touching the inner allocator.
/// [`reset`](Self::reset) restores the full budget, typically after a batch
/// has been flushed and its segments released.
#[derive(Debug)]
pub struct BoundedAllocator<A> {
    inner: A,
    budget: usize,
    used: AtomicUsize,
}

impl<A: SegmentAllocator> BoundedAllocator<A> {
    /// Wrap `inner`, allowing at most `budget` bytes in total.
    pub fn new(inner: A, budget: usize) -> Self {
        Self {
            inner,
            budget,
            used: AtomicUsize::new(0),
        }
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.used())
    }

    /// Restore the full budget.
    pub fn reset(&self) {
        self.used.store(0, Ordering::Relaxed);
    }

    /// The wrapped allocator.
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: SegmentAllocator> SegmentAllocator for BoundedAllocator<A> {
    fn allocate(&self, size: usize) -> Result<Segment> {
        let reserved = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                used.checked_add(size).filter(|&total| total <= self.budget)
            });
        if reserved.is_err() {
            return Err(Error::AllocationFailed(format!(
                "budget exhausted: {size} bytes requested, {} of {} remaining",
                self.remaining(),
                self.budget
            )));
        }

        self.inner.allocate(size).inspect_err(|_| {
            self.used.fetch_sub(size, Ordering::Relaxed);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryType;

    #[test]
    fn test_heap_allocator_exact_size() {
        let segment = HeapAllocator::new().allocate(100).unwrap();
        assert_eq!(segment.len(), 100);
        assert_eq!(segment.memory_type(), MemoryType::Heap);
    }

    #[test]
    fn test_memfd_allocator_rounds_to_page() {
        let allocator = MemfdAllocator::new("test-alloc");
        let page = allocator.page_size();

        let segment = allocator.allocate(17).unwrap();
        assert_eq!(segment.len(), page);
        assert!(segment.ipc_handle().is_some());

        let segment = allocator.allocate(page + 1).unwrap();
        assert_eq!(segment.len(), 2 * page);
    }

    #[test]
    fn test_bounded_allocator_enforces_budget() {
        let allocator = BoundedAllocator::new(HeapAllocator, 100);

        assert!(allocator.allocate(60).is_ok());
        assert_eq!(allocator.remaining(), 40);

        let err = allocator.allocate(41).unwrap_err();
        assert!(matches!(err, Error::AllocationFailed(_)));
        assert_eq!(allocator.used(), 60);

        assert!(allocator.allocate(40).is_ok());
        assert_eq!(allocator.remaining(), 0);

        allocator.reset();
        assert_eq!(allocator.remaining(), 100);
    }

    #[test]
    fn test_bounded_allocator_refunds_inner_failure() {
        // HeapSegment rejects zero-sized requests.
        let allocator = BoundedAllocator::new(HeapAllocator, 100);
        assert!(allocator.allocate(0).is_err());
        assert_eq!(allocator.used(), 0);
    }

    #[test]
    fn test_allocator_through_arc() {
        let allocator: Arc<dyn SegmentAllocator> = Arc::new(HeapAllocator);
        assert_eq!(allocator.allocate(8).unwrap().len(), 8);
    }
}
