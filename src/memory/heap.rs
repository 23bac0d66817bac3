//! Heap-backed memory segment.

use super::{IpcHandle, MemorySegment, MemoryType};
use crate::error::{Error, Result};

/// A memory segment backed by heap allocation.
///
/// Suitable for single-process batching and tests. It does not support
/// cross-process sharing.
///
/// # Example
///
/// ```rust
/// use ferry::memory::{HeapSegment, MemorySegment};
///
/// let segment = HeapSegment::new(1024).unwrap();
/// assert_eq!(segment.len(), 1024);
/// ```
pub struct HeapSegment {
    /// Using a boxed slice ensures the memory is contiguous and won't be reallocated.
    data: Box<[u8]>,
    read_only: bool,
}

impl HeapSegment {
    /// Create a new zero-initialized heap segment.
    ///
    /// # Errors
    ///
    /// Returns an error if size is 0.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }

        Ok(Self {
            data: vec![0u8; size].into_boxed_slice(),
            read_only: false,
        })
    }

    /// Create a segment holding exactly `bytes`.
    ///
    /// Mostly useful on the receiving side, when segment contents arrive by
    /// copy rather than by mapping.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into_boxed_slice(),
            read_only: false,
        }
    }

    /// Forbid further writes through this segment.
    pub fn into_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl MemorySegment for HeapSegment {
    fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    fn as_mut_ptr(&self) -> Option<*mut u8> {
        // HeapSegment is not Clone, so its owner has exclusive access.
        (!self.read_only).then_some(self.data.as_ptr() as *mut u8)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn memory_type(&self) -> MemoryType {
        MemoryType::Heap
    }

    fn ipc_handle(&self) -> Option<IpcHandle> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_segment_creation() {
        let segment = HeapSegment::new(1024).unwrap();
        assert_eq!(segment.len(), 1024);
        assert_eq!(segment.memory_type(), MemoryType::Heap);
        assert!(segment.ipc_handle().is_none());
    }

    #[test]
    fn test_heap_segment_zero_size_fails() {
        assert!(HeapSegment::new(0).is_err());
    }

    #[test]
    fn test_heap_segment_is_zeroed() {
        let segment = HeapSegment::new(1024).unwrap();
        let slice = unsafe { std::slice::from_raw_parts(segment.as_ptr(), segment.len()) };
        assert!(slice.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_heap_segment_read_only() {
        let segment = HeapSegment::from_vec(vec![1, 2, 3]).into_read_only();
        assert_eq!(segment.len(), 3);
        assert!(segment.as_mut_ptr().is_none());

        let writable = HeapSegment::from_vec(vec![1, 2, 3]);
        assert_eq!(writable.as_mut_ptr(), Some(writable.as_ptr() as *mut u8));
    }
}
