//! Segment writer: packs payloads into shared memory segments.
//!
//! Small payloads (up to the chunk size) are appended to a rotating list of
//! fixed-size segments; each payload lands entirely inside one segment, so
//! when the current segment is too full a fresh one is started. Payloads
//! larger than the chunk size get a dedicated segment of their own.
//!
//! The two paths share no cursor state: a large write never disturbs where
//! the next small write lands.
//!
//! ```text
//!  small: ┌──────────────┐ ┌──────────────┐
//!         │ a │ b │ c │░░│ │ d │ e │░░░░░░│   (chunk_size each)
//!         └──────────────┘ └──────────────┘
//!  large: ┌─────────────────────┐
//!         │ f (> chunk_size)    │
//!         └─────────────────────┘
//! ```

use super::{OffsetRange, Segment, SegmentAllocator, SegmentClass, SegmentSet};
use crate::error::{Error, Result};
use crate::observability;

/// Accumulates payload bytes into segments until flushed.
///
/// # Example
///
/// ```rust
/// use ferry::memory::{HeapAllocator, SegmentWriter};
///
/// let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();
/// let hello = writer.write(b"hello").unwrap();
/// let big = writer.write(b"world!!!!!!!!!!!!").unwrap();
///
/// let segments = writer.flush();
/// let reader = segments.reader();
/// assert_eq!(reader.read_to_vec(&hello).unwrap(), b"hello");
/// assert_eq!(reader.read_to_vec(&big).unwrap(), b"world!!!!!!!!!!!!");
/// ```
pub struct SegmentWriter<A> {
    allocator: A,
    small: Vec<Segment>,
    large: Vec<Segment>,
    /// Bytes used in the last small segment.
    cursor: usize,
    chunk_size: usize,
}

impl<A: SegmentAllocator> SegmentWriter<A> {
    /// Create a writer whose small segments are `chunk_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `chunk_size` is 0 or does not fit
    /// in an address offset.
    pub fn new(allocator: A, chunk_size: usize) -> Result<Self> {
        validate_chunk_size(chunk_size)?;

        Ok(Self {
            allocator,
            small: Vec::new(),
            large: Vec::new(),
            cursor: 0,
            chunk_size,
        })
    }

    /// Write `bytes` and return their address.
    ///
    /// An empty slice yields [`OffsetRange::empty`] without allocating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailed`] if a needed segment could not be
    /// obtained. The writer is left exactly as it was before the call.
    pub fn write(&mut self, bytes: &[u8]) -> Result<OffsetRange> {
        if bytes.is_empty() {
            return Ok(OffsetRange::empty());
        }

        let length = u32::try_from(bytes.len()).map_err(|_| {
            Error::AllocationFailed(format!(
                "payload of {} bytes exceeds the addressable range",
                bytes.len()
            ))
        })?;

        if bytes.len() > self.chunk_size {
            return self.write_large(bytes, length);
        }

        if self.small.is_empty() || self.chunk_size - self.cursor < bytes.len() {
            self.alloc_chunk()?;
        }

        let index = self.small.len() - 1;
        let offset = self.cursor;
        let dst = self.small[index]
            .as_mut_slice()
            .ok_or_else(|| Error::InvalidSegment("small segment is read-only".into()))?;
        dst[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();

        observability::record_bytes_written(SegmentClass::Small, bytes.len());
        // Both fit in u32: index was checked at allocation, offset < chunk_size.
        Ok(OffsetRange::small(index as u32, offset as u32, length))
    }

    /// Write a slice of plain-old-data values as raw bytes.
    pub fn write_as_bytes<T: bytemuck::Pod>(&mut self, values: &[T]) -> Result<OffsetRange> {
        self.write(bytemuck::cast_slice(values))
    }

    /// Hand over all accumulated segments, leaving the writer empty.
    ///
    /// Callable with nothing written; the result is then empty.
    pub fn flush(&mut self) -> SegmentSet {
        let segments = SegmentSet::new(
            std::mem::take(&mut self.small),
            std::mem::take(&mut self.large),
        );
        self.cursor = 0;

        tracing::trace!(
            small = segments.small().len(),
            large = segments.large().len(),
            "flushed writer segments"
        );
        segments
    }

    /// Drop all accumulated segments without producing output.
    pub fn clear(&mut self) {
        if !self.is_empty() {
            tracing::debug!(
                small = self.small.len(),
                large = self.large.len(),
                "discarding unflushed segments"
            );
        }
        self.small.clear();
        self.large.clear();
        self.cursor = 0;
    }

    /// The configured small segment size.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns true if no segment has been allocated since the last flush or clear.
    pub fn is_empty(&self) -> bool {
        self.small.is_empty() && self.large.is_empty()
    }

    /// Number of small segments currently held.
    pub fn small_segment_count(&self) -> usize {
        self.small.len()
    }

    /// Number of large segments currently held.
    pub fn large_segment_count(&self) -> usize {
        self.large.len()
    }

    /// The segment allocator this writer draws from.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    fn alloc_chunk(&mut self) -> Result<()> {
        next_index(self.small.len())?;
        let segment = self.allocate(SegmentClass::Small, self.chunk_size)?;
        self.small.push(segment);
        self.cursor = 0;
        Ok(())
    }

    fn write_large(&mut self, bytes: &[u8], length: u32) -> Result<OffsetRange> {
        let index = next_index(self.large.len())?;
        let mut segment = self.allocate(SegmentClass::Large, bytes.len())?;

        let dst = segment
            .as_mut_slice()
            .ok_or_else(|| Error::InvalidSegment("large segment is read-only".into()))?;
        dst[..bytes.len()].copy_from_slice(bytes);
        self.large.push(segment);

        observability::record_bytes_written(SegmentClass::Large, bytes.len());
        Ok(OffsetRange::large(index, length))
    }

    /// Obtain a segment and check it honours the allocator contract.
    fn allocate(&self, class: SegmentClass, size: usize) -> Result<Segment> {
        let segment = self.allocator.allocate(size).inspect_err(|e| {
            tracing::warn!(%class, size, error = %e, "segment allocation failed");
            observability::record_allocation_failure(class);
        })?;

        if segment.len() < size {
            observability::record_allocation_failure(class);
            return Err(Error::AllocationFailed(format!(
                "allocator returned {} bytes for a {size} byte {class} segment",
                segment.len()
            )));
        }
        if !segment.is_writable() {
            observability::record_allocation_failure(class);
            return Err(Error::AllocationFailed(format!(
                "allocator returned a read-only {class} segment"
            )));
        }

        tracing::trace!(%class, size, actual = segment.len(), "allocated segment");
        observability::record_allocation(class, segment.len());
        Ok(segment)
    }
}

/// Check that `chunk_size` is usable as a small segment size.
pub(crate) fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfig(
            "chunk size must be greater than 0".into(),
        ));
    }
    if u32::try_from(chunk_size).is_err() {
        return Err(Error::InvalidConfig(format!(
            "chunk size {chunk_size} exceeds the addressable range"
        )));
    }
    Ok(())
}

fn next_index(count: usize) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| Error::AllocationFailed("segment index exceeds the addressable range".into()))
}

impl<A> std::fmt::Debug for SegmentWriter<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("chunk_size", &self.chunk_size)
            .field("small", &self.small.len())
            .field("large", &self.large.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BoundedAllocator, HeapAllocator, HeapSegment};

    /// Hands out read-only or undersized segments.
    struct BrokenAllocator {
        shrink_by: usize,
        read_only: bool,
    }

    impl SegmentAllocator for BrokenAllocator {
        fn allocate(&self, size: usize) -> Result<Segment> {
            let segment = HeapSegment::new(size - self.shrink_by)?;
            Ok(Segment::new(if self.read_only {
                segment.into_read_only()
            } else {
                segment
            }))
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            SegmentWriter::new(HeapAllocator, 0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_small_writes_share_a_segment() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();

        let a = writer.write(b"abcd").unwrap();
        let b = writer.write(b"efgh").unwrap();

        assert_eq!(a, OffsetRange::small(0, 0, 4));
        assert_eq!(b, OffsetRange::small(0, 4, 4));
        assert_eq!(writer.small_segment_count(), 1);
        assert_eq!(writer.large_segment_count(), 0);
    }

    #[test]
    fn test_write_that_does_not_fit_starts_new_segment() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();

        writer.write(&[1; 10]).unwrap();
        let second = writer.write(&[2; 10]).unwrap();

        assert_eq!(second, OffsetRange::small(1, 0, 10));
        assert_eq!(writer.small_segment_count(), 2);
    }

    #[test]
    fn test_exact_chunk_size_is_small() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();
        let range = writer.write(&[7; 16]).unwrap();
        assert_eq!(range, OffsetRange::small(0, 0, 16));

        // Segment is full now; the next byte goes to a new one.
        let next = writer.write(&[8]).unwrap();
        assert_eq!(next, OffsetRange::small(1, 0, 1));
    }

    #[test]
    fn test_large_write_gets_dedicated_segment() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();

        let small = writer.write(b"hello").unwrap();
        let large = writer.write(&[9; 17]).unwrap();
        let after = writer.write(b"again").unwrap();

        assert_eq!(large, OffsetRange::large(0, 17));
        // The small cursor is untouched by the large write.
        assert_eq!(small, OffsetRange::small(0, 0, 5));
        assert_eq!(after, OffsetRange::small(0, 5, 5));
        assert_eq!(writer.large_segment_count(), 1);

        let segments = writer.flush();
        assert_eq!(segments.large()[0].len(), 17);
    }

    #[test]
    fn test_empty_write_does_not_allocate() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();
        let range = writer.write(&[]).unwrap();

        assert_eq!(range, OffsetRange::empty());
        assert!(writer.is_empty());
    }

    #[test]
    fn test_write_as_bytes() {
        let mut writer = SegmentWriter::new(HeapAllocator, 64).unwrap();
        let range = writer.write_as_bytes(&[1u32, 2, 3]).unwrap();
        assert_eq!(range.length, 12);

        let segments = writer.flush();
        let values: Vec<u32> = segments.reader().read_typed(&range).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_flush_twice_yields_empty() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();
        writer.write(b"data").unwrap();

        let first = writer.flush();
        assert_eq!(first.small().len(), 1);
        assert!(writer.is_empty());

        let second = writer.flush();
        assert!(second.is_empty());
    }

    #[test]
    fn test_clear_discards_segments() {
        let mut writer = SegmentWriter::new(HeapAllocator, 16).unwrap();
        writer.write(b"data").unwrap();
        writer.write(&[0; 32]).unwrap();

        writer.clear();
        assert!(writer.is_empty());
        assert!(writer.flush().is_empty());

        // Writing restarts at the first segment.
        assert_eq!(writer.write(b"x").unwrap(), OffsetRange::small(0, 0, 1));
    }

    #[test]
    fn test_allocation_failure_leaves_writer_intact() {
        let allocator = BoundedAllocator::new(HeapAllocator, 16);
        let mut writer = SegmentWriter::new(&allocator, 16).unwrap();

        let first = writer.write(&[1; 12]).unwrap();
        assert!(matches!(
            writer.write(&[2; 8]),
            Err(Error::AllocationFailed(_))
        ));
        assert!(matches!(
            writer.write(&[3; 40]),
            Err(Error::AllocationFailed(_))
        ));

        // Still usable for writes that fit the current segment.
        let fits = writer.write(&[4; 4]).unwrap();
        assert_eq!(fits, OffsetRange::small(0, 12, 4));

        let segments = writer.flush();
        let reader = segments.reader();
        assert_eq!(reader.read_to_vec(&first).unwrap(), vec![1; 12]);
        assert_eq!(reader.read_to_vec(&fits).unwrap(), vec![4; 4]);
        assert!(segments.large().is_empty());
    }

    #[test]
    fn test_undersized_segment_rejected() {
        let allocator = BrokenAllocator {
            shrink_by: 1,
            read_only: false,
        };
        let mut writer = SegmentWriter::new(allocator, 16).unwrap();
        assert!(matches!(
            writer.write(b"abc"),
            Err(Error::AllocationFailed(_))
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_read_only_segment_rejected() {
        let allocator = BrokenAllocator {
            shrink_by: 0,
            read_only: true,
        };
        let mut writer = SegmentWriter::new(allocator, 16).unwrap();
        assert!(matches!(
            writer.write(&[0; 20]),
            Err(Error::AllocationFailed(_))
        ));
        assert!(writer.is_empty());
    }
}
