//! Segment reader: resolves addresses back into payload bytes.

use super::{OffsetRange, Segment, SegmentClass};
use crate::error::{Error, Result};
use crate::observability;

/// Resolves [`OffsetRange`]s against the segment lists of one flush.
///
/// The reader borrows the lists; it never allocates segments and has nothing
/// to tear down. Addresses are untrusted input: any index, offset or length
/// that does not fit the supplied lists yields
/// [`Error::AddressOutOfRange`] instead of reading.
#[derive(Debug, Clone, Copy)]
pub struct SegmentReader<'a> {
    small: &'a [Segment],
    large: &'a [Segment],
}

impl<'a> SegmentReader<'a> {
    /// Create a reader over the small and large lists of one flush.
    pub fn new(small: &'a [Segment], large: &'a [Segment]) -> Self {
        Self { small, large }
    }

    /// Append the bytes at `range` to `into`.
    ///
    /// On failure `into` is left untouched.
    pub fn read(&self, range: &OffsetRange, into: &mut Vec<u8>) -> Result<()> {
        let bytes = self.slice(range)?;
        into.extend_from_slice(bytes);
        Ok(())
    }

    /// Copy the bytes at `range` into a new vector.
    pub fn read_to_vec(&self, range: &OffsetRange) -> Result<Vec<u8>> {
        Ok(self.slice(range)?.to_vec())
    }

    /// Copy the bytes at `range` out as a vector of `T`.
    ///
    /// The length must be a whole number of elements.
    pub fn read_typed<T: bytemuck::Pod>(&self, range: &OffsetRange) -> Result<Vec<T>> {
        let size = std::mem::size_of::<T>();
        let bytes = self.slice(range)?;
        if size == 0 || bytes.len() % size != 0 {
            return Err(self.reject(
                range,
                format!("length is not a multiple of the {size} byte element size"),
            ));
        }
        Ok(bytes
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Borrow the bytes at `range` without copying.
    pub fn slice(&self, range: &OffsetRange) -> Result<&'a [u8]> {
        if range.is_empty() {
            return Ok(&[]);
        }

        match range.class {
            SegmentClass::Small => self.slice_small(range),
            SegmentClass::Large => self.slice_large(range),
        }
    }

    fn slice_small(&self, range: &OffsetRange) -> Result<&'a [u8]> {
        let small: &'a [Segment] = self.small;
        let Some(segment) = small.get(range.index as usize) else {
            return Err(self.reject(
                range,
                format!("segment index past {} small segments", small.len()),
            ));
        };

        let start = range.offset as usize;
        match range.end() {
            Some(end) if end <= segment.len() => Ok(&segment.as_slice()[start..end]),
            _ => Err(self.reject(
                range,
                format!("span exceeds the {} byte segment", segment.len()),
            )),
        }
    }

    fn slice_large(&self, range: &OffsetRange) -> Result<&'a [u8]> {
        let large: &'a [Segment] = self.large;
        let Some(segment) = large.get(range.index as usize) else {
            return Err(self.reject(
                range,
                format!("segment index past {} large segments", large.len()),
            ));
        };

        if range.offset != 0 {
            return Err(self.reject(range, "large payloads start at offset 0"));
        }
        // Allocators may round segments up, so the segment can be longer
        // than the payload it holds.
        let length = range.length as usize;
        if length > segment.len() {
            return Err(self.reject(
                range,
                format!("length exceeds the {} byte segment", segment.len()),
            ));
        }
        Ok(&segment.as_slice()[..length])
    }

    fn reject(&self, range: &OffsetRange, reason: impl Into<String>) -> Error {
        let reason = reason.into();
        tracing::warn!(%range, %reason, "rejected segment read");
        observability::record_read_failure(range.class);
        Error::out_of_range(*range, reason)
    }
}
