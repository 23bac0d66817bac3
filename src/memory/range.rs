//! Byte addresses into a flushed pair of segment lists.

use super::SegmentClass;
use std::fmt;

/// Locates one written payload: segment class, index in that class's list,
/// byte offset and length.
///
/// An address is only meaningful against the exact segment lists of the
/// flush it was produced in. Addresses from another flush look just as
/// valid, which is why the reader bounds-checks every field.
///
/// Small-class addresses never span two segments. Large-class addresses
/// always start at offset 0 of their own dedicated segment.
///
/// # Wire Format
///
/// ```text
/// ┌─────────┬──────────┬──────────┬──────────┐
/// │  class  │  index   │  offset  │  length  │
/// │ (1 byte)│ (4 bytes)│ (4 bytes)│ (4 bytes)│
/// └─────────┴──────────┴──────────┴──────────┘
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct OffsetRange {
    /// Which segment list the payload lives in.
    pub class: SegmentClass,
    /// Index of the segment within its list.
    pub index: u32,
    /// Byte offset within the segment (always 0 for large payloads).
    pub offset: u32,
    /// Payload length in bytes.
    pub length: u32,
}

impl OffsetRange {
    /// Address of a payload inside a small segment.
    pub const fn small(index: u32, offset: u32, length: u32) -> Self {
        Self {
            class: SegmentClass::Small,
            index,
            offset,
            length,
        }
    }

    /// Address of a payload occupying its own large segment.
    pub const fn large(index: u32, length: u32) -> Self {
        Self {
            class: SegmentClass::Large,
            index,
            offset: 0,
            length,
        }
    }

    /// The address of a zero-length payload.
    pub const fn empty() -> Self {
        Self::small(0, 0, 0)
    }

    /// Returns true if the address covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Is this a small-class address?
    #[inline]
    pub const fn is_small(&self) -> bool {
        matches!(self.class, SegmentClass::Small)
    }

    /// Is this a large-class address?
    #[inline]
    pub const fn is_large(&self) -> bool {
        matches!(self.class, SegmentClass::Large)
    }

    /// One past the last byte, or `None` if `offset + length` overflows.
    #[inline]
    pub fn end(&self) -> Option<usize> {
        (self.offset as usize).checked_add(self.length as usize)
    }
}

impl fmt::Display for OffsetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] @{}+{}",
            self.class, self.index, self.offset, self.length
        )
    }
}
