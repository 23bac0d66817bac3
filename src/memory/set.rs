//! The owned output of a writer flush.

use super::{Segment, SegmentReader};

/// Small and large segment lists handed over by a flush.
///
/// Moving a `SegmentSet` is the ownership transfer between writer,
/// transport and reader: the writer keeps no reference once it has been
/// returned, and the reader only borrows it.
#[derive(Debug, Default)]
pub struct SegmentSet {
    small: Vec<Segment>,
    large: Vec<Segment>,
}

impl SegmentSet {
    /// Assemble a set from received segment lists.
    pub fn new(small: Vec<Segment>, large: Vec<Segment>) -> Self {
        Self { small, large }
    }

    /// Small (chunk-size) segments, in allocation order.
    pub fn small(&self) -> &[Segment] {
        &self.small
    }

    /// Dedicated large segments, in allocation order.
    pub fn large(&self) -> &[Segment] {
        &self.large
    }

    /// Returns true if both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.small.is_empty() && self.large.is_empty()
    }

    /// Sum of all segment sizes.
    pub fn total_bytes(&self) -> usize {
        self.small
            .iter()
            .chain(self.large.iter())
            .map(Segment::len)
            .sum()
    }

    /// A reader resolving addresses against this set.
    pub fn reader(&self) -> SegmentReader<'_> {
        SegmentReader::new(&self.small, &self.large)
    }

    /// Split into `(small, large)`.
    pub fn into_parts(self) -> (Vec<Segment>, Vec<Segment>) {
        (self.small, self.large)
    }
}
