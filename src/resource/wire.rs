//! Record encoding for the transport boundary.
//!
//! Records travel as a length-prefixed rkyv archive:
//!
//! ```text
//! ┌────────────────┬───────────────────────────────┐
//! │ len (u32 LE)   │ rkyv archive (len bytes)      │
//! └────────────────┴───────────────────────────────┘
//! ```
//!
//! Segments travel separately (as fds or copies). [`WireBatch`] carries the
//! segment counts next to the records, so the receiver can refuse to pair
//! records with segment lists from a different flush.

use super::queue::ResourceBatch;
use super::update::ResourceUpdate;
use crate::error::{Error, Result};
use crate::memory::SegmentSet;

const LEN_PREFIX: usize = 4;

/// Records of one batch plus the shape of the segment lists they address.
#[derive(Clone, Debug, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(derive(Debug))]
pub struct WireBatch {
    /// Number of small segments flushed with the records.
    pub small_segments: u32,
    /// Number of large segments flushed with the records.
    pub large_segments: u32,
    /// Records in queue order.
    pub updates: Vec<ResourceUpdate>,
}

impl WireBatch {
    /// Describe `batch` for transmission.
    pub fn from_batch(batch: &ResourceBatch) -> Result<Self> {
        Ok(Self {
            small_segments: segment_count(batch.segments().small().len())?,
            large_segments: segment_count(batch.segments().large().len())?,
            updates: batch.updates().to_vec(),
        })
    }

    /// Pair the received records with the received segments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSegment`] if the segment lists do not have
    /// the lengths the sender flushed.
    pub fn into_batch(self, segments: SegmentSet) -> Result<ResourceBatch> {
        let small = segments.small().len();
        let large = segments.large().len();
        if small != self.small_segments as usize || large != self.large_segments as usize {
            return Err(Error::InvalidSegment(format!(
                "batch expects {}+{} segments, received {small}+{large}",
                self.small_segments, self.large_segments
            )));
        }
        Ok(ResourceBatch::from_parts(self.updates, segments))
    }
}

fn segment_count(count: usize) -> Result<u32> {
    u32::try_from(count)
        .map_err(|_| Error::InvalidSegment(format!("{count} segments cannot be described")))
}

/// Frame a list of records.
pub fn frame_updates(updates: &[ResourceUpdate]) -> Result<Vec<u8>> {
    let serialized = rkyv::to_bytes::<rkyv::rancor::Error>(&updates.to_vec())
        .map_err(|e| Error::ValidationFailed(e.to_string()))?;
    frame(&serialized)
}

/// Unframe a list of records.
///
/// Returns the records and the number of bytes consumed, or `None` if the
/// buffer doesn't contain a complete frame yet.
pub fn unframe_updates(buf: &[u8]) -> Result<Option<(Vec<ResourceUpdate>, usize)>> {
    let Some((aligned, consumed)) = unframe(buf) else {
        return Ok(None);
    };
    let updates = rkyv::from_bytes::<Vec<ResourceUpdate>, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::ValidationFailed(e.to_string()))?;
    Ok(Some((updates, consumed)))
}

/// Frame a batch's records and segment counts.
pub fn frame_batch(batch: &ResourceBatch) -> Result<Vec<u8>> {
    let wire = WireBatch::from_batch(batch)?;
    let serialized = rkyv::to_bytes::<rkyv::rancor::Error>(&wire)
        .map_err(|e| Error::ValidationFailed(e.to_string()))?;
    frame(&serialized)
}

/// Unframe a [`WireBatch`].
pub fn unframe_batch(buf: &[u8]) -> Result<Option<(WireBatch, usize)>> {
    let Some((aligned, consumed)) = unframe(buf) else {
        return Ok(None);
    };
    let batch = rkyv::from_bytes::<WireBatch, rkyv::rancor::Error>(&aligned)
        .map_err(|e| Error::ValidationFailed(e.to_string()))?;
    Ok(Some((batch, consumed)))
}

fn frame(serialized: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(serialized.len()).map_err(|_| {
        Error::ValidationFailed(format!("{} byte archive exceeds frame limit", serialized.len()))
    })?;

    let mut framed = Vec::with_capacity(LEN_PREFIX + serialized.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(serialized);
    Ok(framed)
}

/// Split off one complete frame, copied into an rkyv-aligned buffer.
fn unframe(buf: &[u8]) -> Option<(rkyv::util::AlignedVec<16>, usize)> {
    let prefix = buf.get(..LEN_PREFIX)?;
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let body = buf.get(LEN_PREFIX..LEN_PREFIX.checked_add(len)?)?;

    let mut aligned = rkyv::util::AlignedVec::<16>::new();
    aligned.extend_from_slice(body);
    Some((aligned, LEN_PREFIX + len))
}
