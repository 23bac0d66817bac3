//! Memory management for Ferry.
//!
//! This module provides the segment layer that payload bytes travel in.
//!
//! # Architecture
//!
//! - [`SegmentAllocator`]: capability that produces fresh segments (heap or memfd)
//! - [`SegmentWriter`]: packs payloads into small rotating segments and
//!   dedicated large segments, returning an [`OffsetRange`] per payload
//! - [`SegmentSet`]: the owned segment lists a flush hands over
//! - [`SegmentReader`]: resolves an [`OffsetRange`] back into bytes on the
//!   receiving side
//!
//! # Example
//!
//! ```rust
//! use ferry::memory::{HeapAllocator, SegmentWriter};
//!
//! let mut writer = SegmentWriter::new(HeapAllocator, 64 * 1024).unwrap();
//! let range = writer.write(b"glyph data").unwrap();
//!
//! // Transfer `segments` (and `range`) to the consumer...
//! let segments = writer.flush();
//!
//! let mut bytes = Vec::new();
//! segments.reader().read(&range, &mut bytes).unwrap();
//! assert_eq!(bytes, b"glyph data");
//! ```

mod allocator;
pub mod defaults;
mod heap;
mod range;
mod reader;
mod segment;
mod set;
mod shared;
pub(crate) mod writer;

pub use allocator::{BoundedAllocator, HeapAllocator, MemfdAllocator, SegmentAllocator};
pub use heap::HeapSegment;
pub use range::OffsetRange;
pub use reader::SegmentReader;
pub use segment::{IpcHandle, MemorySegment, MemoryType, Segment, SegmentClass};
pub use set::SegmentSet;
pub use shared::SharedMemorySegment;
pub use writer::SegmentWriter;
