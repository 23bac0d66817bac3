//! # Ferry
//!
//! Cross-process resource update batching over shared memory.
//!
//! A producer records resource mutations (images, blob images, external
//! images, fonts, font instances) on a [`ResourceUpdateQueue`]. Payload bytes
//! are packed into shared memory segments as they arrive; each record keeps
//! only an address into those segments. A flush hands over the ordered
//! records together with the segments as one batch, ready for a transport to
//! move to the consuming process, where a [`SegmentReader`] turns addresses
//! back into bytes.
//!
//! ## Features
//!
//! - **Arena with overflow**: small payloads share fixed-size segments,
//!   large payloads get dedicated segments
//! - **Move-only ownership transfer**: segments leave the writer by value
//! - **Untrusted addresses**: every read is bounds-checked
//! - **Pluggable memory**: heap for tests, memfd for multi-process
//! - **rkyv records**: length-prefixed, validated on decode
//!
//! ## Quick Start
//!
//! ```rust
//! use ferry::prelude::*;
//!
//! let mut queue = ResourceUpdateQueue::new(MemfdAllocator::new("resources"))?;
//! let font = FontKey::new(IdNamespace(1), 1);
//! queue.add_raw_font(font, b"font file bytes", 0)?;
//!
//! let batch = queue.flush();
//! // ...transport batch.segments() and wire::frame_batch(&batch)?...
//! assert_eq!(batch.payload(&batch.updates()[0])?, Some(b"font file bytes".to_vec()));
//! # Ok::<(), ferry::Error>(())
//! ```
//!
//! [`ResourceUpdateQueue`]: resource::ResourceUpdateQueue
//! [`SegmentReader`]: memory::SegmentReader

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod memory;
pub mod observability;
pub mod resource;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::memory::{
        HeapAllocator, MemfdAllocator, OffsetRange, Segment, SegmentAllocator, SegmentClass,
        SegmentReader, SegmentSet, SegmentWriter,
    };
    pub use crate::resource::{
        ExternalImageId, FontInstanceKey, FontKey, IdNamespace, ImageDescriptor,
        ImageDescriptorFlags, ImageFormat, ImageKey, QueueConfig, ResourceBatch, ResourceUpdate,
        ResourceUpdateQueue, UpdateKind, wire,
    };
}

pub use error::{Error, Result};
