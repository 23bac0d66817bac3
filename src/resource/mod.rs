//! Resource updates: keys, descriptors, records, the batching queue and
//! the record wire format.
//!
//! # Architecture
//!
//! - [`ResourceUpdateQueue`]: producer-side API, one method per update kind
//! - [`ResourceUpdate`]: closed set of update records, each optionally
//!   addressing a payload by [`OffsetRange`](crate::memory::OffsetRange)
//! - [`ResourceBatch`]: records plus segments, the unit of transport
//! - [`wire`]: length-prefixed rkyv framing of records

mod descriptor;
mod keys;
mod queue;
mod update;
pub mod wire;

pub use descriptor::{
    ColorU, ExternalImageType, FontHinting, FontInstanceFlags, FontInstanceOptions,
    FontInstancePlatformOptions, FontLcdFilter, FontRenderMode, FontVariation, ImageDescriptor,
    ImageDescriptorFlags, ImageFormat, TextureTarget,
};
pub use keys::{ExternalImageId, FontInstanceKey, FontKey, IdNamespace, ImageKey};
pub use queue::{QueueConfig, ResourceBatch, ResourceUpdateQueue};
pub use update::{ResourceUpdate, UpdateKind};
pub use wire::WireBatch;
