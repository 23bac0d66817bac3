//! The resource update queue: the producer-facing batching API.
//!
//! Every operation appends one [`ResourceUpdate`] and, when the update has
//! inline payload, writes that payload through a [`SegmentWriter`] first.
//! [`ResourceUpdateQueue::flush`] hands over the records together with the
//! segments they address as one [`ResourceBatch`].
//!
//! # Example
//!
//! ```rust
//! use ferry::memory::HeapAllocator;
//! use ferry::resource::{
//!     IdNamespace, ImageDescriptor, ImageDescriptorFlags, ImageFormat, ImageKey,
//!     ResourceUpdate, ResourceUpdateQueue,
//! };
//!
//! let mut queue = ResourceUpdateQueue::new(HeapAllocator).unwrap();
//! let key = ImageKey::new(IdNamespace(1), 1);
//! let descriptor = ImageDescriptor::new(2, 2, ImageFormat::Rgba8, ImageDescriptorFlags::empty());
//!
//! queue.add_image(key, descriptor, &[0xff; 16]).unwrap();
//! queue.delete_image(key);
//!
//! let batch = queue.flush();
//! assert_eq!(batch.updates().len(), 2);
//! let pixels = batch.payload(&batch.updates()[0]).unwrap();
//! assert_eq!(pixels, Some(vec![0xff; 16]));
//! ```

use super::descriptor::{
    ExternalImageType, FontInstanceOptions, FontInstancePlatformOptions, FontVariation,
    ImageDescriptor,
};
use super::keys::{ExternalImageId, FontInstanceKey, FontKey, ImageKey};
use super::update::ResourceUpdate;
use crate::error::Result;
use crate::memory::defaults::DEFAULT_CHUNK_SIZE;
use crate::memory::writer::validate_chunk_size;
use crate::memory::{SegmentAllocator, SegmentReader, SegmentSet, SegmentWriter};
use crate::observability;

/// Construction-time settings of a [`ResourceUpdateQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Size of each small segment. Payloads larger than this get a
    /// dedicated segment.
    pub chunk_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl QueueConfig {
    /// Set the small segment size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        validate_chunk_size(self.chunk_size)
    }
}

/// Batches resource updates and their payloads for one transport round.
///
/// The queue is owned by a single producer at a time; hand it over by move
/// rather than sharing it. Each [`flush`](Self::flush) is a snapshot and
/// reset: afterwards the queue is empty and accumulating again.
pub struct ResourceUpdateQueue<A> {
    writer: SegmentWriter<A>,
    updates: Vec<ResourceUpdate>,
}

impl<A: SegmentAllocator> ResourceUpdateQueue<A> {
    /// Create a queue with the default chunk size.
    pub fn new(allocator: A) -> Result<Self> {
        Self::with_config(allocator, QueueConfig::default())
    }

    /// Create a queue with explicit settings.
    pub fn with_config(allocator: A, config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            writer: SegmentWriter::new(allocator, config.chunk_size)?,
            updates: Vec::new(),
        })
    }

    /// Add a raw image.
    ///
    /// The descriptor must be consistent and `bytes` must hold every pixel
    /// it describes. On any error nothing is recorded.
    pub fn add_image(
        &mut self,
        key: ImageKey,
        descriptor: ImageDescriptor,
        bytes: &[u8],
    ) -> Result<()> {
        descriptor.validate_payload(bytes.len())?;
        let bytes = self.writer.write(bytes)?;
        self.push(ResourceUpdate::AddImage {
            key,
            descriptor,
            bytes,
        });
        Ok(())
    }

    /// Add a blob image. The blob itself is opaque; only the descriptor is checked.
    pub fn add_blob_image(
        &mut self,
        key: ImageKey,
        descriptor: ImageDescriptor,
        bytes: &[u8],
    ) -> Result<()> {
        descriptor.validate()?;
        let bytes = self.writer.write(bytes)?;
        self.push(ResourceUpdate::AddBlobImage {
            key,
            descriptor,
            bytes,
        });
        Ok(())
    }

    /// Add an image backed by a consumer-owned external source.
    pub fn add_external_image(&mut self, key: ImageKey, external_id: ExternalImageId) {
        self.push(ResourceUpdate::AddExternalImage { key, external_id });
    }

    /// Replace the pixels of a raw image.
    pub fn update_image_buffer(
        &mut self,
        key: ImageKey,
        descriptor: ImageDescriptor,
        bytes: &[u8],
    ) -> Result<()> {
        descriptor.validate_payload(bytes.len())?;
        let bytes = self.writer.write(bytes)?;
        self.push(ResourceUpdate::UpdateImage {
            key,
            descriptor,
            bytes,
        });
        Ok(())
    }

    /// Replace the contents of a blob image.
    pub fn update_blob_image(
        &mut self,
        key: ImageKey,
        descriptor: ImageDescriptor,
        bytes: &[u8],
    ) -> Result<()> {
        descriptor.validate()?;
        let bytes = self.writer.write(bytes)?;
        self.push(ResourceUpdate::UpdateBlobImage {
            key,
            descriptor,
            bytes,
        });
        Ok(())
    }

    /// Point an image at a different external source.
    pub fn update_external_image(
        &mut self,
        key: ImageKey,
        descriptor: ImageDescriptor,
        external_id: ExternalImageId,
        image_type: ExternalImageType,
        channel_index: u8,
    ) {
        self.push(ResourceUpdate::UpdateExternalImage {
            key,
            descriptor,
            external_id,
            image_type,
            channel_index,
        });
    }

    /// Delete an image of any kind.
    pub fn delete_image(&mut self, key: ImageKey) {
        self.push(ResourceUpdate::DeleteImage { key });
    }

    /// Add a font face from its file bytes; `index` selects the face in a collection.
    pub fn add_raw_font(&mut self, key: FontKey, bytes: &[u8], index: u32) -> Result<()> {
        let bytes = self.writer.write(bytes)?;
        self.push(ResourceUpdate::AddFont { key, bytes, index });
        Ok(())
    }

    /// Delete a font face.
    pub fn delete_font(&mut self, key: FontKey) {
        self.push(ResourceUpdate::DeleteFont { key });
    }

    /// Add a sized instance of a font face.
    ///
    /// The variation axes are written to the segments as a packed array;
    /// with no variations no segment space is used.
    pub fn add_font_instance(
        &mut self,
        key: FontInstanceKey,
        font_key: FontKey,
        glyph_size: f32,
        options: Option<FontInstanceOptions>,
        platform_options: Option<FontInstancePlatformOptions>,
        variations: &[FontVariation],
    ) -> Result<()> {
        let variations = self.writer.write_as_bytes(variations)?;
        self.push(ResourceUpdate::AddFontInstance {
            key,
            font_key,
            glyph_size,
            options,
            platform_options,
            variations,
        });
        Ok(())
    }

    /// Delete a font instance.
    pub fn delete_font_instance(&mut self, key: FontInstanceKey) {
        self.push(ResourceUpdate::DeleteFontInstance { key });
    }

    /// Abandon the pending batch: drop all records and segments.
    pub fn clear(&mut self) {
        if !self.updates.is_empty() {
            tracing::debug!(updates = self.updates.len(), "discarding pending resource updates");
        }
        self.updates.clear();
        self.writer.clear();
    }

    /// Hand over the pending records, in call order, with their segments.
    pub fn flush(&mut self) -> ResourceBatch {
        let _span = observability::instrument_flush(
            self.updates.len(),
            self.writer.small_segment_count(),
            self.writer.large_segment_count(),
        );

        let updates = std::mem::take(&mut self.updates);
        let segments = self.writer.flush();
        tracing::debug!(
            updates = updates.len(),
            bytes = segments.total_bytes(),
            "flushed resource batch"
        );
        observability::record_batch_flushed(updates.len());

        ResourceBatch { updates, segments }
    }

    /// Pending records, oldest first.
    pub fn updates(&self) -> &[ResourceUpdate] {
        &self.updates
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.writer.is_empty()
    }

    /// The configured small segment size.
    pub fn chunk_size(&self) -> usize {
        self.writer.chunk_size()
    }

    /// The segment allocator payloads are written to.
    pub fn allocator(&self) -> &A {
        self.writer.allocator()
    }

    fn push(&mut self, update: ResourceUpdate) {
        tracing::trace!(kind = %update.kind(), "queued resource update");
        self.updates.push(update);
    }
}

impl<A> std::fmt::Debug for ResourceUpdateQueue<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceUpdateQueue")
            .field("writer", &self.writer)
            .field("updates", &self.updates.len())
            .finish()
    }
}

/// One flushed batch: ordered records plus the segments they address.
///
/// This is the unit the transport moves between processes. On the receiving
/// side it is rebuilt with [`from_parts`](Self::from_parts).
#[derive(Debug, Default)]
pub struct ResourceBatch {
    updates: Vec<ResourceUpdate>,
    segments: SegmentSet,
}

impl ResourceBatch {
    /// Assemble a batch from received records and segments.
    pub fn from_parts(updates: Vec<ResourceUpdate>, segments: SegmentSet) -> Self {
        Self { updates, segments }
    }

    /// Records in the order they were queued.
    pub fn updates(&self) -> &[ResourceUpdate] {
        &self.updates
    }

    /// The segments payloads were written to.
    pub fn segments(&self) -> &SegmentSet {
        &self.segments
    }

    /// Returns true if the batch holds no records and no segments.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.segments.is_empty()
    }

    /// A reader over this batch's segments.
    pub fn reader(&self) -> SegmentReader<'_> {
        self.segments.reader()
    }

    /// Copy out the inline payload of `update`, if it has one.
    pub fn payload(&self, update: &ResourceUpdate) -> Result<Option<Vec<u8>>> {
        update
            .payload()
            .map(|range| self.reader().read_to_vec(&range))
            .transpose()
    }

    /// Decode the variation axes of an `AddFontInstance` record.
    ///
    /// Other records have no variations and yield an empty vector.
    pub fn font_variations(&self, update: &ResourceUpdate) -> Result<Vec<FontVariation>> {
        match update {
            ResourceUpdate::AddFontInstance { variations, .. } => {
                self.reader().read_typed(variations)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Split into `(records, segments)`.
    pub fn into_parts(self) -> (Vec<ResourceUpdate>, SegmentSet) {
        (self.updates, self.segments)
    }
}
