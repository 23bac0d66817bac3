//! Integration tests for the resource update queue.
//!
//! A small in-test "resource cache" plays the consumer: it applies a
//! received batch in order, which is how ordering mistakes would surface.

use ferry::Error;
use ferry::memory::{BoundedAllocator, HeapAllocator, HeapSegment, Segment, SegmentSet};
use ferry::resource::{
    ExternalImageId, ExternalImageType, FontInstanceKey, FontInstanceOptions, FontKey,
    FontRenderMode, FontVariation, IdNamespace, ImageDescriptor, ImageDescriptorFlags,
    ImageFormat, ImageKey, QueueConfig, ResourceBatch, ResourceUpdate, ResourceUpdateQueue,
    TextureTarget, UpdateKind, wire,
};
use std::collections::HashMap;

const NS: IdNamespace = IdNamespace(2);

fn rgba(width: u32, height: u32) -> ImageDescriptor {
    ImageDescriptor::new(width, height, ImageFormat::Rgba8, ImageDescriptorFlags::empty())
}

fn queue_with_chunk(chunk_size: usize) -> ResourceUpdateQueue<HeapAllocator> {
    ResourceUpdateQueue::with_config(HeapAllocator, QueueConfig::default().with_chunk_size(chunk_size))
        .unwrap()
}

/// What the consumer ends up holding for each key.
#[derive(Debug, Default)]
struct Cache {
    images: HashMap<ImageKey, Vec<u8>>,
    external: HashMap<ImageKey, ExternalImageId>,
    fonts: HashMap<FontKey, (Vec<u8>, u32)>,
    instances: HashMap<FontInstanceKey, (FontKey, Vec<FontVariation>)>,
}

impl Cache {
    fn apply(&mut self, batch: &ResourceBatch) -> ferry::Result<()> {
        for update in batch.updates() {
            match update {
                ResourceUpdate::AddImage { key, bytes, .. }
                | ResourceUpdate::UpdateImage { key, bytes, .. }
                | ResourceUpdate::AddBlobImage { key, bytes, .. }
                | ResourceUpdate::UpdateBlobImage { key, bytes, .. } => {
                    self.images.insert(*key, batch.reader().read_to_vec(bytes)?);
                }
                ResourceUpdate::AddExternalImage { key, external_id }
                | ResourceUpdate::UpdateExternalImage {
                    key, external_id, ..
                } => {
                    self.external.insert(*key, *external_id);
                }
                ResourceUpdate::DeleteImage { key } => {
                    self.images.remove(key);
                    self.external.remove(key);
                }
                ResourceUpdate::AddFont { key, bytes, index } => {
                    self.fonts
                        .insert(*key, (batch.reader().read_to_vec(bytes)?, *index));
                }
                ResourceUpdate::DeleteFont { key } => {
                    self.fonts.remove(key);
                }
                ResourceUpdate::AddFontInstance { key, font_key, .. } => {
                    let variations = batch.font_variations(update)?;
                    self.instances.insert(*key, (*font_key, variations));
                }
                ResourceUpdate::DeleteFontInstance { key } => {
                    self.instances.remove(key);
                }
            }
        }
        Ok(())
    }
}

/// Move a batch "across processes": frame the records, copy the segments.
fn transport(batch: ResourceBatch) -> ResourceBatch {
    let framed = wire::frame_batch(&batch).unwrap();
    let (_, segments) = batch.into_parts();

    let copy = |list: &[Segment]| -> Vec<Segment> {
        list.iter()
            .map(|s| Segment::new(HeapSegment::from_vec(s.as_slice().to_vec())))
            .collect()
    };
    let received = SegmentSet::new(copy(segments.small()), copy(segments.large()));
    drop(segments);

    let (wire_batch, consumed) = wire::unframe_batch(&framed).unwrap().unwrap();
    assert_eq!(consumed, framed.len());
    wire_batch.into_batch(received).unwrap()
}

// ============================================================================
// Ordering
// ============================================================================

/// AddImage(K1), DeleteImage(K1), AddImage(K1) arrive in that order.
#[test]
fn test_add_delete_add_order_preserved() {
    let mut queue = queue_with_chunk(64);
    let key = ImageKey::new(NS, 1);

    queue.add_image(key, rgba(1, 1), b"one!").unwrap();
    queue.delete_image(key);
    queue.add_image(key, rgba(1, 1), b"two!").unwrap();

    let batch = transport(queue.flush());
    let kinds: Vec<_> = batch.updates().iter().map(|u| u.kind()).collect();
    assert_eq!(
        kinds,
        [UpdateKind::AddImage, UpdateKind::DeleteImage, UpdateKind::AddImage]
    );
    assert!(batch.updates().iter().all(|u| u.image_key() == Some(key)));
    let deletes: Vec<_> = batch.updates().iter().map(|u| u.is_delete()).collect();
    assert_eq!(deletes, [false, true, false]);

    let mut cache = Cache::default();
    cache.apply(&batch).unwrap();
    assert_eq!(cache.images[&key], b"two!");
}

/// Every operation, applied in order on the consumer side.
#[test]
fn test_every_operation_end_to_end() {
    let mut queue = queue_with_chunk(256);

    let photo = ImageKey::new(NS, 1);
    let blob = ImageKey::new(NS, 2);
    let video = ImageKey::new(NS, 3);
    let doomed = ImageKey::new(NS, 4);
    let font = FontKey::new(NS, 1);
    let old_font = FontKey::new(NS, 2);
    let instance = FontInstanceKey::new(NS, 1);
    let old_instance = FontInstanceKey::new(NS, 2);

    let pixels = vec![0x11; 8 * 8 * 4];
    let new_pixels = vec![0x22; 8 * 8 * 4];
    let font_bytes = vec![0x33; 1000];
    let variations = [FontVariation::new(*b"wght", 300.0)];

    queue.add_image(photo, rgba(8, 8), &pixels).unwrap();
    queue.add_blob_image(blob, rgba(64, 64), b"blob v1").unwrap();
    queue.add_external_image(video, ExternalImageId(100));
    queue.add_image(doomed, rgba(1, 1), &[0; 4]).unwrap();
    queue.update_image_buffer(photo, rgba(8, 8), &new_pixels).unwrap();
    queue.update_blob_image(blob, rgba(64, 64), b"blob v2").unwrap();
    queue.update_external_image(
        video,
        rgba(1920, 1080),
        ExternalImageId(101),
        ExternalImageType::TextureHandle(TextureTarget::External),
        1,
    );
    queue.delete_image(doomed);
    queue.add_raw_font(font, &font_bytes, 2).unwrap();
    queue.add_raw_font(old_font, b"old", 0).unwrap();
    queue.delete_font(old_font);
    queue
        .add_font_instance(
            instance,
            font,
            16.0,
            Some(FontInstanceOptions {
                render_mode: FontRenderMode::Alpha,
                ..Default::default()
            }),
            None,
            &variations,
        )
        .unwrap();
    queue
        .add_font_instance(old_instance, font, 10.0, None, None, &[])
        .unwrap();
    queue.delete_font_instance(old_instance);

    assert_eq!(queue.len(), 14);
    let batch = transport(queue.flush());
    assert!(queue.is_empty());

    let mut cache = Cache::default();
    cache.apply(&batch).unwrap();

    assert_eq!(cache.images[&photo], new_pixels);
    assert_eq!(cache.images[&blob], b"blob v2");
    assert!(!cache.images.contains_key(&doomed));
    assert_eq!(cache.external[&video], ExternalImageId(101));
    assert_eq!(cache.fonts[&font], (font_bytes, 2));
    assert!(!cache.fonts.contains_key(&old_font));
    assert_eq!(cache.instances[&instance], (font, variations.to_vec()));
    assert!(!cache.instances.contains_key(&old_instance));
}

/// The font file above exceeds the chunk size and travels in a large segment.
#[test]
fn test_large_payload_uses_large_segment() {
    let mut queue = queue_with_chunk(128);
    queue
        .add_raw_font(FontKey::new(NS, 1), &[9; 129], 0)
        .unwrap();
    queue
        .add_raw_font(FontKey::new(NS, 2), &[8; 128], 0)
        .unwrap();

    let batch = queue.flush();
    assert_eq!(batch.segments().large().len(), 1);
    assert_eq!(batch.segments().small().len(), 1);

    let payloads: Vec<_> = batch
        .updates()
        .iter()
        .map(|u| batch.payload(u).unwrap().unwrap())
        .collect();
    assert_eq!(payloads, [vec![9; 129], vec![8; 128]]);
}

// ============================================================================
// Failure handling
// ============================================================================

/// A failed payload write records nothing and leaves earlier records intact.
#[test]
fn test_out_of_memory_mid_batch() {
    let allocator = BoundedAllocator::new(HeapAllocator, 256);
    let mut queue =
        ResourceUpdateQueue::with_config(&allocator, QueueConfig::default().with_chunk_size(128))
            .unwrap();

    let key = ImageKey::new(NS, 1);
    queue.add_image(key, rgba(4, 4), &[1; 64]).unwrap();
    queue.add_image(key, rgba(4, 4), &[2; 64]).unwrap();
    queue.add_image(key, rgba(4, 4), &[3; 64]).unwrap();

    // Segment 1 has 64 bytes left; 65 needs a third segment, over budget.
    let wide = ImageDescriptor::new(65, 1, ImageFormat::R8, ImageDescriptorFlags::empty());
    let err = queue.add_image(key, wide, &[4; 65]).unwrap_err();
    assert!(matches!(err, Error::AllocationFailed(_)));

    // Payload-free operations still succeed.
    queue.delete_image(key);

    let batch = queue.flush();
    assert_eq!(batch.updates().len(), 4);
    assert_eq!(batch.updates()[3].kind(), UpdateKind::DeleteImage);
    assert_eq!(batch.payload(&batch.updates()[2]).unwrap(), Some(vec![3; 64]));
    assert_eq!(batch.segments().small().len(), 2);
    assert_eq!(allocator.used(), 256);
}

/// Clearing after a failure abandons the batch; the queue is reusable.
#[test]
fn test_clear_abandons_batch() {
    let allocator = BoundedAllocator::new(HeapAllocator, 128);
    let mut queue =
        ResourceUpdateQueue::with_config(&allocator, QueueConfig::default().with_chunk_size(128))
            .unwrap();

    queue.add_raw_font(FontKey::new(NS, 1), &[0; 100], 0).unwrap();
    assert!(queue.add_raw_font(FontKey::new(NS, 2), &[0; 100], 0).is_err());

    queue.clear();
    assert!(queue.flush().is_empty());

    allocator.reset();
    queue.add_raw_font(FontKey::new(NS, 3), b"fresh", 0).unwrap();
    let batch = queue.flush();
    assert_eq!(batch.updates().len(), 1);
    assert_eq!(batch.payload(&batch.updates()[0]).unwrap(), Some(b"fresh".to_vec()));
}

/// Records paired with the wrong segments fail to resolve instead of
/// returning someone else's bytes.
#[test]
fn test_records_against_foreign_segments() {
    let mut first = queue_with_chunk(32);
    first.add_raw_font(FontKey::new(NS, 1), &[1; 30], 0).unwrap();
    first.add_raw_font(FontKey::new(NS, 2), &[2; 30], 0).unwrap();
    first.add_raw_font(FontKey::new(NS, 3), &[3; 40], 0).unwrap();
    let (updates, _) = first.flush().into_parts();

    let mut second = queue_with_chunk(16);
    second.add_raw_font(FontKey::new(NS, 9), &[9; 4], 0).unwrap();
    let (_, segments) = second.flush().into_parts();

    let mismatched = ResourceBatch::from_parts(updates, segments);
    for update in mismatched.updates() {
        assert!(matches!(
            mismatched.payload(update),
            Err(Error::AddressOutOfRange { .. })
        ));
    }
}

#[test]
fn test_frame_updates_round_trip_after_flush() {
    let mut queue = queue_with_chunk(64);
    queue.add_external_image(ImageKey::new(NS, 5), ExternalImageId(1));
    queue.add_image(ImageKey::new(NS, 6), rgba(2, 1), &[5; 8]).unwrap();
    let batch = queue.flush();

    let framed = wire::frame_updates(batch.updates()).unwrap();
    let (decoded, _) = wire::unframe_updates(&framed).unwrap().unwrap();
    assert_eq!(decoded, batch.updates());
}
