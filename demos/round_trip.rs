//! Producer/consumer round trip over memfd segments.
//!
//! The producer queues a few resources and flushes. The "consumer" receives
//! the framed records plus duplicated file descriptors, maps the segments
//! again and resolves every payload.
//!
//! Run with `RUST_LOG=ferry=trace cargo run --example round_trip`.

use ferry::memory::{IpcHandle, MemfdAllocator, Segment, SegmentSet, SharedMemorySegment};
use ferry::resource::{
    FontInstanceKey, FontKey, FontVariation, IdNamespace, ImageDescriptor, ImageDescriptorFlags,
    ImageFormat, ImageKey, ResourceUpdateQueue, wire,
};
use std::os::fd::BorrowedFd;
use tracing_subscriber::EnvFilter;

fn main() -> ferry::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    ferry::observability::init_metrics();

    // Producer side.
    let ns = IdNamespace(1);
    let mut queue = ResourceUpdateQueue::new(MemfdAllocator::new("round-trip"))?;

    let image = ImageKey::new(ns, 1);
    let font = FontKey::new(ns, 1);
    let descriptor = ImageDescriptor::new(4, 4, ImageFormat::Bgra8, ImageDescriptorFlags::IS_OPAQUE);

    queue.add_image(image, descriptor, &[0xFF; 64])?;
    queue.add_image(ImageKey::new(ns, 2), descriptor, &[0x80; 64])?;
    queue.delete_image(ImageKey::new(ns, 2));
    queue.add_raw_font(font, &vec![0x42; 100 * 1024], 0)?;
    queue.add_font_instance(
        FontInstanceKey::new(ns, 1),
        font,
        14.0,
        None,
        None,
        &[FontVariation::new(*b"wght", 700.0)],
    )?;

    let batch = queue.flush();
    let framed = wire::frame_batch(&batch)?;
    let (_, segments) = batch.into_parts();

    // "Transport": duplicate every fd, then drop the producer's mappings.
    let remap = |list: &[Segment]| -> ferry::Result<Vec<Segment>> {
        list.iter()
            .map(|segment| {
                let Some(IpcHandle::Fd { fd, size }) = segment.ipc_handle() else {
                    return Err(ferry::Error::InvalidSegment(
                        "segment has no fd to share".into(),
                    ));
                };
                let dup = rustix::io::fcntl_dupfd_cloexec(
                    unsafe { BorrowedFd::borrow_raw(fd) },
                    0,
                )?;
                // SAFETY: `dup` is a freshly duplicated memfd of at least `size` bytes.
                let shared = unsafe { SharedMemorySegment::from_fd(dup, size)? };
                Ok(Segment::new(shared))
            })
            .collect()
    };
    let received = SegmentSet::new(remap(segments.small())?, remap(segments.large())?);
    drop(segments);

    // Consumer side.
    let Some((wire_batch, _)) = wire::unframe_batch(&framed)? else {
        return Err(ferry::Error::ValidationFailed("truncated frame".into()));
    };
    let batch = wire_batch.into_batch(received)?;

    for update in batch.updates() {
        let payload = batch.payload(update)?.map_or(0, |bytes| bytes.len());
        let target = update
            .image_key()
            .map_or_else(String::new, |key| key.to_string());
        let marker = if update.is_delete() { "-" } else { "+" };
        println!(
            "{marker} {:<20} {:<12} {:>8} bytes",
            update.kind().to_string(),
            target,
            payload
        );
    }
    println!(
        "{} small / {} large segments, {} bytes mapped",
        batch.segments().small().len(),
        batch.segments().large().len(),
        batch.segments().total_bytes()
    );

    Ok(())
}
