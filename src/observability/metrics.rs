//! Metrics collection using metrics-rs.

use crate::memory::SegmentClass;
use metrics::{Unit, counter, histogram};
use std::sync::atomic::{AtomicBool, Ordering};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const SEGMENTS_ALLOCATED: &str = "ferry_segments_allocated";
const SEGMENT_BYTES_ALLOCATED: &str = "ferry_segment_bytes_allocated";
const BYTES_WRITTEN: &str = "ferry_bytes_written";
const ALLOCATION_FAILURES: &str = "ferry_allocation_failures";
const BATCHES_FLUSHED: &str = "ferry_batches_flushed";
const UPDATES_FLUSHED: &str = "ferry_updates_flushed";
const BATCH_UPDATES: &str = "ferry_batch_updates";
const READ_FAILURES: &str = "ferry_read_failures";

/// Register metric descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        SEGMENTS_ALLOCATED,
        Unit::Count,
        "Segments obtained from the segment allocator"
    );
    metrics::describe_counter!(
        SEGMENT_BYTES_ALLOCATED,
        Unit::Bytes,
        "Bytes of segment memory obtained from the allocator"
    );
    metrics::describe_counter!(BYTES_WRITTEN, Unit::Bytes, "Payload bytes written");
    metrics::describe_counter!(
        ALLOCATION_FAILURES,
        Unit::Count,
        "Segment allocation requests that failed"
    );
    metrics::describe_counter!(BATCHES_FLUSHED, Unit::Count, "Resource batches flushed");
    metrics::describe_counter!(
        UPDATES_FLUSHED,
        Unit::Count,
        "Update records emitted by flushes"
    );
    metrics::describe_histogram!(
        BATCH_UPDATES,
        Unit::Count,
        "Update records per flushed batch"
    );
    metrics::describe_counter!(
        READ_FAILURES,
        Unit::Count,
        "Reads rejected because the address did not fit the segments"
    );
}

fn class_label(class: SegmentClass) -> &'static str {
    match class {
        SegmentClass::Small => "small",
        SegmentClass::Large => "large",
    }
}

/// Record a segment obtained from the allocator.
#[inline]
pub fn record_allocation(class: SegmentClass, bytes: usize) {
    let class = class_label(class);
    counter!(SEGMENTS_ALLOCATED, "class" => class).increment(1);
    counter!(SEGMENT_BYTES_ALLOCATED, "class" => class).increment(bytes as u64);
}

/// Record a failed allocator request.
#[inline]
pub fn record_allocation_failure(class: SegmentClass) {
    counter!(ALLOCATION_FAILURES, "class" => class_label(class)).increment(1);
}

/// Record payload bytes written.
#[inline]
pub fn record_bytes_written(class: SegmentClass, bytes: usize) {
    counter!(BYTES_WRITTEN, "class" => class_label(class)).increment(bytes as u64);
}

/// Record a flushed batch of `updates` records.
#[inline]
pub fn record_batch_flushed(updates: usize) {
    counter!(BATCHES_FLUSHED).increment(1);
    counter!(UPDATES_FLUSHED).increment(updates as u64);
    histogram!(BATCH_UPDATES).record(updates as f64);
}

/// Record a rejected read.
#[inline]
pub fn record_read_failure(class: SegmentClass) {
    counter!(READ_FAILURES, "class" => class_label(class)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_recording_without_recorder() {
        // With no recorder installed these are no-ops.
        record_allocation(SegmentClass::Small, 4096);
        record_allocation_failure(SegmentClass::Large);
        record_bytes_written(SegmentClass::Small, 10);
        record_batch_flushed(3);
        record_read_failure(SegmentClass::Small);
    }
}
