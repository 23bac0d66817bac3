//! Observability: metrics and tracing.
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `ferry_segments_allocated` | Counter | Segments obtained from the allocator, by `class` |
//! | `ferry_segment_bytes_allocated` | Counter | Bytes of segment memory obtained, by `class` |
//! | `ferry_bytes_written` | Counter | Payload bytes written, by `class` |
//! | `ferry_allocation_failures` | Counter | Allocator requests that failed |
//! | `ferry_batches_flushed` | Counter | Queue flushes |
//! | `ferry_updates_flushed` | Counter | Update records emitted by flushes |
//! | `ferry_batch_updates` | Histogram | Update records per flushed batch |
//! | `ferry_read_failures` | Counter | Reads rejected as out of range |
//!
//! Nothing is exported unless the application installs a `metrics` recorder.
//!
//! ## Tracing
//!
//! Flushes run inside a `flush` span; allocations and read failures are
//! logged at `trace`/`debug`/`warn`.

mod metrics;
mod tracing_support;

pub use self::metrics::{
    init_metrics, record_allocation, record_allocation_failure, record_batch_flushed,
    record_bytes_written, record_read_failure,
};
pub use tracing_support::{instrument_flush, span_flush};
