//! Tracing helpers.

use tracing::{Level, Span, span};

/// Create a span covering one queue or writer flush.
///
/// # Example
///
/// ```rust
/// use ferry::observability::span_flush;
///
/// let span = span_flush(3, 1, 0);
/// let _guard = span.enter();
/// ```
#[inline]
pub fn span_flush(updates: usize, small_segments: usize, large_segments: usize) -> Span {
    span!(
        Level::DEBUG,
        "flush",
        updates,
        small_segments,
        large_segments
    )
}

/// Enter a flush span, returning the guard.
pub fn instrument_flush(
    updates: usize,
    small_segments: usize,
    large_segments: usize,
) -> tracing::span::EnteredSpan {
    span_flush(updates, small_segments, large_segments).entered()
}
