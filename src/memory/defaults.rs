//! Default segment sizes and configuration constants.
//!
//! Small segments are carved from shared memory grants. The smallest grant
//! on some platforms is 64 KiB, and each grant carries a guard page on
//! either side, so the default chunk size leaves room for both guards
//! inside one grant.

/// Page size assumed for guard regions.
pub const PAGE_SIZE: usize = 4096;

/// Minimum shared memory allocation granularity (64 KiB).
pub const SHMEM_GRANULARITY: usize = 64 * 1024;

/// Size of each guard region around a shared memory grant.
pub const GUARD_PAGE_SIZE: usize = PAGE_SIZE;

/// Default chunk size for small segments: 64 KiB minus two guard pages.
pub const DEFAULT_CHUNK_SIZE: usize = SHMEM_GRANULARITY - 2 * GUARD_PAGE_SIZE;

/// Round `size` up to a multiple of `page`.
///
/// Returns `None` on overflow. `page` must be a power of two.
pub const fn round_up_to_page(size: usize, page: usize) -> Option<usize> {
    match size.checked_add(page - 1) {
        Some(padded) => Some(padded & !(page - 1)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_size() {
        assert_eq!(DEFAULT_CHUNK_SIZE, 57344);
        assert_eq!(DEFAULT_CHUNK_SIZE % PAGE_SIZE, 0);
    }

    #[test]
    fn test_round_up_to_page() {
        assert_eq!(round_up_to_page(0, 4096), Some(0));
        assert_eq!(round_up_to_page(1, 4096), Some(4096));
        assert_eq!(round_up_to_page(4096, 4096), Some(4096));
        assert_eq!(round_up_to_page(4097, 4096), Some(8192));
        assert_eq!(round_up_to_page(usize::MAX, 4096), None);
    }
}
