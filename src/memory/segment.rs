//! Memory segment trait and the owned [`Segment`] handle.

use std::fmt;

/// Type of memory backing a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryType {
    /// Regular heap memory (single-process only).
    Heap,
    /// Anonymous shared memory (memfd_create + mmap).
    SharedMemory,
}

impl MemoryType {
    /// Can this memory type be shared across processes on the same machine?
    #[inline]
    pub fn supports_ipc(&self) -> bool {
        match self {
            MemoryType::Heap => false,
            MemoryType::SharedMemory => true,
        }
    }
}

/// Handle for sharing memory across processes.
///
/// The transport layer sends this to the receiving process, which maps the
/// same memory with [`SharedMemorySegment::from_fd`](super::SharedMemorySegment::from_fd).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcHandle {
    /// File descriptor of a memfd.
    /// The fd should be sent via SCM_RIGHTS over a Unix socket.
    Fd {
        /// The raw file descriptor.
        fd: std::os::unix::io::RawFd,
        /// Size of the memory region.
        size: usize,
    },
}

/// Which list a segment (and an address into it) belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
#[rkyv(derive(Debug, PartialEq, Eq))]
#[repr(u8)]
pub enum SegmentClass {
    /// Fixed chunk-size segments shared by many small payloads.
    Small = 0,
    /// A segment dedicated to one payload larger than the chunk size.
    Large = 1,
}

impl fmt::Display for SegmentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Large => write!(f, "large"),
        }
    }
}

/// Trait for memory segment backends.
///
/// A memory segment represents a contiguous region of memory that can be
/// used as payload storage.
///
/// # Safety
///
/// Implementations must ensure that:
/// - Pointers remain valid for the lifetime of the segment
/// - Thread-safety requirements are met (Send + Sync)
pub trait MemorySegment: Send + Sync {
    /// Get a raw pointer to the start of this segment.
    fn as_ptr(&self) -> *const u8;

    /// Get a mutable pointer to the start of this segment.
    ///
    /// Returns `None` if the segment is read-only.
    fn as_mut_ptr(&self) -> Option<*mut u8>;

    /// Total size of the segment in bytes.
    fn len(&self) -> usize;

    /// Returns true if the segment has zero length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type of memory backing this segment.
    fn memory_type(&self) -> MemoryType;

    /// Get an IPC handle for sharing this segment with other processes.
    ///
    /// Returns `None` if this segment type doesn't support cross-process sharing.
    fn ipc_handle(&self) -> Option<IpcHandle>;
}

/// An owned block of memory produced by a
/// [`SegmentAllocator`](super::SegmentAllocator).
///
/// A `Segment` is move-only. The writer owns it until flush; afterwards the
/// caller (and the transport) owns it. Because it is the sole in-process
/// handle to its backing memory, slice access follows ordinary borrow rules.
pub struct Segment {
    memory: Box<dyn MemorySegment>,
}

impl Segment {
    /// Wrap a backing memory segment.
    pub fn new(memory: impl MemorySegment + 'static) -> Self {
        Self {
            memory: Box::new(memory),
        }
    }

    /// Wrap an already boxed backing segment.
    pub fn from_boxed(memory: Box<dyn MemorySegment>) -> Self {
        Self { memory }
    }

    /// Size of the segment in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if the segment has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Whether the segment can be written through.
    pub fn is_writable(&self) -> bool {
        self.memory.as_mut_ptr().is_some()
    }

    /// The type of memory backing this segment.
    pub fn memory_type(&self) -> MemoryType {
        self.memory.memory_type()
    }

    /// IPC handle for the transport layer, if the memory is shareable.
    pub fn ipc_handle(&self) -> Option<IpcHandle> {
        self.memory.ipc_handle()
    }

    /// The segment contents.
    pub fn as_slice(&self) -> &[u8] {
        let len = self.memory.len();
        if len == 0 {
            return &[];
        }
        // SAFETY: the backend guarantees `len` valid bytes at `as_ptr` for as
        // long as it lives, and this `Segment` is its only in-process owner.
        unsafe { std::slice::from_raw_parts(self.memory.as_ptr(), len) }
    }

    /// Mutable access to the segment contents.
    ///
    /// Returns `None` for read-only segments.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        let len = self.memory.len();
        let ptr = self.memory.as_mut_ptr()?;
        if len == 0 {
            return Some(&mut []);
        }
        // SAFETY: `&mut self` gives exclusive access to the only in-process
        // handle of this memory.
        Some(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("len", &self.len())
            .field("memory_type", &self.memory_type())
            .finish()
    }
}
