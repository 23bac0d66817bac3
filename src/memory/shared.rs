//! Shared memory segment using Linux memfd.
//!
//! Segments created here can be handed to another process by passing the
//! file descriptor over a Unix socket; the receiver maps the same pages with
//! [`SharedMemorySegment::from_fd`].

use super::{IpcHandle, MemorySegment, MemoryType};
use crate::error::{Error, Result};
use rustix::fd::{AsFd, BorrowedFd, OwnedFd};
use rustix::mm::{MapFlags, ProtFlags};
use std::ffi::CString;
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr::NonNull;

/// A memory segment backed by Linux memfd (anonymous shared memory).
///
/// - Anonymous: no filesystem visibility (unlike `shm_open`)
/// - Auto-cleanup: the kernel reclaims memory when all references are closed
pub struct SharedMemorySegment {
    fd: OwnedFd,
    ptr: NonNull<u8>,
    len: usize,
    /// Debug name, visible in `/proc/self/fd/`. `None` for received segments.
    name: Option<String>,
}

impl SharedMemorySegment {
    /// Create a new shared memory segment.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is 0 or if `memfd_create`, `ftruncate`, or
    /// `mmap` fails.
    pub fn new(name: &str, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::AllocationFailed(
                "size must be greater than 0".into(),
            ));
        }

        let cname = CString::new(name).map_err(|e| Error::AllocationFailed(e.to_string()))?;
        let fd = rustix::fs::memfd_create(&cname, rustix::fs::MemfdFlags::CLOEXEC)?;
        rustix::fs::ftruncate(&fd, size as u64)?;

        let ptr = unsafe { map_shared(&fd, size)? };

        Ok(Self {
            fd,
            ptr,
            len: size,
            name: Some(name.to_string()),
        })
    }

    /// Map a segment received from another process.
    ///
    /// The size travels separately from the fd, so it is checked against the
    /// memfd's real size before mapping; touching pages past the end of the
    /// file would fault.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `fd` refers to a memfd (or another
    /// shared, mappable file) that no other party truncates while mapped.
    pub unsafe fn from_fd(fd: OwnedFd, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidSegment("size must be greater than 0".into()));
        }

        let stat = rustix::fs::fstat(&fd)?;
        let actual = usize::try_from(stat.st_size).unwrap_or(0);
        if actual < size {
            return Err(Error::InvalidSegment(format!(
                "fd holds {actual} bytes, {size} requested"
            )));
        }

        let ptr = unsafe { map_shared(&fd, size)? };

        Ok(Self {
            fd,
            ptr,
            len: size,
            name: None,
        })
    }

    /// Get the raw file descriptor.
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Get the debug name of this segment.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Map `size` bytes of `fd` read-write and shared.
///
/// # Safety
///
/// `fd` must be at least `size` bytes long.
unsafe fn map_shared(fd: &OwnedFd, size: usize) -> Result<NonNull<u8>> {
    let ptr = unsafe {
        rustix::mm::mmap(
            std::ptr::null_mut(),
            size,
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::SHARED,
            fd,
            0,
        )?
    };

    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| Error::AllocationFailed("mmap returned null".into()))
}

impl MemorySegment for SharedMemorySegment {
    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn as_mut_ptr(&self) -> Option<*mut u8> {
        Some(self.ptr.as_ptr())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_type(&self) -> MemoryType {
        MemoryType::SharedMemory
    }

    fn ipc_handle(&self) -> Option<IpcHandle> {
        Some(IpcHandle::Fd {
            fd: self.fd.as_raw_fd(),
            size: self.len,
        })
    }
}

impl Drop for SharedMemorySegment {
    fn drop(&mut self) {
        unsafe {
            let _ = rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len);
        }
        // fd is closed when OwnedFd is dropped
    }
}

// SAFETY: the mapping is process-wide and the fd is reference-counted by the
// kernel; no thread-local state is held.
unsafe impl Send for SharedMemorySegment {}
unsafe impl Sync for SharedMemorySegment {}

impl AsFd for SharedMemorySegment {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
