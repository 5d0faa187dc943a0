// This module owns every page of machine code brainmuk produces. ExecutableRegion wraps an
// anonymous private mapping created with libc::mmap whose protection allows reading, writing
// and executing, so the code generator can append instructions and the host can call straight
// into them. The region remembers the size that was requested, which is the size handed back to
// munmap on release; the kernel may round the mapping up to whole pages but callers never see
// more than they asked for. Regions are released explicitly with release() (reporting munmap
// failures) or implicitly on drop. seal() remaps a finished region read+execute so that
// generated code can no longer be modified, which is the write-then-execute discipline the
// compiler applies when asked to.

//! Executable memory regions.
//!
//! The code generator writes into an [`ExecutableRegion`] and hands it over to
//! the compiled program once compilation succeeds.

use std::ptr::NonNull;
use std::slice;

use super::error::AllocError;

/// Fallback when the platform does not report a page size.
const DEFAULT_PAGE_SIZE: usize = 4096;

/// A mapping with read, write and execute permission.
pub struct ExecutableRegion {
    ptr: NonNull<u8>,
    len: usize,
    sealed: bool,
}

// The region is plain memory; whoever holds `&mut` is the only writer.
unsafe impl Send for ExecutableRegion {}
unsafe impl Sync for ExecutableRegion {}

impl ExecutableRegion {
    /// Map at least `size` bytes of writable, executable memory.
    pub fn allocate(size: usize) -> Result<Self, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }

        let ptr = map_executable(size)?;
        log::trace!("mapped {} executable bytes at {:p}", size, ptr.as_ptr());

        Ok(Self {
            ptr,
            len: size,
            sealed: false,
        })
    }

    /// Unmap the region, reporting failure instead of swallowing it.
    pub fn release(self) -> Result<(), AllocError> {
        let (ptr, len) = (self.ptr, self.len);
        std::mem::forget(self);
        unmap(ptr, len)
    }

    /// Size the region was allocated with.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping is readable and `len` bytes long for the lifetime of `self`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Writable view of the region, or `None` once it has been sealed.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if self.sealed {
            return None;
        }
        // SAFETY: the mapping is writable until sealed and `&mut self` is exclusive.
        Some(unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }

    /// Drop write permission, leaving the region readable and executable.
    pub fn seal(&mut self) -> Result<(), AllocError> {
        if self.sealed {
            return Ok(());
        }
        protect_read_exec(self.ptr, self.len)?;
        self.sealed = true;
        Ok(())
    }
}

impl Drop for ExecutableRegion {
    fn drop(&mut self) {
        if let Err(e) = unmap(self.ptr, self.len) {
            log::warn!("leaking executable region: {}", e);
        }
    }
}

impl std::fmt::Debug for ExecutableRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableRegion")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("sealed", &self.sealed)
            .finish()
    }
}

/// The platform's page granularity.
#[cfg(unix)]
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        DEFAULT_PAGE_SIZE
    }
}

#[cfg(not(unix))]
pub fn page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[cfg(all(unix, not(target_os = "macos")))]
fn map_executable(size: usize) -> Result<NonNull<u8>, AllocError> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            libc::MAP_ANON | libc::MAP_PRIVATE,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(AllocError::Map {
            size,
            source: std::io::Error::last_os_error(),
        });
    }
    NonNull::new(ptr as *mut u8).ok_or(AllocError::Map {
        size,
        source: std::io::Error::other("mmap returned null"),
    })
}

#[cfg(target_os = "macos")]
fn map_executable(size: usize) -> Result<NonNull<u8>, AllocError> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_JIT,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(AllocError::Map {
            size,
            source: std::io::Error::last_os_error(),
        });
    }
    NonNull::new(ptr as *mut u8).ok_or(AllocError::Map {
        size,
        source: std::io::Error::other("mmap returned null"),
    })
}

#[cfg(unix)]
fn protect_read_exec(ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
    let rc = unsafe {
        libc::mprotect(
            ptr.as_ptr() as *mut libc::c_void,
            size,
            libc::PROT_READ | libc::PROT_EXEC,
        )
    };
    if rc != 0 {
        return Err(AllocError::Protect {
            size,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn unmap(ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
    let rc = unsafe { libc::munmap(ptr.as_ptr() as *mut libc::c_void, size) };
    if rc != 0 {
        return Err(AllocError::Unmap {
            size,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn map_executable(_size: usize) -> Result<NonNull<u8>, AllocError> {
    Err(AllocError::Unsupported)
}

#[cfg(not(unix))]
fn protect_read_exec(_ptr: NonNull<u8>, _size: usize) -> Result<(), AllocError> {
    Err(AllocError::Unsupported)
}

#[cfg(not(unix))]
fn unmap(_ptr: NonNull<u8>, _size: usize) -> Result<(), AllocError> {
    Err(AllocError::Unsupported)
}
