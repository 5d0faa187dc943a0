// This module implements the code buffer the generator appends machine code to. A CodeBuffer
// pairs an ExecutableRegion with the number of bytes used so far and comes in two flavours:
// growable buffers quadruple their capacity (allocate, copy the used bytes, release the old
// mapping) whenever more than half of the capacity is in use, while fixed buffers wrap a region
// the caller sized up front and refuse to write past its end. Growth needs no relocation pass
// because every displacement the generator writes is relative to the following instruction.
// Backpatching goes through patch_rel32, which checks that the four target bytes still hold the
// placeholder sentinel before overwriting them.

//! Append-only code buffer backed by executable memory.

use crate::core::error::{AllocError, CompileError, CompileResult};
use crate::core::exec_mem::ExecutableRegion;
use crate::x64::snippets::{Snippet, MAX_SNIPPET_LEN, PLACEHOLDER};

/// Capacity multiplier applied on every growth step.
pub const GROWTH_FACTOR: usize = 4;

/// Machine code under construction.
#[derive(Debug)]
pub struct CodeBuffer {
    region: ExecutableRegion,
    len: usize,
    growable: bool,
    growth_steps: usize,
}

impl CodeBuffer {
    /// A buffer that reallocates itself as code is appended.
    pub fn growable(capacity: usize) -> Result<Self, AllocError> {
        let region = ExecutableRegion::allocate(capacity)?;
        Ok(Self {
            region,
            len: 0,
            growable: true,
            growth_steps: 0,
        })
    }

    /// A buffer that never grows past `region`.
    pub fn fixed(region: ExecutableRegion) -> Self {
        Self {
            region,
            len: 0,
            growable: false,
            growth_steps: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    pub fn is_growable(&self) -> bool {
        self.growable
    }

    pub fn growth_steps(&self) -> usize {
        self.growth_steps
    }

    /// Bytes emitted so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.region.as_slice()[..self.len]
    }

    /// Whether the next append should be preceded by a growth step.
    ///
    /// The threshold is taken from the current capacity on every call.
    pub fn should_grow(&self) -> bool {
        self.is_growable() && self.len >= self.capacity() / 2
    }

    /// Move the code into a region `GROWTH_FACTOR` times larger.
    pub fn grow(&mut self) -> Result<(), AllocError> {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity.saturating_mul(GROWTH_FACTOR);

        let mut region = ExecutableRegion::allocate(new_capacity)?;
        let dst = region.as_mut_slice().ok_or(AllocError::Sealed)?;
        dst[..self.len].copy_from_slice(&self.region.as_slice()[..self.len]);

        let old = std::mem::replace(&mut self.region, region);
        if let Err(e) = old.release() {
            log::warn!("could not release old code buffer: {}", e);
        }
        self.growth_steps += 1;

        log::debug!(
            "code buffer grew from {} to {} bytes ({} in use)",
            old_capacity,
            new_capacity,
            self.len
        );
        Ok(())
    }

    /// Grow, treating failure as fatal.
    ///
    /// A compile cannot continue once it has lost its buffer, so the process
    /// is aborted.
    pub fn grow_or_abort(&mut self) {
        if let Err(e) = self.grow() {
            log::error!("code buffer growth failed: {}", e);
            std::process::abort();
        }
    }

    /// Append `snippet`, returning the offset it starts at.
    pub fn emit(&mut self, snippet: &Snippet) -> CompileResult<usize> {
        debug_assert!(snippet.len() <= MAX_SNIPPET_LEN, "{} is too long", snippet.name);
        while self.len + snippet.len() > self.capacity() {
            if !self.is_growable() {
                return Err(CompileError::CodeBufferFull {
                    capacity: self.capacity(),
                });
            }
            self.grow_or_abort();
        }

        let start = self.len;
        let dst = self.region.as_mut_slice().ok_or(AllocError::Sealed)?;
        dst[start..start + snippet.len()].copy_from_slice(snippet.bytes);
        self.len += snippet.len();
        Ok(start)
    }

    /// Overwrite the placeholder at `offset` with `value`.
    pub fn patch_rel32(&mut self, offset: usize, value: i32) -> CompileResult<()> {
        let end = offset + PLACEHOLDER.len();
        if end > self.len {
            return Err(CompileError::PlaceholderCorrupted { offset });
        }

        let dst = self.region.as_mut_slice().ok_or(AllocError::Sealed)?;
        let field = &mut dst[offset..end];
        if field != PLACEHOLDER {
            return Err(CompileError::PlaceholderCorrupted { offset });
        }
        field.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Read back a rel32 field.
    pub fn read_rel32(&self, offset: usize) -> Option<i32> {
        let bytes = self.as_slice().get(offset..offset + 4)?;
        Some(i32::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Give up the region together with the number of bytes in use.
    pub fn into_parts(self) -> (ExecutableRegion, usize) {
        (self.region, self.len)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::x64::snippets;

    #[test]
    fn test_emit_appends_bytes() {
        let mut buffer = CodeBuffer::growable(256).unwrap();
        assert_eq!(buffer.emit(&snippets::PROLOGUE).unwrap(), 0);
        let at = buffer.emit(&snippets::INCREMENT_CELL).unwrap();
        assert_eq!(at, snippets::PROLOGUE.len());
        assert_eq!(&buffer.as_slice()[at..], snippets::INCREMENT_CELL.bytes);
    }

    #[test]
    fn test_growth_preserves_code_and_recomputes_threshold() {
        let mut buffer = CodeBuffer::growable(64).unwrap();
        while !buffer.should_grow() {
            buffer.emit(&snippets::OUTPUT_BYTE).unwrap();
        }
        let before = buffer.as_slice().to_vec();

        buffer.grow().unwrap();
        assert_eq!(buffer.capacity(), 256);
        assert_eq!(buffer.growth_steps(), 1);
        assert_eq!(buffer.as_slice(), before.as_slice());
        // Half of the new capacity is well above what is in use.
        assert!(!buffer.should_grow());
    }

    #[test]
    fn test_fixed_buffer_refuses_overflow() {
        let region = ExecutableRegion::allocate(20).unwrap();
        let mut buffer = CodeBuffer::fixed(region);
        assert!(!buffer.is_growable());
        assert!(!buffer.should_grow());
        buffer.emit(&snippets::PROLOGUE).unwrap();
        let err = buffer.emit(&snippets::EPILOGUE).unwrap_err();
        assert!(matches!(err, CompileError::CodeBufferFull { capacity: 20 }));
        assert_eq!(buffer.len(), snippets::PROLOGUE.len());
    }

    #[test]
    fn test_emit_grows_when_snippet_does_not_fit() {
        let mut buffer = CodeBuffer::growable(8).unwrap();
        assert!(buffer.is_growable());
        buffer.emit(&snippets::PROLOGUE).unwrap();
        assert_eq!(buffer.capacity(), 32);
        assert_eq!(buffer.as_slice(), snippets::PROLOGUE.bytes);
    }

    #[test]
    fn test_patch_checks_sentinel() {
        let mut buffer = CodeBuffer::growable(64).unwrap();
        let at = buffer.emit(&snippets::LOOP_EXIT).unwrap();
        buffer.patch_rel32(at + 1, -5).unwrap();
        assert_eq!(buffer.read_rel32(at + 1), Some(-5));

        let err = buffer.patch_rel32(at + 1, 7).unwrap_err();
        assert!(matches!(err, CompileError::PlaceholderCorrupted { offset: 1 }));
    }

    #[test]
    fn test_patch_outside_code_is_rejected() {
        let mut buffer = CodeBuffer::growable(64).unwrap();
        buffer.emit(&snippets::INCREMENT_CELL).unwrap();
        assert!(buffer.patch_rel32(0, 1).is_err());
    }
}
