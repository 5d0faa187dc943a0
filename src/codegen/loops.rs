// This module implements loop bookkeeping for the single-pass generator. Every open `[` has a
// LoopFrame on a bounded LoopStack recording where the entry test starts, the still-unresolved
// forward branch inside it, and where the loop body begins. Branch fields are modelled as a
// PatchSite that is either Pending (field offset, the offset the displacement is measured from,
// and which branch it is) or Committed (the displacement that was written), so a placeholder can
// never be resolved twice. Closing a loop emits the backward jump and resolves both branches:
// the entry test skips to just past the backward jump, and the backward jump returns to the top
// of the entry test so the cell is tested again on every iteration. The stack depth is bounded
// and checked before anything is emitted for a new loop.

//! Loop nesting tracker and backpatching.

use crate::core::error::{CompileError, CompileResult, SourceLocation};
use crate::x64::snippets::{self, Snippet};

use super::buffer::CodeBuffer;

/// Nesting bound used when none is configured.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Which of the two loop branches a patch site belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// `je` in the entry test, taken when the cell is zero.
    SkipLoop,
    /// `jmp` at the end of the body, back to the entry test.
    Repeat,
}

/// A rel32 field in emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSite {
    Pending {
        field: usize,
        origin: usize,
        kind: BranchKind,
    },
    Committed {
        field: usize,
        displacement: i32,
    },
}

impl PatchSite {
    /// Pending site for the placeholder of `snippet` emitted at `start`.
    pub fn pending(start: usize, snippet: &Snippet, kind: BranchKind) -> Option<Self> {
        let patch = snippet.patch?;
        Some(PatchSite::Pending {
            field: start + patch.offset,
            origin: start + patch.origin(),
            kind,
        })
    }

    /// Point the branch at `target` and commit it.
    pub fn resolve(&mut self, buffer: &mut CodeBuffer, target: usize) -> CompileResult<i32> {
        let (field, origin, kind) = match *self {
            PatchSite::Pending {
                field,
                origin,
                kind,
            } => (field, origin, kind),
            PatchSite::Committed { field, .. } => {
                return Err(CompileError::PlaceholderCorrupted { offset: field })
            }
        };

        let displacement = i32::try_from(target as i64 - origin as i64).map_err(|_| {
            CompileError::BranchOutOfRange {
                from: origin,
                to: target,
            }
        })?;
        buffer.patch_rel32(field, displacement)?;
        log::trace!("patched {:?} at {:#x}: {:+}", kind, field, displacement);

        *self = PatchSite::Committed {
            field,
            displacement,
        };
        Ok(displacement)
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, PatchSite::Committed { .. })
    }
}

/// Bookkeeping for one open loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopFrame {
    /// Offset of the entry test.
    pub loop_top: usize,
    /// The entry test's forward branch.
    pub entry: PatchSite,
    /// Offset of the first body instruction.
    pub body_start: usize,
    /// Where the `[` appeared in the source.
    pub opened_at: SourceLocation,
}

/// Bounded stack of open loops.
#[derive(Debug)]
pub struct LoopStack {
    frames: Vec<LoopFrame>,
    limit: usize,
}

impl LoopStack {
    pub fn new(limit: usize) -> Self {
        Self {
            frames: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Emit the entry test for a `[` at `location`.
    pub fn open(&mut self, buffer: &mut CodeBuffer, location: SourceLocation) -> CompileResult<()> {
        if self.frames.len() >= self.limit {
            return Err(CompileError::NestingTooDeep {
                limit: self.limit,
                location,
            });
        }

        let loop_top = buffer.emit(&snippets::LOOP_ENTRY)?;
        let entry = PatchSite::pending(loop_top, &snippets::LOOP_ENTRY, BranchKind::SkipLoop)
            .ok_or(CompileError::PlaceholderCorrupted { offset: loop_top })?;
        let body_start = buffer.len();

        self.frames.push(LoopFrame {
            loop_top,
            entry,
            body_start,
            opened_at: location,
        });
        log::trace!("loop {} opened at {:#x}", self.frames.len(), loop_top);
        Ok(())
    }

    /// Emit the backward jump for a `]` at `location` and resolve both branches.
    pub fn close(&mut self, buffer: &mut CodeBuffer, location: SourceLocation) -> CompileResult<LoopFrame> {
        let mut frame = self
            .frames
            .pop()
            .ok_or(CompileError::UnmatchedBracket { location })?;

        let exit_start = buffer.emit(&snippets::LOOP_EXIT)?;
        let mut exit = PatchSite::pending(exit_start, &snippets::LOOP_EXIT, BranchKind::Repeat)
            .ok_or(CompileError::PlaceholderCorrupted { offset: exit_start })?;
        let after_loop = buffer.len();

        frame.entry.resolve(buffer, after_loop)?;
        exit.resolve(buffer, frame.loop_top)?;

        log::trace!(
            "loop {} closed: {:#x}..{:#x}",
            self.frames.len() + 1,
            frame.loop_top,
            after_loop
        );
        Ok(frame)
    }

    /// Fail if any loop is still open, pointing at the innermost one.
    pub fn finish(&self) -> CompileResult<()> {
        match self.frames.last() {
            Some(frame) => Err(CompileError::UnmatchedBracket {
                location: frame.opened_at,
            }),
            None => Ok(()),
        }
    }
}
