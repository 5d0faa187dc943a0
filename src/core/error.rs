// This module defines error types for the brainmuk compiler using the thiserror crate for
// idiomatic Rust error handling. CompileError is the main error enum covering every way a
// single compilation pass can fail: brackets that do not pair up, loops nested deeper than the
// bounded loop stack allows, executable memory that could not be mapped, a fixed-size code
// buffer that ran out of room, a placeholder that no longer holds its sentinel bytes, and a
// branch displacement that does not fit the rel32 encoding. Bracket errors carry the 1-based
// line and column of the offending bracket so the front end can point at it. AllocError wraps
// the operating system error reported by mmap/mprotect/munmap. The module also provides
// CompileResult<T> as a convenience alias for Result<T, CompileError>.

//! Error types for the brainmuk compiler.
//!
//! Using thiserror for more idiomatic error handling.

use std::fmt;
use std::io;

use thiserror::Error;

/// Position of a symbol in the source text, both fields 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Failure to map, protect or unmap executable memory.
#[derive(Error, Debug)]
pub enum AllocError {
    #[error("cannot allocate an empty executable region")]
    ZeroSize,

    #[error("mmap of {size} executable bytes failed: {source}")]
    Map { size: usize, source: io::Error },

    #[error("mprotect of {size} bytes failed: {source}")]
    Protect { size: usize, source: io::Error },

    #[error("munmap of {size} bytes failed: {source}")]
    Unmap { size: usize, source: io::Error },

    #[error("region is sealed read+execute and can no longer be written")]
    Sealed,

    #[error("executable memory is not supported on this platform")]
    Unsupported,
}

/// Main error type for compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("unmatched bracket at {location}")]
    UnmatchedBracket { location: SourceLocation },

    #[error("loops nested deeper than {limit} at {location}")]
    NestingTooDeep {
        limit: usize,
        location: SourceLocation,
    },

    #[error("could not allocate code buffer: {0}")]
    Allocation(#[from] AllocError),

    #[error("code buffer full ({capacity} bytes)")]
    CodeBufferFull { capacity: usize },

    #[error("placeholder at offset {offset:#x} was overwritten before patching")]
    PlaceholderCorrupted { offset: usize },

    #[error("branch from {from:#x} to {to:#x} does not fit a 32-bit displacement")]
    BranchOutOfRange { from: usize, to: usize },
}

impl CompileError {
    /// Process exit status the command-line front end reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::UnmatchedBracket { .. } => 1,
            CompileError::NestingTooDeep { .. } => 2,
            _ => 3,
        }
    }
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_location() {
        let err = CompileError::UnmatchedBracket {
            location: SourceLocation::new(3, 14),
        };
        assert_eq!(err.to_string(), "unmatched bracket at 3:14");

        let err = CompileError::NestingTooDeep {
            limit: 128,
            location: SourceLocation::new(1, 129),
        };
        assert_eq!(err.to_string(), "loops nested deeper than 128 at 1:129");
    }

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let unmatched = CompileError::UnmatchedBracket {
            location: SourceLocation::default(),
        };
        let nesting = CompileError::NestingTooDeep {
            limit: 1,
            location: SourceLocation::default(),
        };
        let full = CompileError::CodeBufferFull { capacity: 64 };
        assert_eq!(unmatched.exit_code(), 1);
        assert_eq!(nesting.exit_code(), 2);
        assert_eq!(full.exit_code(), 3);
    }

    #[test]
    fn test_alloc_error_converts() {
        let err: CompileError = AllocError::ZeroSize.into();
        assert!(matches!(err, CompileError::Allocation(AllocError::ZeroSize)));
    }
}
