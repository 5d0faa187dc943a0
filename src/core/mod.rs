// This module serves as the hub for brainmuk's target-independent infrastructure: the
// executable memory regions generated code lives in, the error taxonomy shared by the code
// generator and its callers, and the statistics gathered during a compile. Everything here is
// free of instruction encodings; the x86-64 specifics live in the x64 module and the single-pass
// translation itself in codegen.

//! Core brainmuk infrastructure
//!
//! # Key Components
//!
//! ## Executable Memory (`exec_mem`)
//! - Anonymous read/write/execute mappings via `libc::mmap`
//! - Optional sealing to read+execute once code is final
//!
//! ## Errors (`error`)
//! - `CompileError` for everything a compile can fail with
//! - `AllocError` for mapping failures
//!
//! ## Statistics (`stats`)
//! - Per-symbol counts, loop depth, code size and growth steps

pub mod error;
pub mod exec_mem;
pub mod stats;

pub use error::{AllocError, CompileError, CompileResult, SourceLocation};
pub use exec_mem::{page_size, ExecutableRegion};
pub use stats::CompileStats;
