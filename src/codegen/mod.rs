// src/codegen/mod.rs
// Single-pass code generation: buffer management, loop backpatching, and the generator itself.

pub mod buffer;
pub mod generator;
pub mod loops;

pub use buffer::CodeBuffer;
pub use generator::{compile, is_symbol, Compiler, CompilerOptions};
pub use loops::{BranchKind, LoopFrame, LoopStack, PatchSite, DEFAULT_MAX_NESTING_DEPTH};
