//! x86-64 architecture-specific components.
//!
//! This module contains all x86-64 specific code:
//! - Instruction templates for System V (`snippets`)
//! - Disassembly listings using iced-x86 (`disasm`)

pub mod disasm;
pub mod snippets;

pub use snippets::{PatchField, Snippet, MAX_SNIPPET_LEN, PLACEHOLDER};
