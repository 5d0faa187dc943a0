//! brainmuk - a just-in-time compiler for the eight-symbol tape language.
//!
//! Source text is translated in one pass straight into x86-64 System V
//! machine code, written into executable memory and called in-process.
//! There is no intermediate representation and no optimization.
//!
//! # Primary Usage
//!
//! ```no_run
//! use brainmuk::{compile, runtime::{stdio_input, stdio_output}};
//!
//! let program = compile(b"++++++++[>++++++++<-]>+.")?;
//! let mut tape = vec![0u8; 30_000];
//! unsafe { program.run_on(&mut tape, stdio_output, stdio_input) };
//! # Ok::<(), brainmuk::CompileError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Executable memory, errors, statistics
//! - [`x64`] - Instruction templates and disassembly
//! - [`codegen`] - Code buffer, loop backpatching, the generator
//! - [`runtime`] - Runtime context, hooks, compiled programs
//! - [`object_file`] - ELF object export
//! - [`cli`] / [`driver`] - Command-line front end

pub mod cli;
pub mod codegen;
pub mod core;
pub mod driver;
pub mod object_file;
pub mod runtime;
pub mod x64;

pub use self::codegen::{compile, Compiler, CompilerOptions};
pub use self::core::{AllocError, CompileError, CompileResult, CompileStats, ExecutableRegion, SourceLocation};
pub use self::runtime::{CompiledProgram, InputHook, OutputHook, RuntimeContext, EOF_BYTE};
