// This module is the single-pass code generator. Compiler walks the source once, byte by byte,
// stopping at the end of the slice or at the first NUL. Comment bytes only advance the
// line/column counters used in error locations; each of the eight symbols either appends its
// snippet or drives the loop stack, which emits and backpatches the loop branches. In growable
// mode the buffer is checked before every symbol and quadrupled once half of it is in use; the
// check is made against the current capacity each time. Any error ends the pass immediately and
// nothing usable is returned. On success the epilogue is appended, the region is optionally
// sealed read+execute, and ownership of the region moves into the CompiledProgram.

//! Single-pass compiler from source text to a native function.

use crate::core::error::{CompileResult, SourceLocation};
use crate::core::exec_mem::{page_size, ExecutableRegion};
use crate::core::stats::CompileStats;
use crate::runtime::CompiledProgram;
use crate::x64::snippets;

use super::buffer::CodeBuffer;
use super::loops::{LoopStack, DEFAULT_MAX_NESTING_DEPTH};

/// Options controlling a compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Size of the first buffer in growable mode.
    pub initial_capacity: usize,
    /// Deepest loop nesting accepted.
    pub max_nesting_depth: usize,
    /// Remap the finished code read+execute.
    pub seal: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            initial_capacity: page_size(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            seal: false,
        }
    }
}

/// Whether `byte` is one of the eight symbols.
pub fn is_symbol(byte: u8) -> bool {
    matches!(byte, b'+' | b'-' | b'<' | b'>' | b'[' | b']' | b'.' | b',')
}

/// Compile `source` with default options.
pub fn compile(source: &[u8]) -> CompileResult<CompiledProgram> {
    Compiler::default().compile(source)
}

/// The code generator.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Compile into a buffer that grows as needed.
    pub fn compile(&self, source: &[u8]) -> CompileResult<CompiledProgram> {
        self.compile_with_stats(source).map(|(program, _)| program)
    }

    /// Like [`Compiler::compile`], also returning statistics.
    pub fn compile_with_stats(&self, source: &[u8]) -> CompileResult<(CompiledProgram, CompileStats)> {
        let buffer = CodeBuffer::growable(self.options.initial_capacity)?;
        self.generate(source, buffer)
    }

    /// Compile into `region`, failing rather than growing when it is full.
    pub fn compile_into(&self, source: &[u8], region: ExecutableRegion) -> CompileResult<CompiledProgram> {
        self.generate(source, CodeBuffer::fixed(region))
            .map(|(program, _)| program)
    }

    fn generate(
        &self,
        source: &[u8],
        mut buffer: CodeBuffer,
    ) -> CompileResult<(CompiledProgram, CompileStats)> {
        let mut loops = LoopStack::new(self.options.max_nesting_depth);
        let mut stats = CompileStats::default();
        let mut location = SourceLocation::new(1, 0);

        buffer.emit(&snippets::PROLOGUE)?;

        for &byte in source.iter().take_while(|&&b| b != 0) {
            if byte == b'\n' {
                location = SourceLocation::new(location.line + 1, 0);
                continue;
            }
            location.column += 1;

            if !is_symbol(byte) {
                continue;
            }

            if buffer.should_grow() {
                buffer.grow_or_abort();
            }

            match byte {
                b'[' => {
                    loops.open(&mut buffer, location)?;
                    stats.record_loop_opened(loops.depth());
                }
                b']' => {
                    loops.close(&mut buffer, location)?;
                    stats.record_loop_closed();
                }
                _ => {
                    if let Some(snippet) = snippets::for_symbol(byte) {
                        buffer.emit(snippet)?;
                    }
                }
            }
            stats.record_symbol(byte);
        }

        loops.finish()?;
        buffer.emit(&snippets::EPILOGUE)?;

        stats.code_size = buffer.len();
        stats.capacity = buffer.capacity();
        stats.growth_steps = buffer.growth_steps();

        let (mut region, code_len) = buffer.into_parts();
        if self.options.seal {
            region.seal()?;
        }

        log::debug!(
            "compiled {} symbols into {} bytes ({} growth steps)",
            stats.symbols_compiled,
            code_len,
            stats.growth_steps
        );
        Ok((CompiledProgram::new(region, code_len), stats))
    }
}
