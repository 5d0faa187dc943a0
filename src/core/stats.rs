// This module tracks per-compilation statistics. CompileStats is filled in by the code
// generator while it walks the source: how many meaningful symbols were compiled and how often
// each one appeared, how many loops were closed and how deep they nested, how large the final
// code is, the capacity of the buffer that holds it, and how many times the buffer had to grow.
// The numbers are logged at debug level after every successful compile and printed by the
// command-line front end when --stats is given.

//! Compilation statistics.

use std::collections::BTreeMap;
use std::fmt;

/// Statistics for a single compilation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompileStats {
    /// Number of meaningful symbols compiled (comments excluded).
    pub symbols_compiled: usize,

    /// Count of each symbol compiled.
    pub symbol_counts: BTreeMap<char, usize>,

    /// Loops opened and closed.
    pub loops_closed: usize,

    /// Deepest loop nesting seen.
    pub max_nesting: usize,

    /// Bytes of machine code, prologue and epilogue included.
    pub code_size: usize,

    /// Final buffer capacity.
    pub capacity: usize,

    /// Number of times the buffer was reallocated.
    pub growth_steps: usize,
}

impl CompileStats {
    pub fn record_symbol(&mut self, symbol: u8) {
        self.symbols_compiled += 1;
        *self.symbol_counts.entry(symbol as char).or_insert(0) += 1;
    }

    pub fn record_loop_opened(&mut self, depth: usize) {
        self.max_nesting = self.max_nesting.max(depth);
    }

    pub fn record_loop_closed(&mut self) {
        self.loops_closed += 1;
    }

    /// Count recorded for `symbol`, zero if it never appeared.
    pub fn count(&self, symbol: char) -> usize {
        self.symbol_counts.get(&symbol).copied().unwrap_or(0)
    }
}

impl fmt::Display for CompileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "symbols compiled: {}", self.symbols_compiled)?;
        for (symbol, count) in &self.symbol_counts {
            writeln!(f, "  '{}': {}", symbol, count)?;
        }
        writeln!(f, "loops: {} (max depth {})", self.loops_closed, self.max_nesting)?;
        writeln!(f, "code size: {} bytes", self.code_size)?;
        write!(
            f,
            "buffer: {} bytes after {} growth step(s)",
            self.capacity, self.growth_steps
        )
    }
}
