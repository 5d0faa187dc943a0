// This module is the host side of brainmuk. It loads source files (an empty file is an error),
// compiles them with a growable buffer, allocates a zeroed universe of the configured size, and
// runs the program against the stdio hooks. The same entry point can instead print a disassembly
// listing of the generated code or write it out as an ELF object. Without a file it runs a line
// REPL: every line is compiled into its own one-page region through the fixed-size path and
// executed against a universe that persists for the whole session. Host failures are reported
// as DriverError, which wraps compile errors and maps each to a process exit status.

//! File runner, output modes and REPL.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cli::{Mode, Options};
use crate::codegen::{Compiler, CompilerOptions};
use crate::core::error::{AllocError, CompileError};
use crate::core::exec_mem::{page_size, ExecutableRegion};
use crate::core::stats::CompileStats;
use crate::object_file::{emit_object, ObjectError};
use crate::runtime::{stdio_input, stdio_output, CompiledProgram, InputHook, OutputHook};
use crate::x64::disasm;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("could not open '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("'{}' is empty", .0.display())]
    EmptySource(PathBuf),

    #[error("{}: compilation failed: {source}", path.display())]
    Compile { path: PathBuf, source: CompileError },

    #[error("could not create universe ({size} bytes)")]
    Universe { size: usize },

    #[error("could not write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DriverError {
    /// Status the binary exits with.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Compile { source, .. } => source.exit_code(),
            _ => -1,
        }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Read a whole source file; empty files are rejected.
pub fn load_source(path: &Path) -> DriverResult<Vec<u8>> {
    let source = fs::read(path).map_err(|source| DriverError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if source.is_empty() {
        return Err(DriverError::EmptySource(path.to_path_buf()));
    }
    Ok(source)
}

/// A zeroed tape of `size` cells, failing instead of aborting when memory is short.
pub fn allocate_universe(size: usize) -> DriverResult<Vec<u8>> {
    let mut universe = Vec::new();
    universe
        .try_reserve_exact(size)
        .map_err(|_| DriverError::Universe { size })?;
    universe.resize(size, 0);
    Ok(universe)
}

fn compiler_for(options: &Options) -> Compiler {
    Compiler::new(CompilerOptions {
        seal: options.seal,
        ..CompilerOptions::default()
    })
}

/// Compile the file at `path`, printing statistics if asked to.
pub fn compile_file(path: &Path, options: &Options) -> DriverResult<(CompiledProgram, CompileStats)> {
    let source = load_source(path)?;
    let compiled = compiler_for(options)
        .compile_with_stats(&source)
        .map_err(|source| DriverError::Compile {
            path: path.to_path_buf(),
            source,
        })?;

    if options.stats {
        eprintln!("{}", compiled.1);
    }
    Ok(compiled)
}

/// Carry out whatever `options.mode` asks for.
pub fn run(options: &Options) -> DriverResult<()> {
    match &options.mode {
        Mode::Run(path) => run_file(path, options),
        Mode::Disassemble(path) => {
            let (program, _) = compile_file(path, options)?;
            let listing = disasm::disassemble(program.code(), program.entry() as u64);
            io::stdout().lock().write_all(listing.as_bytes())?;
            Ok(())
        }
        Mode::EmitObject {
            input,
            output,
            symbol,
        } => {
            let (program, _) = compile_file(input, options)?;
            let bytes = emit_object(program.code(), symbol)?;
            fs::write(output, bytes).map_err(|source| DriverError::Write {
                path: output.clone(),
                source,
            })
        }
        Mode::Repl => run_repl(options),
    }
}

/// Compile and run a file against stdin/stdout.
pub fn run_file(path: &Path, options: &Options) -> DriverResult<()> {
    let (program, _) = compile_file(path, options)?;
    let mut universe = allocate_universe(options.minimum_universe)?;

    log::debug!(
        "running {} ({} bytes of code, {} cells)",
        path.display(),
        program.code().len(),
        universe.len()
    );
    // SAFETY: the universe is as large as the user asked for; programs that
    // leave it are the same hazard the tape language has always had.
    unsafe { program.run_on(&mut universe, stdio_output, stdio_input) };

    io::stdout().flush()?;
    Ok(())
}

/// State shared by all lines of a REPL session.
pub struct ReplSession {
    compiler: Compiler,
    universe: Vec<u8>,
    output: OutputHook,
    input: InputHook,
}

impl ReplSession {
    pub fn new(
        universe_size: usize,
        seal: bool,
        output: OutputHook,
        input: InputHook,
    ) -> DriverResult<Self> {
        Ok(Self {
            compiler: Compiler::new(CompilerOptions {
                seal,
                ..CompilerOptions::default()
            }),
            universe: allocate_universe(universe_size)?,
            output,
            input,
        })
    }

    /// Compile one line into a fresh page and run it from cell 0.
    pub fn eval(&mut self, line: &str) -> Result<(), CompileError> {
        let region = ExecutableRegion::allocate(page_size())?;
        let program = self.compiler.compile_into(line.as_bytes(), region)?;
        // SAFETY: see run_file.
        unsafe { program.run_on(&mut self.universe, self.output, self.input) };
        if let Err(e) = program.release() {
            log::warn!("could not release line code: {}", e);
        }
        Ok(())
    }

    pub fn universe(&self) -> &[u8] {
        &self.universe
    }
}

/// Read-eval-print loop over stdin.
pub fn run_repl(options: &Options) -> DriverResult<()> {
    let mut session = ReplSession::new(
        options.minimum_universe,
        options.seal,
        stdio_output,
        stdio_input,
    )?;
    println!("brainmuk {}", env!("CARGO_PKG_VERSION"));

    loop {
        print!("> ");
        io::stdout().flush()?;

        // Not holding the stdin lock: `,` reads from the same stream.
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = session.eval(line) {
            eprintln!("error: {}", e);
        }
        io::stdout().flush()?;
    }
}
