// This module defines the boundary between generated code and the host. RuntimeContext is the
// three-field record the compiled function receives by value: the tape pointer the prologue
// loads into rbx and the two hook function pointers the `.` and `,` snippets call through. Its
// layout is pinned with repr(C) and checked at compile time against the frame offsets baked
// into the instruction templates. CompiledProgram owns the executable region holding a finished
// function; it is immutable, can be invoked any number of times, and unmaps its code when
// dropped. The stdio hooks connect a program to the process's standard streams and report end of
// input as 0xFF.

//! Runtime context, hooks and compiled programs.

use std::io::{self, Read, Write};
use std::mem::offset_of;

use crate::core::error::AllocError;
use crate::core::exec_mem::ExecutableRegion;
use crate::x64::snippets::{CONTEXT_INPUT, CONTEXT_OUTPUT, CONTEXT_TAPE};

/// Accepts one byte of program output.
pub type OutputHook = extern "C" fn(u8);

/// Produces one byte of program input.
pub type InputHook = extern "C" fn() -> u8;

/// What the stdio input hook returns once input is exhausted.
pub const EOF_BYTE: u8 = 0xff;

/// Everything a running program can see of its host.
///
/// 24 bytes, so System V passes it on the stack where the prologue expects it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RuntimeContext {
    pub tape: *mut u8,
    pub output: OutputHook,
    pub input: InputHook,
}

const _: () = {
    assert!(offset_of!(RuntimeContext, tape) == 0);
    assert!(offset_of!(RuntimeContext, output) == (CONTEXT_OUTPUT - CONTEXT_TAPE) as usize);
    assert!(offset_of!(RuntimeContext, input) == (CONTEXT_INPUT - CONTEXT_TAPE) as usize);
    assert!(std::mem::size_of::<RuntimeContext>() == 24);
};

type ProgramFn = unsafe extern "C" fn(RuntimeContext);

/// A finished native function.
///
/// The entry point is the start of the region. Dropping the program unmaps it.
#[derive(Debug)]
pub struct CompiledProgram {
    region: ExecutableRegion,
    code_len: usize,
}

impl CompiledProgram {
    pub(crate) fn new(region: ExecutableRegion, code_len: usize) -> Self {
        Self { region, code_len }
    }

    /// Address of the first instruction.
    pub fn entry(&self) -> *const u8 {
        self.region.as_ptr()
    }

    /// The emitted machine code.
    pub fn code(&self) -> &[u8] {
        &self.region.as_slice()[..self.code_len]
    }

    /// Size of the region holding the code.
    pub fn region_len(&self) -> usize {
        self.region.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.region.is_sealed()
    }

    /// Call the program.
    ///
    /// # Safety
    ///
    /// The host must be x86-64 System V. The generated code does no bounds
    /// checking: `context.tape` must point into memory large enough for every
    /// cell the program visits, and no other invocation may use the same tape
    /// concurrently.
    pub unsafe fn run(&self, context: RuntimeContext) {
        let entry: ProgramFn = std::mem::transmute(self.region.as_ptr());
        entry(context);
    }

    /// Call the program with the data pointer at the start of `tape`.
    ///
    /// # Safety
    ///
    /// Same as [`CompiledProgram::run`]; moving left of the first cell or
    /// right of the last one is undefined behaviour.
    pub unsafe fn run_on(&self, tape: &mut [u8], output: OutputHook, input: InputHook) {
        self.run(RuntimeContext {
            tape: tape.as_mut_ptr(),
            output,
            input,
        });
    }

    /// Unmap the program, reporting failure.
    pub fn release(self) -> Result<(), AllocError> {
        self.region.release()
    }
}

/// Output hook writing to stdout.
pub extern "C" fn stdio_output(byte: u8) {
    let _ = io::stdout().lock().write_all(&[byte]);
}

/// Input hook reading from stdin, [`EOF_BYTE`] at end of input.
pub extern "C" fn stdio_input() -> u8 {
    // Prompts written without a newline would otherwise sit in the buffer.
    let _ = io::stdout().flush();

    let mut byte = [0u8; 1];
    match io::stdin().lock().read_exact(&mut byte) {
        Ok(()) => byte[0],
        Err(_) => EOF_BYTE,
    }
}
