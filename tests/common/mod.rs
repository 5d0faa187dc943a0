//! Hooks shared by the integration tests.
//!
//! Hooks are plain function pointers, so captured output and scripted input
//! live in thread-locals; each test runs on its own thread.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use brainmuk::{compile, Compiler, EOF_BYTE};

thread_local! {
    static OUTPUT: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
    static INPUT: RefCell<VecDeque<u8>> = const { RefCell::new(VecDeque::new()) };
    static INPUT_CALLS: RefCell<usize> = const { RefCell::new(0) };
}

pub extern "C" fn capture_output(byte: u8) {
    OUTPUT.with(|out| out.borrow_mut().push(byte));
}

pub extern "C" fn scripted_input() -> u8 {
    INPUT_CALLS.with(|calls| *calls.borrow_mut() += 1);
    INPUT.with(|input| input.borrow_mut().pop_front().unwrap_or(EOF_BYTE))
}

/// Clear captured output and queue `input` for the next run.
pub fn reset(input: &[u8]) {
    OUTPUT.with(|out| out.borrow_mut().clear());
    INPUT.with(|queue| *queue.borrow_mut() = input.iter().copied().collect());
    INPUT_CALLS.with(|calls| *calls.borrow_mut() = 0);
}

pub fn take_output() -> Vec<u8> {
    OUTPUT.with(|out| std::mem::take(&mut *out.borrow_mut()))
}

pub fn input_calls() -> usize {
    INPUT_CALLS.with(|calls| *calls.borrow())
}

/// Compile `source` with `compiler` and run it on `tape`, returning its output.
pub fn run_with(compiler: &Compiler, source: &[u8], tape: &mut [u8], input: &[u8]) -> Vec<u8> {
    let _ = env_logger::builder().is_test(true).try_init();
    reset(input);
    let program = compiler.compile(source).unwrap();
    unsafe { program.run_on(tape, capture_output, scripted_input) };
    take_output()
}

/// Compile with default options and run on `tape`.
pub fn run(source: &[u8], tape: &mut [u8], input: &[u8]) -> Vec<u8> {
    let _ = env_logger::builder().is_test(true).try_init();
    reset(input);
    let program = compile(source).unwrap();
    unsafe { program.run_on(tape, capture_output, scripted_input) };
    take_output()
}
