//! End-to-end tests: compile programs and run the generated code.

#![cfg(all(target_arch = "x86_64", unix))]

mod common;

use brainmuk::runtime::RuntimeContext;
use brainmuk::{compile, CompileError, Compiler, CompilerOptions};
use common::{capture_output, input_calls, reset, run, run_with, scripted_input, take_output};

#[test]
fn test_simple_addition() {
    let mut tape = [0u8; 4];
    run(b"+", &mut tape, b"");
    assert_eq!(tape, [1, 0, 0, 0]);
}

#[test]
fn test_subtraction_wraps_below_zero() {
    let mut tape = [0u8; 4];
    run(b"-", &mut tape, b"");
    assert_eq!(tape[0], 0xff);
}

#[test]
fn test_increment_then_decrement_is_noop() {
    for start in [0u8, 1, 127, 128, 255] {
        let mut tape = [start, 9];
        run(b"+-", &mut tape, b"");
        assert_eq!(tape, [start, 9]);
        run(b"-+", &mut tape, b"");
        assert_eq!(tape, [start, 9]);
    }
}

#[test]
fn test_256_increments_return_to_start() {
    let source = vec![b'+'; 256];
    let mut tape = [42u8, 0];
    run(&source, &mut tape, b"");
    assert_eq!(tape, [42, 0]);

    let mut tape = [255u8];
    run(b"+", &mut tape, b"");
    assert_eq!(tape, [0]);
}

#[test]
fn test_address_increment() {
    let mut tape = [0u8; 4];
    run(b">+", &mut tape, b"");
    assert_eq!(tape, [0, 1, 0, 0]);
}

#[test]
fn test_address_decrement() {
    let mut tape = [0u8; 4];
    // Start the data pointer one cell in.
    reset(b"");
    let program = compile(b"<+").unwrap();
    unsafe {
        program.run(RuntimeContext {
            tape: tape.as_mut_ptr().add(1),
            output: capture_output,
            input: scripted_input,
        })
    };
    assert_eq!(tape, [1, 0, 0, 0]);
}

#[test]
fn test_right_then_left_returns_to_same_cell() {
    let mut tape = [0u8; 4];
    run(b"><+", &mut tape, b"");
    assert_eq!(tape, [1, 0, 0, 0]);

    let mut tape = [0u8; 4];
    run(b">>+<<><+", &mut tape, b"");
    assert_eq!(tape, [1, 0, 1, 0]);
}

#[test]
fn test_output_uses_current_cell() {
    let mut tape = [0u8; 4];
    let output = run(b">+++<>.", &mut tape, b"");
    assert_eq!(output, vec![3]);
}

#[test]
fn test_input_writes_current_cell() {
    let mut tape = [0u8; 4];
    run(b">+++<>,", &mut tape, &[42]);
    assert_eq!(tape[1], 42);
    assert_eq!(input_calls(), 1);
}

#[test]
fn test_input_then_output_echoes() {
    for byte in [0u8, 1, 0x7f, 0x80, 0xfe] {
        let mut tape = [0u8; 2];
        let output = run(b">,.", &mut tape, &[byte]);
        assert_eq!(output, vec![byte]);
    }
}

#[test]
fn test_end_of_input_reads_eof_byte() {
    let mut tape = [0u8; 2];
    let output = run(b",.", &mut tape, b"");
    assert_eq!(output, vec![brainmuk::EOF_BYTE]);
}

#[test]
fn test_zero_cell_skips_loop() {
    let mut tape = [0u8; 4];
    let output = run(b"[,.]>+", &mut tape, &[42]);
    assert!(output.is_empty());
    assert_eq!(input_calls(), 0);
    assert_eq!(tape, [0, 1, 0, 0]);
}

#[test]
fn test_byte_move_loop() {
    let mut tape = [0u8; 4];
    run(b"-[->+<]", &mut tape, b"");
    assert_eq!(tape, [0x00, 0xff, 0, 0]);
}

#[test]
fn test_nested_loops() {
    let mut tape = [0u8; 4];
    let output = run(b"+[[.-]]", &mut tape, b"");
    assert_eq!(output, vec![1]);
    assert_eq!(tape[0], 0);
}

#[test]
fn test_multiplication() {
    // 8 * 8 + 1 = 65, printed as 'A'.
    let mut tape = [0u8; 4];
    let output = run(b"++++++++[>++++++++<-]>+.", &mut tape, b"");
    assert_eq!(output, b"A");
    assert_eq!(tape, [0, 65, 0, 0]);
}

#[test]
fn test_hello_world() {
    let source = b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.";
    let mut tape = [0u8; 16];
    let output = run(source, &mut tape, b"");
    assert_eq!(output, b"Hello World!\n");
}

#[test]
fn test_cat_until_eof() {
    // Echo input until the 0xff end marker.
    let mut tape = [0u8; 4];
    let output = run(b",+[-.,+]", &mut tape, b"tape");
    assert_eq!(output, b"tape");
}

#[test]
fn test_deep_nesting_at_limit() {
    let mut source = b"+".to_vec();
    source.extend(std::iter::repeat(b'[').take(128));
    source.push(b'-');
    source.extend(std::iter::repeat(b']').take(128));
    source.push(b'.');

    let mut tape = [0u8; 2];
    let output = run(&source, &mut tape, b"");
    assert_eq!(output, vec![0]);
}

#[test]
fn test_growth_preserves_every_instruction() {
    let count = 5000;
    let source = vec![b'.'; count];
    let compiler = Compiler::new(CompilerOptions {
        initial_capacity: 256,
        ..CompilerOptions::default()
    });
    let (_, stats) = compiler.compile_with_stats(&source).unwrap();
    assert!(stats.growth_steps > 0);

    let mut tape = [7u8; 1];
    let output = run_with(&compiler, &source, &mut tape, b"");
    assert_eq!(output.len(), count);
    assert!(output.iter().all(|&b| b == 7));
}

#[test]
fn test_growth_inside_open_loops_keeps_branches() {
    // The buffer grows several times between `[` and `]`.
    let mut source = b"+++[>".to_vec();
    source.extend(std::iter::repeat(b'.').take(3000));
    source.extend_from_slice(b"<-]");

    let compiler = Compiler::new(CompilerOptions {
        initial_capacity: 128,
        ..CompilerOptions::default()
    });
    let mut tape = [0u8; 2];
    let output = run_with(&compiler, &source, &mut tape, b"");
    assert_eq!(output.len(), 3 * 3000);
    assert_eq!(tape, [0, 0]);
}

#[test]
fn test_program_runs_repeatedly() {
    let program = compile(b">+.").unwrap();
    reset(b"");
    let mut tape = [0u8; 2];
    for _ in 0..3 {
        unsafe { program.run_on(&mut tape, capture_output, scripted_input) };
    }
    assert_eq!(take_output(), vec![1, 2, 3]);
}

#[test]
fn test_sealed_program_runs() {
    let compiler = Compiler::new(CompilerOptions {
        seal: true,
        ..CompilerOptions::default()
    });
    let mut tape = [0u8; 2];
    let output = run_with(&compiler, b"+++.", &mut tape, b"");
    assert_eq!(output, vec![3]);
}

#[test]
fn test_run_with_explicit_context() {
    let program = compile(b"++.").unwrap();
    let mut tape = vec![0u8; 8];
    reset(b"");
    unsafe {
        program.run(RuntimeContext {
            tape: tape.as_mut_ptr(),
            output: capture_output,
            input: scripted_input,
        })
    };
    assert_eq!(take_output(), vec![2]);
    assert_eq!(tape[0], 2);
}

#[test]
fn test_errors_on_unmatched_brackets() {
    assert!(matches!(compile(b"+]"), Err(CompileError::UnmatchedBracket { .. })));
    assert!(matches!(compile(b"[]+]"), Err(CompileError::UnmatchedBracket { .. })));
}

#[test]
fn test_errors_on_open_bracket() {
    assert!(matches!(compile(b"[+"), Err(CompileError::UnmatchedBracket { .. })));
    assert!(matches!(compile(b"-[+[>"), Err(CompileError::UnmatchedBracket { .. })));
}

#[test]
fn test_nesting_too_deep_even_when_balanced() {
    let mut source = vec![b'['; 129];
    source.extend(vec![b']'; 129]);
    assert!(matches!(
        compile(&source),
        Err(CompileError::NestingTooDeep { limit: 128, .. })
    ));
}
