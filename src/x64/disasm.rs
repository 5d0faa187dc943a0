//! Disassembly listings of generated code using iced-x86.

use std::fmt::Write;

use iced_x86::{Decoder, DecoderOptions, Formatter, Instruction, IntelFormatter};

/// Width of the hex column, enough for the longest template instruction.
const HEX_COLUMN: usize = 20;

/// Render `code` as one instruction per line, addressed from `base`.
pub fn disassemble(code: &[u8], base: u64) -> String {
    let mut decoder = Decoder::with_ip(64, code, base, DecoderOptions::NONE);
    let mut formatter = IntelFormatter::new();
    formatter.options_mut().set_first_operand_char_index(8);

    let mut listing = String::new();
    let mut text = String::new();
    let mut instruction = Instruction::default();

    while decoder.can_decode() {
        decoder.decode_out(&mut instruction);
        text.clear();
        formatter.format(&instruction, &mut text);

        let start = (instruction.ip() - base) as usize;
        let bytes = &code[start..start + instruction.len()];
        let mut hex = String::with_capacity(HEX_COLUMN);
        for b in bytes {
            let _ = write!(hex, "{:02x}", b);
        }

        let _ = writeln!(listing, "{:08x}  {:<width$}  {}", instruction.ip(), hex, text, width = HEX_COLUMN);
    }

    listing
}

/// Number of instructions `code` decodes to.
pub fn instruction_count(code: &[u8]) -> usize {
    let mut decoder = Decoder::new(64, code, DecoderOptions::NONE);
    let mut count = 0;
    while decoder.can_decode() {
        decoder.decode();
        count += 1;
    }
    count
}
