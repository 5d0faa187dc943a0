// This module exports compiled programs as relocatable ELF objects using the object crate's
// writer. Generated code contains no absolute addresses and no relocations: every branch is a
// rel32 measured from the next instruction and both hooks are reached through the context
// argument. The bytes can therefore be copied verbatim into .text and exposed under a global
// function symbol, after which a C host can link against it and call it with the same
// three-field context struct the JIT path uses.

//! ELF object emission for compiled programs.

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};
use thiserror::Error;

/// Symbol name used when the caller does not pick one.
pub const DEFAULT_SYMBOL: &str = "brainmuk_main";

/// Alignment of the function in .text.
const TEXT_ALIGN: u64 = 16;

#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("invalid symbol name {0:?}")]
    InvalidSymbol(String),

    #[error("object writer failed: {0}")]
    Write(#[from] object::write::Error),
}

/// Wrap `code` in an x86-64 ELF object defining `symbol`.
pub fn emit_object(code: &[u8], symbol: &str) -> Result<Vec<u8>, ObjectError> {
    if symbol.is_empty() || symbol.bytes().any(|b| b == 0 || b.is_ascii_whitespace()) {
        return Err(ObjectError::InvalidSymbol(symbol.to_string()));
    }

    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.section_id(StandardSection::Text);
    let offset = obj.append_section_data(text, code, TEXT_ALIGN);

    obj.add_symbol(Symbol {
        name: symbol.as_bytes().to_vec(),
        value: offset,
        size: code.len() as u64,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });

    log::debug!("emitting {} bytes of code as `{}`", code.len(), symbol);
    Ok(obj.write()?)
}
