// src/cli.rs
// Command-line arguments and the explicit options value handed to the driver.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::object_file::DEFAULT_SYMBOL;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Tape size when `-m` is not given.
pub const DEFAULT_UNIVERSE_SIZE: usize = 640 * KIB;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SizeError {
    #[error("invalid size: {0}")]
    Invalid(String),

    #[error("size too large: {0}")]
    Overflow(String),
}

/// Parse a size such as `640k`, `16M` or `1g`; a bare number counts MiB.
///
/// Only the first character after the digits selects the unit, so `64kb`
/// and `4gb` are accepted.
pub fn parse_size(text: &str) -> Result<usize, SizeError> {
    let invalid = || SizeError::Invalid(text.to_string());

    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, rest) = text.split_at(digits_end);

    let factor: usize = digits.parse().map_err(|_| invalid())?;
    if factor == 0 {
        return Err(invalid());
    }

    let unit = match rest.chars().next() {
        None | Some(' ') | Some('\t') => MIB,
        Some('k') | Some('K') => KIB,
        Some('m') | Some('M') => MIB,
        Some('g') | Some('G') => GIB,
        Some(_) => return Err(invalid()),
    };

    factor
        .checked_mul(unit)
        .ok_or_else(|| SizeError::Overflow(text.to_string()))
}

/// brainmuk: a JIT compiler for the eight-symbol tape language
#[derive(Parser, Debug)]
#[command(name = "brainmuk")]
#[command(version, about = "JIT compiler for the eight-symbol tape language", long_about = None)]
pub struct Cli {
    /// Program to run; starts a line REPL when omitted
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Further filenames are accepted and ignored
    #[arg(value_name = "IGNORED", hide = true)]
    pub ignored: Vec<PathBuf>,

    /// Minimum size of the tape (suffixes k, m, g; bare numbers are MiB)
    #[arg(short = 'm', long = "minimum-universe", visible_alias = "universe-size", value_name = "SIZE",
          value_parser = parse_size, default_value = "640k")]
    pub minimum_universe: usize,

    /// Print a listing of the generated code instead of running it
    #[arg(long, requires = "file")]
    pub disassemble: bool,

    /// Write the generated code to an ELF object instead of running it
    #[arg(long, value_name = "PATH", requires = "file", conflicts_with = "disassemble")]
    pub emit_obj: Option<PathBuf>,

    /// Symbol name for --emit-obj
    #[arg(long, value_name = "NAME", default_value = DEFAULT_SYMBOL)]
    pub symbol: String,

    /// Print compile statistics to stderr
    #[arg(long)]
    pub stats: bool,

    /// Keep generated code writable instead of remapping it read+execute
    #[arg(long)]
    pub no_seal: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the driver should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Run(PathBuf),
    Disassemble(PathBuf),
    EmitObject {
        input: PathBuf,
        output: PathBuf,
        symbol: String,
    },
    Repl,
}

/// Driver configuration, built once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub mode: Mode,
    pub minimum_universe: usize,
    pub stats: bool,
    pub seal: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: Mode::Repl,
            minimum_universe: DEFAULT_UNIVERSE_SIZE,
            stats: false,
            seal: true,
        }
    }
}

impl Cli {
    pub fn into_options(self) -> Options {
        if !self.ignored.is_empty() {
            log::warn!("ignoring extra files: {:?}", self.ignored);
        }

        let mode = match (self.file, self.emit_obj) {
            (Some(input), Some(output)) => Mode::EmitObject {
                input,
                output,
                symbol: self.symbol,
            },
            (Some(file), None) if self.disassemble => Mode::Disassemble(file),
            (Some(file), None) => Mode::Run(file),
            (None, _) => Mode::Repl,
        };

        Options {
            mode,
            minimum_universe: self.minimum_universe,
            stats: self.stats,
            seal: !self.no_seal,
        }
    }
}
