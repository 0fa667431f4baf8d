//! Two-pass PAL assembler.
//!
//! Pass 1 ([`pass1`]) walks the source, resolves origins and labels, and
//! produces a list of tagged [`Statement`]s. Pass 2 ([`pass2`]) resolves
//! operands and encodes words. Pass-1 errors abort the assembly; pass-2
//! errors are collected per statement so a listing can still be rendered.
//!
//! Source conventions: `/` opens a comment, `;` separates statements on a
//! line, `NAME = VALUE` defines a symbol, `*VALUE` sets the origin,
//! `LABEL,` defines a label, `TEXT "…"` emits one word per character,
//! `"c"` emits one word, `.` emits the current address, and a bare `$`
//! ends assembly.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

pub mod listing;
pub mod pass1;
pub mod pass2;
pub mod statement;

pub use listing::render_listing;
pub use statement::{MemOp, Statement, StatementKind};

use crate::core::word::{WORD_MASK, word};
use crate::srec;

/// Default location counter when the source sets no origin.
pub const DEFAULT_ORIGIN: u16 = 0o200;

/// An assembly diagnostic tied to its source statement.
#[derive(Debug, Clone)]
pub struct AsmError {
    pub kind: AsmErrorKind,
    pub line_no: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmErrorKind {
    DuplicateLabel(String),
    UnknownSymbol(String),
    OperandOutOfRange { target: u16 },
    MissingOperand,
    BadOrigin(String),
    InvalidOperate(String),
    MalformedCharLiteral(String),
    EmptyProgram,
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AsmErrorKind::DuplicateLabel(name) => {
                write!(f, "line {}: duplicate label {}", self.line_no, name)
            }
            AsmErrorKind::UnknownSymbol(name) => {
                write!(f, "line {}: unknown symbol {}", self.line_no, name)
            }
            AsmErrorKind::OperandOutOfRange { target } => write!(
                f,
                "line {}: operand {:04o} not on page zero or the current page",
                self.line_no, target
            ),
            AsmErrorKind::MissingOperand => {
                write!(f, "line {}: missing operand: {}", self.line_no, self.text)
            }
            AsmErrorKind::BadOrigin(text) => {
                write!(f, "line {}: bad origin {}", self.line_no, text)
            }
            AsmErrorKind::InvalidOperate(token) => {
                write!(f, "line {}: invalid operate mnemonic {}", self.line_no, token)
            }
            AsmErrorKind::MalformedCharLiteral(text) => {
                write!(f, "line {}: malformed character literal {}", self.line_no, text)
            }
            AsmErrorKind::EmptyProgram => write!(f, "no statements assembled"),
        }
    }
}

impl std::error::Error for AsmError {}

/// Case-insensitive symbol table. Labels, origin assignments, and
/// pseudo-op definitions all land here.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    map: HashMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a symbol. Returns false when the name is already taken.
    pub fn define(&mut self, name: &str, value: u16) -> bool {
        let key = name.to_ascii_uppercase();
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, value & WORD_MASK);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<u16> {
        self.map.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.map.iter().map(|(name, &value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The result of a successful two-pass assembly. `errors` holds the
/// collected pass-2 diagnostics; the word map covers every statement
/// that resolved.
#[derive(Debug)]
pub struct Assembly {
    pub words: BTreeMap<u16, u16>,
    pub symbols: SymbolTable,
    /// Origins set by `*` directives, in source order.
    pub origins: Vec<u16>,
    pub statements: Vec<Statement>,
    pub errors: Vec<AsmError>,
}

impl Assembly {
    /// Start address for the S9 record: the `START` symbol when defined,
    /// otherwise the lowest populated address.
    pub fn start_address(&self) -> Option<u16> {
        self.symbols
            .lookup("START")
            .or_else(|| self.words.keys().next().copied())
    }

    /// Render the word map as S-record lines.
    pub fn to_srec(&self) -> Vec<String> {
        srec::encode(&self.words, self.start_address().unwrap_or(0))
    }
}

/// Assemble source text with the default origin.
pub fn assemble(source: &str) -> Result<Assembly, AsmError> {
    assemble_at(source, DEFAULT_ORIGIN)
}

/// Assemble source text with a caller-supplied initial location counter
/// (the linker places library routines this way).
pub fn assemble_at(source: &str, origin: u16) -> Result<Assembly, AsmError> {
    let first = pass1::run(source, origin)?;
    Ok(pass2::run(first))
}

#[derive(Debug)]
pub enum FileAsmError {
    Io(std::io::Error),
    Asm(AsmError),
}

impl fmt::Display for FileAsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Asm(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FileAsmError {}

impl From<std::io::Error> for FileAsmError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AsmError> for FileAsmError {
    fn from(e: AsmError) -> Self {
        Self::Asm(e)
    }
}

/// Assemble a source file and write the S-record output. Nothing is
/// written when pass-2 errors are present; the caller inspects
/// [`Assembly::errors`].
pub fn assemble_file(source_path: &Path, out_path: &Path) -> Result<Assembly, FileAsmError> {
    let source = std::fs::read_to_string(source_path)?;
    let assembly = assemble(&source)?;
    if assembly.errors.is_empty() {
        let mut text = assembly.to_srec().join("\n");
        text.push('\n');
        std::fs::write(out_path, text)?;
    }
    Ok(assembly)
}

/// Parse a numeric literal: octal by default, `0x` hexadecimal, `#`
/// decimal, with a leading `-` meaning two's-complement negation.
pub(crate) fn parse_number(text: &str) -> Option<u16> {
    let (negate, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if body.is_empty() {
        return None;
    }
    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        u32::from_str_radix(body, 8).ok()?
    };
    let value = word(value);
    Some(if negate {
        (value.wrapping_neg()) & WORD_MASK
    } else {
        value
    })
}

/// Resolve an operand expression: `.` and `.±off` (dot = current
/// address), `&NAME`, numeric literals, or a symbol lookup.
pub(crate) fn resolve_operand(
    token: &str,
    addr: u16,
    symbols: &SymbolTable,
) -> Result<u16, AsmErrorKind> {
    if token == "." {
        return Ok(addr);
    }
    if let Some(rest) = token.strip_prefix('.') {
        let (negate, digits) = match rest.as_bytes().first() {
            Some(b'+') => (false, &rest[1..]),
            Some(b'-') => (true, &rest[1..]),
            _ => return Err(AsmErrorKind::UnknownSymbol(token.to_string())),
        };
        let offset = parse_number(digits)
            .ok_or_else(|| AsmErrorKind::UnknownSymbol(token.to_string()))?;
        let resolved = if negate {
            addr.wrapping_sub(offset)
        } else {
            addr.wrapping_add(offset)
        };
        return Ok(resolved & WORD_MASK);
    }
    if let Some(name) = token.strip_prefix('&') {
        return symbols
            .lookup(name)
            .ok_or_else(|| AsmErrorKind::UnknownSymbol(token.to_string()));
    }
    if let Some(value) = parse_number(token) {
        return Ok(value);
    }
    symbols
        .lookup(token)
        .ok_or_else(|| AsmErrorKind::UnknownSymbol(token.to_string()))
}
