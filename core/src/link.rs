//! ROM library builder and application linker.
//!
//! `build_lib` assembles position-independent library routines, packs
//! them onto pages, and emits a combined S-record image plus a symbol
//! file. `link` rewrites `LINK SYMBOL` placeholders in an application
//! source against that symbol file, assembles it, and merges the result
//! with the library image.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use crate::asm::{self, AsmError, Assembly};
use crate::core::word::parse_octal;
use crate::srec::{self, SrecError};

pub const DEFAULT_LIB_BASE: u16 = 0o200;
pub const DEFAULT_PAGE_SIZE: u16 = 0o200;

#[derive(Debug)]
pub enum LinkError {
    /// A library routine sets its own origin.
    OriginNotAllowed { file: String },
    /// A library routine does not start at relative address zero.
    NotPositionIndependent { file: String },
    /// A routine does not fit on one page.
    RoutineTooLarge {
        file: String,
        size: u16,
        page_size: u16,
    },
    /// Two inputs write different values to the same address.
    MemoryOverlap { addr: u16, old: u16, new: u16 },
    /// Two inputs define the same symbol with different values.
    DuplicateSymbol { name: String, old: u16, new: u16 },
    /// A `LINK` placeholder names a symbol the library does not export.
    UnknownLinkSymbol { name: String, line_no: usize },
    /// Assembly of an input failed.
    Assembly { file: String, error: AsmError },
    /// Unparseable line in a symbol file.
    BadSymbolFile { line_no: usize, text: String },
    Srec(SrecError),
    Io(std::io::Error),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OriginNotAllowed { file } => {
                write!(f, "{}: origin directives are not allowed in library code", file)
            }
            Self::NotPositionIndependent { file } => {
                write!(f, "{}: routine is not position independent", file)
            }
            Self::RoutineTooLarge {
                file,
                size,
                page_size,
            } => write!(
                f,
                "{}: routine of {} words exceeds the {}-word page",
                file, size, page_size
            ),
            Self::MemoryOverlap { addr, old, new } => write!(
                f,
                "memory overlap at {:04o}: {:04o} vs {:04o}",
                addr, old, new
            ),
            Self::DuplicateSymbol { name, old, new } => write!(
                f,
                "duplicate symbol {}: {:04o} vs {:04o}",
                name, old, new
            ),
            Self::UnknownLinkSymbol { name, line_no } => {
                write!(f, "line {}: unknown link symbol {}", line_no, name)
            }
            Self::Assembly { file, error } => write!(f, "{}: {}", file, error),
            Self::BadSymbolFile { line_no, text } => {
                write!(f, "symbol file line {}: {}", line_no, text)
            }
            Self::Srec(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SrecError> for LinkError {
    fn from(e: SrecError) -> Self {
        Self::Srec(e)
    }
}

/// Assemble position-independent library routines and pack them onto
/// pages starting at `base`. Writes the combined S-record image (start
/// address = `base`) and the `NAME = ADDR` symbol file.
pub fn build_lib(
    files: &[impl AsRef<Path>],
    base: u16,
    page_size: u16,
    out_rom: &Path,
    out_sym: &Path,
) -> Result<(), LinkError> {
    let mut image: BTreeMap<u16, u16> = BTreeMap::new();
    let mut symbols: BTreeMap<String, u16> = BTreeMap::new();
    let mut page_base = base;
    let mut offset: u16 = 0;

    for file in files {
        let file = file.as_ref();
        let name = file.display().to_string();
        let source = std::fs::read_to_string(file)?;

        // First assembly at origin zero measures the routine.
        let probe = assemble_routine(&name, &source, 0)?;
        if !probe.origins.is_empty() {
            return Err(LinkError::OriginNotAllowed { file: name });
        }
        let min = *probe.words.keys().next().expect("assembly is never empty");
        if min != 0 {
            return Err(LinkError::NotPositionIndependent { file: name });
        }
        let size = probe.words.keys().next_back().unwrap() + 1;
        if size > page_size {
            return Err(LinkError::RoutineTooLarge {
                file: name,
                size,
                page_size,
            });
        }
        if offset + size > page_size {
            page_base += page_size;
            offset = 0;
        }

        // Second assembly places it at the packing position.
        let placed = assemble_routine(&name, &source, page_base + offset)?;
        merge_words(&mut image, &placed.words)?;
        merge_symbols(&mut symbols, &placed)?;
        offset += size;
    }

    write_srec(out_rom, &image, base)?;
    write_symbol_file(out_sym, &symbols)?;
    Ok(())
}

/// Link an application against a built library: rewrite `LINK SYMBOL`
/// placeholders, assemble, merge with the library image, and emit the
/// combined S-records. The start address is the application's `START`
/// symbol when defined, else the lowest address of the combined image.
pub fn link(lib_rom: &Path, lib_sym: &Path, app: &Path, out_rom: &Path) -> Result<(), LinkError> {
    let decoded = srec::decode(&std::fs::read_to_string(lib_rom)?)?;
    let mut image = decoded.words();
    let symbols = parse_symbol_file(&std::fs::read_to_string(lib_sym)?)?;

    let app_name = app.display().to_string();
    let rewritten = rewrite_links(&std::fs::read_to_string(app)?, &symbols)?;
    let assembly = {
        let assembly = asm::assemble(&rewritten).map_err(|error| LinkError::Assembly {
            file: app_name.clone(),
            error,
        })?;
        if let Some(error) = assembly.errors.first() {
            return Err(LinkError::Assembly {
                file: app_name,
                error: error.clone(),
            });
        }
        assembly
    };
    merge_words(&mut image, &assembly.words)?;

    let start = assembly
        .symbols
        .lookup("START")
        .or_else(|| image.keys().next().copied())
        .unwrap_or(0);
    write_srec(out_rom, &image, start)?;
    Ok(())
}

/// Replace `(optional label,) LINK SYMBOL` lines with the symbol's
/// 4-digit octal address.
fn rewrite_links(
    source: &str,
    symbols: &HashMap<String, u16>,
) -> Result<String, LinkError> {
    let mut out = String::new();
    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        let (code, comment) = match line.find('/') {
            Some(pos) => (&line[..pos], &line[pos..]),
            None => (line, ""),
        };
        let tokens: Vec<&str> = code.split_whitespace().collect();
        let rewritten = match tokens.as_slice() {
            [link, name] if link.eq_ignore_ascii_case("LINK") => {
                Some(format!("{:04o}", lookup(symbols, name, line_no)?))
            }
            [label, link, name]
                if label.ends_with(',') && link.eq_ignore_ascii_case("LINK") =>
            {
                Some(format!("{} {:04o}", label, lookup(symbols, name, line_no)?))
            }
            _ => None,
        };
        match rewritten {
            Some(text) => {
                out.push_str(&text);
                if !comment.is_empty() {
                    out.push(' ');
                    out.push_str(comment);
                }
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
    Ok(out)
}

fn lookup(
    symbols: &HashMap<String, u16>,
    name: &str,
    line_no: usize,
) -> Result<u16, LinkError> {
    symbols
        .get(&name.to_ascii_uppercase())
        .copied()
        .ok_or_else(|| LinkError::UnknownLinkSymbol {
            name: name.to_string(),
            line_no,
        })
}

/// Parse a `NAME = 0ADDR` symbol file; `#` opens a comment.
pub fn parse_symbol_file(text: &str) -> Result<HashMap<String, u16>, LinkError> {
    let mut symbols = HashMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bad = || LinkError::BadSymbolFile {
            line_no,
            text: raw.to_string(),
        };
        let (name, value_text) = line.split_once('=').ok_or_else(bad)?;
        let name = name.trim().to_ascii_uppercase();
        let value = parse_octal(value_text.trim()).ok_or_else(bad)?;
        if name.is_empty() {
            return Err(bad());
        }
        if let Some(&old) = symbols.get(&name) {
            if old != value {
                return Err(LinkError::DuplicateSymbol {
                    name,
                    old,
                    new: value,
                });
            }
            continue;
        }
        symbols.insert(name, value);
    }
    Ok(symbols)
}

fn assemble_routine(name: &str, source: &str, origin: u16) -> Result<Assembly, LinkError> {
    let assembly = asm::assemble_at(source, origin).map_err(|error| LinkError::Assembly {
        file: name.to_string(),
        error,
    })?;
    if let Some(error) = assembly.errors.first() {
        return Err(LinkError::Assembly {
            file: name.to_string(),
            error: error.clone(),
        });
    }
    Ok(assembly)
}

fn merge_words(
    image: &mut BTreeMap<u16, u16>,
    words: &BTreeMap<u16, u16>,
) -> Result<(), LinkError> {
    for (&addr, &new) in words {
        match image.get(&addr) {
            Some(&old) if old != new => {
                return Err(LinkError::MemoryOverlap { addr, old, new });
            }
            _ => {
                image.insert(addr, new);
            }
        }
    }
    Ok(())
}

fn merge_symbols(
    symbols: &mut BTreeMap<String, u16>,
    assembly: &Assembly,
) -> Result<(), LinkError> {
    for (name, new) in assembly.symbols.iter() {
        match symbols.get(name) {
            Some(&old) if old != new => {
                return Err(LinkError::DuplicateSymbol {
                    name: name.to_string(),
                    old,
                    new,
                });
            }
            _ => {
                symbols.insert(name.to_string(), new);
            }
        }
    }
    Ok(())
}

fn write_srec(path: &Path, image: &BTreeMap<u16, u16>, start: u16) -> Result<(), LinkError> {
    let mut text = srec::encode(image, start).join("\n");
    text.push('\n');
    std::fs::write(path, text)?;
    Ok(())
}

/// Symbol file layout: one `NAME = 0ADDR` per line, address order.
fn write_symbol_file(path: &Path, symbols: &BTreeMap<String, u16>) -> Result<(), LinkError> {
    let mut entries: Vec<(&String, &u16)> = symbols.iter().collect();
    entries.sort_by_key(|&(name, &value)| (value, name.clone()));
    let mut text = String::new();
    for (name, &value) in entries {
        text.push_str(&format!("{} = {:04o}\n", name, value));
    }
    std::fs::write(path, text)?;
    Ok(())
}
