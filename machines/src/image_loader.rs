//! Program image loading and memory dump formatting.
//!
//! Two text formats load into core:
//!
//! 1. *Simple octal image*: whitespace-separated octal tokens. `@ADDR`
//!    or `ADDR:` set the load address, `ADDR:VALUE` sets the address and
//!    stores one word, and any other token stores at the current address,
//!    which post-increments mod 4096. `;` and `#` open comments.
//! 2. *S-records*: when the first non-blank line starts with `S` and a
//!    digit the file is decoded as S-records instead, and an S9 record
//!    supplies the start address.
//!
//! Saved memory dumps (`OADDR: W0 … W7`, eight octal words per line) are
//! produced by [`format_dump`] and load back through the octal parser.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use flipchip_core::core::word::{WORD_MASK, inc, octal, parse_octal};
use flipchip_core::srec::{self, SrecError};

#[derive(Debug)]
pub enum ImageError {
    /// Token that is neither an address directive nor an octal word.
    BadToken { line_no: usize, token: String },
    /// The file looked like S-records but failed to decode.
    Srec(SrecError),
    Io(std::io::Error),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadToken { line_no, token } => {
                write!(f, "line {}: bad image token {}", line_no, token)
            }
            Self::Srec(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<std::io::Error> for ImageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SrecError> for ImageError {
    fn from(e: SrecError) -> Self {
        Self::Srec(e)
    }
}

/// A parsed program image: word map plus the start address, when the
/// file carried one.
#[derive(Debug)]
pub struct LoadedImage {
    pub words: BTreeMap<u16, u16>,
    pub start: Option<u16>,
}

pub fn load_image(path: &Path) -> Result<LoadedImage, ImageError> {
    parse_image(&std::fs::read_to_string(path)?)
}

pub fn parse_image(text: &str) -> Result<LoadedImage, ImageError> {
    if looks_like_srec(text) {
        let decoded = srec::decode(text)?;
        return Ok(LoadedImage {
            words: decoded.words(),
            start: decoded.start,
        });
    }
    parse_octal_image(text)
}

fn looks_like_srec(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|line| {
            let bytes = line.as_bytes();
            bytes.len() >= 2 && bytes[0] == b'S' && bytes[1].is_ascii_digit()
        })
}

fn parse_octal_image(text: &str) -> Result<LoadedImage, ImageError> {
    let mut words = BTreeMap::new();
    let mut addr: u16 = 0;
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw);
        for token in line.split_whitespace() {
            let bad = || ImageError::BadToken {
                line_no,
                token: token.to_string(),
            };
            if let Some(rest) = token.strip_prefix('@') {
                addr = parse_octal(rest).ok_or_else(bad)?;
            } else if let Some((left, right)) = token.split_once(':') {
                addr = parse_octal(left).ok_or_else(bad)?;
                if !right.is_empty() {
                    let value = parse_octal(right).ok_or_else(bad)?;
                    words.insert(addr, value);
                    addr = inc(addr);
                }
            } else {
                let value = parse_octal(token).ok_or_else(bad)?;
                words.insert(addr, value);
                addr = inc(addr);
            }
        }
    }
    Ok(LoadedImage { words, start: None })
}

fn strip_comment(line: &str) -> &str {
    let cut = line
        .find(';')
        .into_iter()
        .chain(line.find('#'))
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

/// Format a memory range as a saved image: eight octal words per line,
/// each line prefixed with its address.
pub fn format_dump(values: &[u16], base: u16) -> String {
    let mut out = String::new();
    for (row, chunk) in values.chunks(8).enumerate() {
        let addr = (base + 8 * row as u16) & WORD_MASK;
        out.push_str(&octal(addr));
        out.push(':');
        for &value in chunk {
            out.push(' ');
            out.push_str(&octal(value));
        }
        out.push('\n');
    }
    out
}
