//! Pass 1: lex source into tagged statements, labels, and origins.

use super::statement::{MemOp, Statement, StatementKind, iot_value, is_operate_mnemonic};
use super::{AsmError, AsmErrorKind, SymbolTable, parse_number};
use crate::core::word::{WORD_MASK, inc};

pub struct Pass1Output {
    pub statements: Vec<Statement>,
    pub symbols: SymbolTable,
    pub origins: Vec<u16>,
}

/// Walk the source once: resolve origins, record labels and pseudo-op
/// definitions, and emit one tagged statement per word. Any error here
/// aborts the assembly.
pub fn run(source: &str, default_origin: u16) -> Result<Pass1Output, AsmError> {
    let mut location = default_origin & WORD_MASK;
    let mut out = Pass1Output {
        statements: Vec::new(),
        symbols: SymbolTable::new(),
        origins: Vec::new(),
    };

    'source: for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let code = strip_comment(raw_line);
        for piece in split_statements(&code) {
            let mut text = piece.trim();
            if text.is_empty() {
                continue;
            }
            if text == "$" {
                break 'source;
            }

            // NAME = VALUE pseudo-op definition.
            if let Some((name, value_text)) = split_assignment(text) {
                let value = parse_number(&value_text)
                    .or_else(|| out.symbols.lookup(&value_text))
                    .ok_or_else(|| AsmError {
                        kind: AsmErrorKind::UnknownSymbol(value_text.clone()),
                        line_no,
                        text: text.to_string(),
                    })?;
                if !out.symbols.define(&name, value) {
                    return Err(AsmError {
                        kind: AsmErrorKind::DuplicateLabel(name),
                        line_no,
                        text: text.to_string(),
                    });
                }
                continue;
            }

            // Origin directive.
            if let Some(rest) = text.strip_prefix('*') {
                let target = rest.trim();
                match parse_number(target).or_else(|| out.symbols.lookup(target)) {
                    Some(value) => {
                        location = value;
                        out.origins.push(value);
                    }
                    None => {
                        return Err(AsmError {
                            kind: AsmErrorKind::BadOrigin(text.to_string()),
                            line_no,
                            text: text.to_string(),
                        });
                    }
                }
                continue;
            }

            // Leading labels.
            while let Some((label, rest)) = leading_label(text) {
                if !out.symbols.define(label, location) {
                    return Err(AsmError {
                        kind: AsmErrorKind::DuplicateLabel(label.to_string()),
                        line_no,
                        text: text.to_string(),
                    });
                }
                text = rest;
            }
            if text.is_empty() {
                continue;
            }

            emit(text, &mut location, line_no, &mut out)?;
        }
    }

    if out.statements.is_empty() {
        return Err(AsmError {
            kind: AsmErrorKind::EmptyProgram,
            line_no: 0,
            text: String::new(),
        });
    }
    Ok(out)
}

/// Classify one statement and append the word(s) it emits.
fn emit(
    text: &str,
    location: &mut u16,
    line_no: usize,
    out: &mut Pass1Output,
) -> Result<(), AsmError> {
    let error = |kind| AsmError {
        kind,
        line_no,
        text: text.to_string(),
    };
    let tokens: Vec<&str> = text.split_whitespace().collect();

    // TEXT "…" emits one word per character, low 7 bits.
    if tokens[0].eq_ignore_ascii_case("TEXT") {
        let string = quoted_string(text)
            .ok_or_else(|| error(AsmErrorKind::MalformedCharLiteral(text.to_string())))?;
        for ch in string.chars() {
            push(out, location, line_no, text, StatementKind::Data(ch as u16 & 0o177));
        }
        return Ok(());
    }

    // "c" emits one word.
    if text.starts_with('"') {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() == 3 && chars[2] == '"' {
            push(
                out,
                location,
                line_no,
                text,
                StatementKind::Data(chars[1] as u16 & 0o177),
            );
            return Ok(());
        }
        return Err(error(AsmErrorKind::MalformedCharLiteral(text.to_string())));
    }

    if let Some(op) = MemOp::from_mnemonic(tokens[0]) {
        let mut rest = &tokens[1..];
        let indirect = rest.first().is_some_and(|t| t.eq_ignore_ascii_case("I"));
        if indirect {
            rest = &rest[1..];
        }
        let operand = rest
            .first()
            .ok_or_else(|| error(AsmErrorKind::MissingOperand))?;
        push(
            out,
            location,
            line_no,
            text,
            StatementKind::Mem {
                op,
                indirect,
                operand: (*operand).to_string(),
            },
        );
        return Ok(());
    }

    if tokens.len() == 1 {
        let token = tokens[0];
        let kind = if iot_value(token).is_some() {
            StatementKind::Iot(token.to_string())
        } else if is_operate_mnemonic(token) {
            StatementKind::Operate(vec![token.to_string()])
        } else if token == "." {
            StatementKind::EmitAddress
        } else if let Some(value) = parse_number(token) {
            StatementKind::Data(value)
        } else {
            StatementKind::DataSymbol(token.to_string())
        };
        push(out, location, line_no, text, kind);
        return Ok(());
    }

    // Several tokens: an operate micro-instruction list; pass 2 rejects
    // unknown mnemonics.
    push(
        out,
        location,
        line_no,
        text,
        StatementKind::Operate(tokens.iter().map(|t| (*t).to_string()).collect()),
    );
    Ok(())
}

fn push(out: &mut Pass1Output, location: &mut u16, line_no: usize, raw: &str, kind: StatementKind) {
    out.statements.push(Statement {
        addr: *location,
        kind,
        line_no,
        raw: raw.to_string(),
    });
    *location = inc(*location);
}

/// Drop everything from the first `/` outside quotes to end of line.
fn strip_comment(line: &str) -> String {
    let mut in_quote = false;
    let mut result = String::new();
    for ch in line.chars() {
        match ch {
            '"' => {
                in_quote = !in_quote;
                result.push(ch);
            }
            '/' if !in_quote => break,
            _ => result.push(ch),
        }
    }
    result
}

/// Split a line into `;`-separated statements, quote-aware.
fn split_statements(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for ch in text.chars() {
        match ch {
            '"' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            ';' if !in_quote => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

/// Recognize `NAME = VALUE`. The name must be a plain identifier.
fn split_assignment(text: &str) -> Option<(String, String)> {
    let mut in_quote = false;
    for (pos, ch) in text.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '=' if !in_quote => {
                let name = text[..pos].trim();
                let value = text[pos + 1..].trim();
                if is_identifier(name) && !value.is_empty() {
                    return Some((name.to_string(), value.to_string()));
                }
                return None;
            }
            _ => {}
        }
    }
    None
}

/// Recognize a leading `LABEL,` and return (label, rest).
fn leading_label(text: &str) -> Option<(&str, &str)> {
    if text.starts_with('"') {
        return None;
    }
    let head = text.split_whitespace().next()?;
    let comma = head.find(',')?;
    let label = &text[..comma];
    if !is_identifier(label) {
        return None;
    }
    Some((label, text[comma + 1..].trim_start()))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Extract the string between the first pair of double quotes.
fn quoted_string(text: &str) -> Option<&str> {
    let open = text.find('"')?;
    let rest = &text[open + 1..];
    let close = rest.find('"')?;
    Some(&rest[..close])
}
