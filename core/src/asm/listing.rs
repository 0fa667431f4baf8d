//! Assembly listing renderer.

use super::Assembly;
use super::statement::{Statement, StatementKind};
use crate::core::word::octal;

/// Render the listing: one line per statement with its address, the
/// assembled word (or `????` where pass 2 failed), the mnemonic field,
/// and the source text, followed by a totals line and any errors.
pub fn render_listing(assembly: &Assembly) -> String {
    let mut out = String::new();
    for statement in &assembly.statements {
        let word = match assembly.words.get(&statement.addr) {
            Some(&w) => octal(w),
            None => "????".to_string(),
        };
        out.push_str(&format!(
            "{}  {}  {:<16} | {}\n",
            octal(statement.addr),
            word,
            mnemonic_field(statement),
            statement.raw.trim()
        ));
    }
    out.push_str(&format!(
        "{} words, {} symbols\n",
        assembly.words.len(),
        assembly.symbols.len()
    ));
    if !assembly.errors.is_empty() {
        out.push_str(&format!("{} errors:\n", assembly.errors.len()));
        for error in &assembly.errors {
            out.push_str(&format!("  {}\n", error));
        }
    }
    out
}

fn mnemonic_field(statement: &Statement) -> String {
    match &statement.kind {
        StatementKind::Data(_) => String::new(),
        StatementKind::DataSymbol(token) => token.clone(),
        StatementKind::Iot(token) => token.to_ascii_uppercase(),
        StatementKind::EmitAddress => ".".to_string(),
        StatementKind::Mem {
            op,
            indirect,
            operand,
        } => {
            if *indirect {
                format!("{} I {}", op.mnemonic(), operand)
            } else {
                format!("{} {}", op.mnemonic(), operand)
            }
        }
        StatementKind::Operate(tokens) => tokens.join(" ").to_ascii_uppercase(),
    }
}
