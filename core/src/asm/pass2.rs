//! Pass 2: resolve operands and encode words. Errors are collected per
//! statement so the caller can still render a listing.

use std::collections::BTreeMap;

use super::pass1::Pass1Output;
use super::statement::{Statement, StatementKind, group1_bits, group2_bits, iot_value};
use super::{AsmError, AsmErrorKind, Assembly, SymbolTable, resolve_operand};
use crate::core::word::{PAGE_MASK, WORD_MASK};

const INDIRECT_BIT: u16 = 0o0400;
const PAGE_BIT: u16 = 0o0200;
const OFFSET_MASK: u16 = 0o0177;

const GROUP1_BASE: u16 = 0o7000;
const GROUP2_BASE: u16 = 0o7400;

pub fn run(first: Pass1Output) -> Assembly {
    let Pass1Output {
        statements,
        symbols,
        origins,
    } = first;

    let mut words = BTreeMap::new();
    let mut errors = Vec::new();
    for statement in &statements {
        match encode_statement(statement, &symbols) {
            Ok(word) => {
                words.insert(statement.addr, word);
            }
            Err(kind) => errors.push(AsmError {
                kind,
                line_no: statement.line_no,
                text: statement.raw.clone(),
            }),
        }
    }

    Assembly {
        words,
        symbols,
        origins,
        statements,
        errors,
    }
}

fn encode_statement(statement: &Statement, symbols: &SymbolTable) -> Result<u16, AsmErrorKind> {
    match &statement.kind {
        StatementKind::Data(value) => Ok(value & WORD_MASK),
        StatementKind::DataSymbol(token) => resolve_operand(token, statement.addr, symbols),
        StatementKind::EmitAddress => Ok(statement.addr),
        StatementKind::Iot(token) => {
            iot_value(token).ok_or_else(|| AsmErrorKind::InvalidOperate(token.clone()))
        }
        StatementKind::Mem {
            op,
            indirect,
            operand,
        } => {
            let target = resolve_operand(operand, statement.addr, symbols)?;
            let mut word = op.base() | (target & OFFSET_MASK);
            if *indirect {
                word |= INDIRECT_BIT;
            }
            if target & PAGE_MASK == 0 {
                // Page zero is reachable from anywhere.
            } else if target & PAGE_MASK == statement.addr & PAGE_MASK {
                word |= PAGE_BIT;
            } else {
                return Err(AsmErrorKind::OperandOutOfRange { target });
            }
            Ok(word)
        }
        StatementKind::Operate(tokens) => encode_operate(tokens),
    }
}

/// Encode an operate token list. The statement is group 2 exactly when a
/// group-2 mnemonic appears and the tokens are not all group-1; within
/// the chosen group every token must resolve.
fn encode_operate(tokens: &[String]) -> Result<u16, AsmErrorKind> {
    let any_group2 = tokens.iter().any(|t| group2_bits(t).is_some());
    let all_group1 = tokens.iter().all(|t| group1_bits(t).is_some());
    let (base, bits_for): (u16, fn(&str) -> Option<u16>) = if any_group2 && !all_group1 {
        (GROUP2_BASE, group2_bits)
    } else {
        (GROUP1_BASE, group1_bits)
    };

    let mut word = base;
    for token in tokens {
        word |= bits_for(token).ok_or_else(|| AsmErrorKind::InvalidOperate(token.clone()))?;
    }
    Ok(word)
}
