//! Shared types and helpers for PDP-8 single-step validation suites.
//!
//! A test case records the complete architectural state before and after
//! one instruction, with memory restricted to the cells the instruction
//! can touch. The generator binary produces suites by running the
//! emulator itself, freezing its behavior against regressions; the
//! replay test applies `initial`, steps once, and diffs against `final`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use flipchip_core::cpu::Pdp8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pdp8TestCase {
    pub name: String,
    pub initial: Pdp8CpuState,
    #[serde(rename = "final")]
    pub final_state: Pdp8CpuState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pdp8CpuState {
    pub pc: u16,
    pub ac: u16,
    pub mq: u16,
    /// Link bit, 0 or 1.
    pub l: u8,
    pub halt: bool,
    /// Sparse memory contents as (address, word) pairs.
    pub ram: Vec<(u16, u16)>,
}

/// Load a test-case state into a freshly reset CPU.
pub fn apply_state(cpu: &mut Pdp8, state: &Pdp8CpuState) {
    cpu.reset();
    cpu.set_pc(state.pc);
    cpu.ac = state.ac;
    cpu.mq = state.mq;
    cpu.link = state.l != 0;
    cpu.halt = state.halt;
    for &(addr, word) in &state.ram {
        cpu.memory_mut().set(addr, word);
    }
}

/// Snapshot the CPU restricted to `addresses`.
pub fn capture_state(cpu: &Pdp8, addresses: &BTreeSet<u16>) -> Pdp8CpuState {
    Pdp8CpuState {
        pc: cpu.pc,
        ac: cpu.ac,
        mq: cpu.mq,
        l: u8::from(cpu.link),
        halt: cpu.halt,
        ram: addresses
            .iter()
            .map(|&addr| (addr, cpu.memory().at(addr)))
            .collect(),
    }
}

/// Compare the CPU against an expected state. Returns one description
/// per mismatch; empty means the case passed.
pub fn diff_state(cpu: &Pdp8, expected: &Pdp8CpuState) -> Vec<String> {
    let mut mismatches = Vec::new();
    if cpu.pc != expected.pc {
        mismatches.push(format!("PC: got {:04o}, want {:04o}", cpu.pc, expected.pc));
    }
    if cpu.ac != expected.ac {
        mismatches.push(format!("AC: got {:04o}, want {:04o}", cpu.ac, expected.ac));
    }
    if cpu.mq != expected.mq {
        mismatches.push(format!("MQ: got {:04o}, want {:04o}", cpu.mq, expected.mq));
    }
    if u8::from(cpu.link) != expected.l {
        mismatches.push(format!("L: got {}, want {}", u8::from(cpu.link), expected.l));
    }
    if cpu.halt != expected.halt {
        mismatches.push(format!(
            "HALT: got {}, want {}",
            cpu.halt, expected.halt
        ));
    }
    for &(addr, want) in &expected.ram {
        let got = cpu.memory().at(addr);
        if got != want {
            mismatches.push(format!(
                "mem[{:04o}]: got {:04o}, want {:04o}",
                addr, got, want
            ));
        }
    }
    mismatches
}
