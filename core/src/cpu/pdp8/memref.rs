//! Memory-reference instructions (opcodes 0-5) and effective-address
//! resolution.

use super::Pdp8;
use crate::core::memory::{AUTO_INDEX_FIRST, AUTO_INDEX_LAST};
use crate::core::word::{PAGE_MASK, WORD_MASK, inc};

// Instruction fields shared by all memory-reference opcodes.
const INDIRECT_BIT: u16 = 0o0400;
const PAGE_BIT: u16 = 0o0200;
const OFFSET_MASK: u16 = 0o0177;

impl Pdp8 {
    /// Resolve the operand address of the instruction in IR.
    ///
    /// Bit 8 selects indirection, bit 7 selects the current page (else
    /// page zero). An indirect reference through an auto-index cell
    /// (0010-0017) increments the cell first and follows the bumped
    /// pointer; the side effect happens exactly once per reference.
    fn effective_address(&mut self) -> u16 {
        let base = if self.ir & PAGE_BIT != 0 {
            self.pc & PAGE_MASK
        } else {
            0
        };
        let mut ea = base | (self.ir & OFFSET_MASK);
        if self.ir & INDIRECT_BIT != 0 {
            if (AUTO_INDEX_FIRST..=AUTO_INDEX_LAST).contains(&ea) {
                let bumped = inc(self.memory.at(ea));
                self.memory.set(ea, bumped);
            }
            ea = self.memory.at(ea);
        }
        ea
    }

    pub(super) fn execute_memref(&mut self, op: u16) {
        let ea = self.effective_address();
        match op {
            0 => self.op_and(ea),
            1 => self.op_tad(ea),
            2 => self.op_isz(ea),
            3 => self.op_dca(ea),
            4 => self.op_jms(ea),
            5 => self.op_jmp(ea),
            _ => unreachable!("memory-reference opcode out of range"),
        }
    }

    /// AND - logical and into AC
    fn op_and(&mut self, ea: u16) {
        self.ac &= self.memory.at(ea);
    }

    /// TAD - two's-complement add; carry out of bit 11 complements L
    fn op_tad(&mut self, ea: u16) {
        let sum = u32::from(self.ac) + u32::from(self.memory.at(ea));
        if sum > u32::from(WORD_MASK) {
            self.link = !self.link;
        }
        self.ac = (sum & u32::from(WORD_MASK)) as u16;
    }

    /// ISZ - increment operand, skip when it wraps to zero
    fn op_isz(&mut self, ea: u16) {
        let bumped = inc(self.memory.at(ea));
        self.memory.set(ea, bumped);
        if bumped == 0 {
            self.skip();
        }
    }

    /// DCA - deposit AC and clear it
    fn op_dca(&mut self, ea: u16) {
        self.memory.set(ea, self.ac);
        self.ac = 0;
    }

    /// JMS - store the return address at the entry word, continue after it
    fn op_jms(&mut self, ea: u16) {
        self.memory.set(ea, self.pc);
        self.pc = inc(ea);
    }

    /// JMP - transfer control
    fn op_jmp(&mut self, ea: u16) {
        self.pc = ea;
    }
}
