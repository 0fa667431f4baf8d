//! Operate micro-instructions (opcode 7).
//!
//! Bit 8 separates group 1 from groups 2/3, and bit 3 separates group 2
//! from group 3. Group 2 skips on the plain OR of its conditions; there
//! is no reverse-sense inversion on bit 3 in this machine, which keeps it
//! compatible with binaries assembled for it (SPA/SNA/SZL are assembler
//! aliases that only add bit 3 to the encoding).

use super::Pdp8;
use crate::core::word::{SIGN_BIT, WORD_MASK, byte_swap, inc, rotate_left, rotate_right};

const GROUP_23_BIT: u16 = 0o0400;
const GROUP_3_BIT: u16 = 0o0010;

const CLA_BIT: u16 = 0o0200;

// Group 1
const CLL_BIT: u16 = 0o0100;
const CMA_BIT: u16 = 0o0040;
const CML_BIT: u16 = 0o0020;
const RAR_BIT: u16 = 0o0010;
const RAL_BIT: u16 = 0o0004;
const BSW_BIT: u16 = 0o0002;
const IAC_BIT: u16 = 0o0001;

// Group 2
const SMA_BIT: u16 = 0o0100;
const SZA_BIT: u16 = 0o0040;
const SNL_BIT: u16 = 0o0020;
const OSR_BIT: u16 = 0o0004;
const HLT_BIT: u16 = 0o0002;

// Group 3
const MQA_BIT: u16 = 0o0100;
const MQL_BIT: u16 = 0o0020;

impl Pdp8 {
    pub(super) fn execute_operate(&mut self) {
        if self.ir & GROUP_23_BIT == 0 {
            self.operate_group1();
        } else if self.ir & GROUP_3_BIT == 0 {
            self.operate_group2();
        } else {
            self.operate_group3();
        }
    }

    /// Group 1: clear/complement, rotate, increment - in that order.
    fn operate_group1(&mut self) {
        let ir = self.ir;
        if ir & CLA_BIT != 0 {
            self.ac = 0;
        }
        if ir & CLL_BIT != 0 {
            self.link = false;
        }
        if ir & CMA_BIT != 0 {
            self.ac = !self.ac & WORD_MASK;
        }
        if ir & CML_BIT != 0 {
            self.link = !self.link;
        }

        let twice = ir & BSW_BIT != 0;
        if ir & RAR_BIT != 0 {
            let turns = if twice { 2 } else { 1 };
            for _ in 0..turns {
                let (link, ac) = rotate_right(self.link, self.ac);
                self.link = link;
                self.ac = ac;
            }
        } else if ir & RAL_BIT != 0 {
            let turns = if twice { 2 } else { 1 };
            for _ in 0..turns {
                let (link, ac) = rotate_left(self.link, self.ac);
                self.link = link;
                self.ac = ac;
            }
        } else if twice {
            self.ac = byte_swap(self.ac);
        }

        if ir & IAC_BIT != 0 {
            self.ac = inc(self.ac);
            if self.ac == 0 {
                self.link = !self.link;
            }
        }
    }

    /// Group 2: conditional skip, then CLA / OSR / HLT.
    fn operate_group2(&mut self) {
        let ir = self.ir;
        let minus = ir & SMA_BIT != 0 && self.ac & SIGN_BIT != 0;
        let zero = ir & SZA_BIT != 0 && self.ac == 0;
        let link = ir & SNL_BIT != 0 && self.link;
        if minus || zero || link {
            self.skip();
        }
        if ir & CLA_BIT != 0 {
            self.ac = 0;
        }
        if ir & OSR_BIT != 0 {
            self.ac |= self.switch_register();
        }
        if ir & HLT_BIT != 0 {
            self.halt = true;
        }
    }

    /// Group 3: MQ register transfers.
    fn operate_group3(&mut self) {
        let ir = self.ir;
        if ir & CLA_BIT != 0 {
            self.ac = 0;
        }
        if ir & MQA_BIT != 0 {
            self.ac |= self.mq;
        }
        if ir & MQL_BIT != 0 {
            self.mq = self.ac;
            self.ac = 0;
        }
    }
}
