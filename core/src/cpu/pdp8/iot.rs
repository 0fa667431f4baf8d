//! IOT dispatch (opcode 6).
//!
//! The full 12-bit instruction names a device and operation. The console
//! keyboard/teleprinter is serviced inline against the host console; the
//! line printer, RX8E, and TC08 are delegated to their controllers when
//! attached. Everything else is a silent no-op.

use super::Pdp8;
use crate::device::line_printer::LPT_LPSF;
use crate::device::{IoBus, Peripheral};

// Keyboard (TTI)
const KCF: u16 = 0o6031;
const KSF: u16 = 0o6032;
const KRS: u16 = 0o6034;
const KRB: u16 = 0o6036;

// Teleprinter (TTO)
const TCF: u16 = 0o6041;
const TSF: u16 = 0o6042;
const TLS: u16 = 0o6044;
const TLSC: u16 = 0o6046;

impl Pdp8 {
    pub(super) fn execute_iot(&mut self) {
        match self.ir {
            KCF => {}
            KSF => {
                if self.console.key_available() {
                    self.skip();
                }
            }
            KRS | KRB => {
                // No key reads as a zero low byte; console failures are
                // treated the same way.
                let key = self.console.read_key().unwrap_or(0);
                self.ac = (self.ac & 0o7400) | u16::from(key);
            }
            TCF => {}
            // Output is always ready.
            TSF => self.skip(),
            TLS | TLSC => {
                self.console.write_char((self.ac & 0xFF) as u8);
            }
            0o6601..=0o6607 => {
                let skip = match self.line_printer.as_mut() {
                    Some(lpt) => lpt.handle_iot(
                        self.ir,
                        &mut IoBus {
                            ac: &mut self.ac,
                            memory: &mut self.memory,
                        },
                    ),
                    // The printer flag reads ready even with nothing
                    // attached; the characters just go nowhere.
                    None => self.ir == LPT_LPSF,
                };
                if skip {
                    self.skip();
                }
            }
            0o6751..=0o6757 => {
                let skip = match self.rx8e.as_mut() {
                    Some(rx8e) => rx8e.handle_iot(
                        self.ir,
                        &mut IoBus {
                            ac: &mut self.ac,
                            memory: &mut self.memory,
                        },
                    ),
                    None => false,
                };
                if skip {
                    self.skip();
                }
            }
            0o6762 | 0o6764 | 0o6766 | 0o6771 => {
                let skip = match self.tc08.as_mut() {
                    Some(tc08) => tc08.handle_iot(
                        self.ir,
                        &mut IoBus {
                            ac: &mut self.ac,
                            memory: &mut self.memory,
                        },
                    ),
                    None => false,
                };
                if skip {
                    self.skip();
                }
            }
            _ => {}
        }
    }
}
