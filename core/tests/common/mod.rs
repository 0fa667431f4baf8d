use std::cell::RefCell;
use std::rc::Rc;

use flipchip_core::cpu::Pdp8;
use flipchip_core::device::{BufferConsole, Console};

/// Console handle shared between the CPU and the test so scripted input
/// and captured output stay inspectable after a run.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct SharedConsole(Rc<RefCell<BufferConsole>>);

#[allow(dead_code)]
impl SharedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_input(&self, bytes: &[u8]) {
        self.0.borrow_mut().type_input(bytes);
    }

    pub fn output(&self) -> Vec<u8> {
        self.0.borrow().output.clone()
    }
}

impl Console for SharedConsole {
    fn key_available(&mut self) -> bool {
        self.0.borrow_mut().key_available()
    }

    fn read_key(&mut self) -> Option<u8> {
        self.0.borrow_mut().read_key()
    }

    fn write_char(&mut self, ch: u8) {
        self.0.borrow_mut().write_char(ch);
    }
}

/// Store a program image and point PC at it.
#[allow(dead_code)]
pub fn load_program(cpu: &mut Pdp8, origin: u16, words: &[u16]) {
    for (i, &word) in words.iter().enumerate() {
        cpu.memory_mut().set(origin + i as u16, word);
    }
    cpu.set_pc(origin);
}

/// Build a CPU with a program loaded at `origin` and PC set there.
#[allow(dead_code)]
pub fn cpu_with_program(origin: u16, words: &[u16]) -> Pdp8 {
    let mut cpu = Pdp8::new();
    load_program(&mut cpu, origin, words);
    cpu
}
