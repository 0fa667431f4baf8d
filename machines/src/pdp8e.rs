//! The wired PDP-8/E system: processor, console, and peripheral
//! controllers, plus the front-panel and media-admin operations a
//! monitor or front end drives.

use std::path::Path;

use flipchip_core::core::word::octal;
use flipchip_core::core::{Machine, MemoryError};
use flipchip_core::cpu::{CpuStateTrait, Pdp8, Pdp8State};
use flipchip_core::device::rx8e::RxDriveStatus;
use flipchip_core::device::tc08::TcDriveStatus;
use flipchip_core::device::{Console, DeviceError, LinePrinter, Rx8e, Tc08};

use crate::image_loader::{self, ImageError, LoadedImage};

pub struct Pdp8eSystem {
    cpu: Pdp8,
}

impl Pdp8eSystem {
    pub fn new() -> Self {
        Self { cpu: Pdp8::new() }
    }

    pub fn with_console(console: Box<dyn Console>) -> Self {
        let mut cpu = Pdp8::new();
        cpu.set_console(console);
        Self { cpu }
    }

    pub fn cpu(&self) -> &Pdp8 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Pdp8 {
        &mut self.cpu
    }

    // ---- Front panel ----

    /// LOAD ADDRESS: set PC from the switch register.
    pub fn load_address(&mut self, addr: u16) {
        self.cpu.set_pc(addr);
    }

    /// DEPOSIT: store at PC, then advance PC.
    pub fn deposit(&mut self, value: u16) -> Result<(), MemoryError> {
        let pc = self.cpu.pc;
        self.cpu.write(pc, value)?;
        self.cpu.set_pc(pc.wrapping_add(1));
        Ok(())
    }

    /// EXAMINE: read at PC, then advance PC.
    pub fn examine(&mut self) -> Result<u16, MemoryError> {
        let pc = self.cpu.pc;
        let value = self.cpu.read(pc)?;
        self.cpu.set_pc(pc.wrapping_add(1));
        Ok(value)
    }

    pub fn peek(&self, addr: u16) -> Result<u16, MemoryError> {
        self.cpu.read(addr)
    }

    pub fn poke(&mut self, addr: u16, value: u16) -> Result<(), MemoryError> {
        self.cpu.write(addr, value)
    }

    pub fn registers(&self) -> Pdp8State {
        self.cpu.snapshot()
    }

    /// Format `[start, end]` as a saved memory image (eight words per
    /// line, octal throughout).
    pub fn dump(&self, start: u16, end: u16) -> Result<String, MemoryError> {
        let mut values = Vec::new();
        let mut addr = start;
        loop {
            values.push(self.cpu.read(addr)?);
            if addr >= end {
                break;
            }
            addr += 1;
        }
        Ok(image_loader::format_dump(&values, start))
    }

    /// One-line register snapshot for diagnostics.
    pub fn registers_line(&self) -> String {
        let state = self.registers();
        format!(
            "PC={} AC={} MQ={} L={} IR={} HALT={}",
            octal(state.pc),
            octal(state.ac),
            octal(state.mq),
            u8::from(state.link),
            octal(state.ir),
            u8::from(state.halt),
        )
    }

    // ---- Media admin ----

    pub fn attach_line_printer(&mut self, path: &Path) -> Result<(), DeviceError> {
        let lpt = LinePrinter::attach(path)?;
        log::info!("LPT output to {}", path.display());
        self.cpu.attach_line_printer(lpt);
        Ok(())
    }

    pub fn detach_line_printer(&mut self) -> bool {
        self.cpu.detach_line_printer().is_some()
    }

    /// Attach RX8E media, creating the controller on first use.
    pub fn attach_rx(
        &mut self,
        unit: usize,
        path: &Path,
        create_if_missing: bool,
    ) -> Result<(), DeviceError> {
        if self.cpu.rx8e().is_none() {
            self.cpu.attach_rx8e(Rx8e::new());
        }
        self.cpu
            .rx8e_mut()
            .expect("controller just attached")
            .attach(unit, path, create_if_missing)?;
        log::info!("RX8E unit {} attached to {}", unit, path.display());
        Ok(())
    }

    pub fn detach_rx(&mut self, unit: usize) -> Result<bool, DeviceError> {
        match self.cpu.rx8e_mut() {
            Some(rx8e) => rx8e.detach(unit),
            None => Ok(false),
        }
    }

    pub fn rx_status(&self, unit: usize) -> Result<RxDriveStatus, DeviceError> {
        self.cpu
            .rx8e()
            .ok_or(DeviceError::NotAttached(unit))?
            .get_status(unit)
    }

    pub fn rx_read_sector(
        &self,
        unit: usize,
        track: u16,
        sector: u16,
        target: &mut [u16],
    ) -> Result<(), DeviceError> {
        self.cpu
            .rx8e()
            .ok_or(DeviceError::NotAttached(unit))?
            .read_sector(unit, track, sector, target)
    }

    pub fn rx_write_sector(
        &self,
        unit: usize,
        track: u16,
        sector: u16,
        source: &[u16],
    ) -> Result<(), DeviceError> {
        self.cpu
            .rx8e()
            .ok_or(DeviceError::NotAttached(unit))?
            .write_sector(unit, track, sector, source)
    }

    /// Attach TC08 media, creating the controller on first use.
    pub fn attach_tc(
        &mut self,
        unit: usize,
        path: &Path,
        create_if_missing: bool,
    ) -> Result<(), DeviceError> {
        if self.cpu.tc08().is_none() {
            self.cpu.attach_tc08(Tc08::new());
        }
        self.cpu
            .tc08_mut()
            .expect("controller just attached")
            .attach(unit, path, create_if_missing)?;
        log::info!("TC08 unit {} attached to {}", unit, path.display());
        Ok(())
    }

    pub fn detach_tc(&mut self, unit: usize) -> Result<bool, DeviceError> {
        match self.cpu.tc08_mut() {
            Some(tc08) => tc08.detach(unit),
            None => Ok(false),
        }
    }

    pub fn tc_status(&self, unit: usize) -> Result<TcDriveStatus, DeviceError> {
        self.cpu
            .tc08()
            .ok_or(DeviceError::NotAttached(unit))?
            .get_status(unit)
    }

    pub fn tc_read_block(
        &self,
        unit: usize,
        block: u16,
        target: &mut [u16],
    ) -> Result<(), DeviceError> {
        self.cpu
            .tc08()
            .ok_or(DeviceError::NotAttached(unit))?
            .read_block(unit, block, target)
    }

    pub fn tc_write_block(
        &self,
        unit: usize,
        block: u16,
        source: &[u16],
    ) -> Result<(), DeviceError> {
        self.cpu
            .tc08()
            .ok_or(DeviceError::NotAttached(unit))?
            .write_block(unit, block, source)
    }

    // ---- Program images ----

    /// Load an octal or S-record image into core. An S9 start address
    /// also sets PC. Returns the parsed image so the caller can report
    /// what was loaded.
    pub fn load_image_file(&mut self, path: &Path) -> Result<LoadedImage, ImageError> {
        let image = image_loader::load_image(path)?;
        self.load_image(&image);
        Ok(image)
    }

    pub fn load_image(&mut self, image: &LoadedImage) {
        for (&addr, &value) in &image.words {
            self.cpu.memory_mut().set(addr, value);
        }
        if let Some(start) = image.start {
            self.cpu.set_pc(start);
        }
    }

    /// Save `[start, end]` to a host file in the dump format.
    pub fn save_image_file(
        &self,
        path: &Path,
        start: u16,
        end: u16,
    ) -> Result<(), ImageError> {
        let text = self
            .dump(start, end)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl Default for Pdp8eSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for Pdp8eSystem {
    fn reset(&mut self) {
        self.cpu.reset();
    }

    fn step(&mut self) -> usize {
        self.cpu.step()
    }

    fn run(&mut self, max_steps: usize) -> usize {
        self.cpu.run(max_steps)
    }

    fn halted(&self) -> bool {
        self.cpu.halt
    }

    fn clear_halt(&mut self) {
        self.cpu.clear_halt();
    }
}
