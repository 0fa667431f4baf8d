//! Machine-agnostic control interface for emulated systems.
//!
//! The front end and any monitor REPL drive the machine through this trait
//! and do not know about the CPU internals, attached peripherals, or media
//! formats behind it.

pub trait Machine {
    /// Reset to the power-on state: memory and registers cleared.
    fn reset(&mut self);

    /// Execute one instruction. Returns the number of instructions
    /// executed (0 when halted).
    fn step(&mut self) -> usize;

    /// Execute up to `max_steps` instructions, stopping early on HALT.
    /// Returns the number of instructions executed.
    fn run(&mut self, max_steps: usize) -> usize;

    /// True while the HALT flip-flop is set.
    fn halted(&self) -> bool;

    /// Clear the HALT flip-flop so execution can continue.
    fn clear_halt(&mut self);
}
