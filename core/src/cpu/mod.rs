// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, Pdp8State};

// The PDP-8 processor
pub mod pdp8;
pub use pdp8::Pdp8;
