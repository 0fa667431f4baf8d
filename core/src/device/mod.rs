//! Peripheral device controllers and the IOT seam the CPU drives them
//! through.
//!
//! Each controller is a plain state machine owning its host-side media
//! handles. During an IOT instruction the CPU lends the device a narrow
//! view of itself ([`IoBus`]) so the device can exchange data through AC
//! and, for block-transfer controllers, core memory.

use std::fmt;

use crate::core::memory::CoreMemory;

pub mod line_printer;
pub mod rx8e;
pub mod tc08;
pub mod teletype;

pub use line_printer::LinePrinter;
pub use rx8e::{Density, Rx8e};
pub use tc08::Tc08;
pub use teletype::{BufferConsole, Console, HostConsole, NullConsole};

/// The slice of CPU state a peripheral may touch while servicing an IOT.
pub struct IoBus<'a> {
    /// Accumulator, already masked to 12 bits.
    pub ac: &'a mut u16,
    /// Core memory, for controllers that transfer whole blocks.
    pub memory: &'a mut CoreMemory,
}

/// A device that services IOT instructions.
pub trait Peripheral {
    /// Handle one IOT. `opcode` is the full 12-bit instruction word.
    /// Returns true when the next instruction should be skipped.
    fn handle_iot(&mut self, opcode: u16, io: &mut IoBus<'_>) -> bool;
}

/// Errors from device admin operations (attach and host-side media access).
#[derive(Debug)]
pub enum DeviceError {
    /// Drive number beyond what the controller supports.
    InvalidDrive(usize),
    /// Track number outside the media geometry.
    InvalidTrack(u16),
    /// Sector number outside the media geometry.
    InvalidSector(u16),
    /// Block number outside the media.
    InvalidBlock(u16),
    /// No media attached to the drive.
    NotAttached(usize),
    /// Caller-supplied buffer shorter than one sector or block.
    BufferTooSmall { needed: usize, got: usize },
    /// The drive is backed by an S-record image and cannot be written.
    ReadOnlyImage,
    /// Underlying host I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDrive(unit) => write!(f, "invalid drive {}", unit),
            Self::InvalidTrack(track) => write!(f, "invalid track {}", track),
            Self::InvalidSector(sector) => write!(f, "invalid sector {}", sector),
            Self::InvalidBlock(block) => write!(f, "invalid block {}", block),
            Self::NotAttached(unit) => write!(f, "no media attached to drive {}", unit),
            Self::BufferTooSmall { needed, got } => {
                write!(f, "buffer too small: need {} words, got {}", needed, got)
            }
            Self::ReadOnlyImage => write!(f, "image is read-only"),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
