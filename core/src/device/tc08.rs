//! TC08 DECtape controller.
//!
//! # Block format
//!
//! A tape block is 129 twelve-bit words: 128 data words plus one trailing
//! word the hardware reserved for metadata. Image files store each block
//! as 129 consecutive little-endian 16-bit words with only the low 12
//! bits significant; the trailing word is forced to zero on write.
//!
//! A drive may instead be backed by an S-record program image: when the
//! attached file begins with an `S1`/`S9` record it is decoded into an
//! in-memory word array and the drive becomes read-only. Blocks past the
//! end of such an image read as zeros.
//!
//! # IOT assignments (device 676x/677x)
//!
//! | Opcode | Name | Effect                                            |
//! |--------|------|---------------------------------------------------|
//! | 6762   | DTCA | clear controller ready and the transfer address   |
//! | 6764   | DTSF | skip when ready                                   |
//! | 6766   | DTLB | read block `AC & 1777` from unit `AC` bit 10 into memory at the transfer address; skip on success |
//! | 6771   | DTXA | load the transfer address from AC                 |
//!
//! Any drive failure (missing media, short read, bad block) leaves the
//! controller not-ready; the guest detects it by the missing skip.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{DeviceError, IoBus, Peripheral};
use crate::core::word::WORD_MASK;
use crate::srec;

pub const DT_DTCA: u16 = 0o6762;
pub const DT_DTSF: u16 = 0o6764;
pub const DT_DTLB: u16 = 0o6766;
pub const DT_DTXA: u16 = 0o6771;

pub const TC_UNITS: usize = 2;
pub const BLOCK_WORDS: usize = 129;
pub const BLOCK_BYTES: usize = BLOCK_WORDS * 2;

/// Highest block number addressable through DTLB (`AC & 1777`).
pub const MAX_BLOCK: u16 = 0o1777;

const UNIT_BIT: u16 = 0o2000;

/// Host-side view of one attached drive.
#[derive(Debug, Clone)]
pub struct TcDriveStatus {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub read_only: bool,
}

struct TcDrive {
    path: PathBuf,
    /// Present when the media is an S-record image; such drives are
    /// read-only.
    srec_image: Option<Vec<u16>>,
}

/// TC08 controller: two drives plus the ready flag and transfer address
/// the block IOTs use.
pub struct Tc08 {
    drives: [Option<TcDrive>; TC_UNITS],
    ready: bool,
    transfer_addr: u16,
}

impl Tc08 {
    pub fn new() -> Self {
        Self {
            drives: [None, None],
            ready: false,
            transfer_addr: 0,
        }
    }

    /// Attach a drive to a host image file. An existing file beginning
    /// with an S-record is decoded into a read-only word image; anything
    /// else is treated as a writable binary tape.
    pub fn attach(
        &mut self,
        unit: usize,
        path: &Path,
        create_if_missing: bool,
    ) -> Result<(), DeviceError> {
        if unit >= TC_UNITS {
            return Err(DeviceError::InvalidDrive(unit));
        }
        let srec_image = match std::fs::read(path) {
            Ok(data) => {
                if looks_like_srec(&data) {
                    let text = String::from_utf8_lossy(&data);
                    let decoded = srec::decode(&text)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                    Some(image_words(&decoded.bytes))
                } else {
                    None
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && create_if_missing => {
                std::fs::File::create(path)?;
                None
            }
            Err(e) => return Err(e.into()),
        };
        self.drives[unit] = Some(TcDrive {
            path: path.to_path_buf(),
            srec_image,
        });
        Ok(())
    }

    /// Detach a drive, returning whether media was attached.
    pub fn detach(&mut self, unit: usize) -> Result<bool, DeviceError> {
        if unit >= TC_UNITS {
            return Err(DeviceError::InvalidDrive(unit));
        }
        Ok(self.drives[unit].take().is_some())
    }

    pub fn get_status(&self, unit: usize) -> Result<TcDriveStatus, DeviceError> {
        let drive = self.drive(unit)?;
        let size_bytes = match &drive.srec_image {
            Some(image) => image.len() as u64 * 2,
            None => std::fs::metadata(&drive.path)?.len(),
        };
        Ok(TcDriveStatus {
            path: drive.path.clone(),
            size_bytes,
            read_only: drive.srec_image.is_some(),
        })
    }

    /// Read one 129-word block into `target` (host-side admin access).
    pub fn read_block(
        &self,
        unit: usize,
        block: u16,
        target: &mut [u16],
    ) -> Result<(), DeviceError> {
        let drive = self.drive(unit)?;
        if block > MAX_BLOCK {
            return Err(DeviceError::InvalidBlock(block));
        }
        if target.len() < BLOCK_WORDS {
            return Err(DeviceError::BufferTooSmall {
                needed: BLOCK_WORDS,
                got: target.len(),
            });
        }
        match &drive.srec_image {
            Some(image) => {
                let base = block as usize * BLOCK_WORDS;
                for (i, slot) in target[..BLOCK_WORDS].iter_mut().enumerate() {
                    *slot = image.get(base + i).copied().unwrap_or(0);
                }
            }
            None => {
                let mut bytes = [0u8; BLOCK_BYTES];
                let mut file = std::fs::File::open(&drive.path)?;
                file.seek(SeekFrom::Start(block as u64 * BLOCK_BYTES as u64))?;
                file.read_exact(&mut bytes)?;
                for (i, slot) in target[..BLOCK_WORDS].iter_mut().enumerate() {
                    let raw = u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);
                    *slot = raw & WORD_MASK;
                }
            }
        }
        Ok(())
    }

    /// Write one 129-word block from `source` (host-side admin access).
    /// The trailing word is stored as zero.
    pub fn write_block(
        &self,
        unit: usize,
        block: u16,
        source: &[u16],
    ) -> Result<(), DeviceError> {
        let drive = self.drive(unit)?;
        if block > MAX_BLOCK {
            return Err(DeviceError::InvalidBlock(block));
        }
        if source.len() < BLOCK_WORDS {
            return Err(DeviceError::BufferTooSmall {
                needed: BLOCK_WORDS,
                got: source.len(),
            });
        }
        if drive.srec_image.is_some() {
            return Err(DeviceError::ReadOnlyImage);
        }
        let mut bytes = [0u8; BLOCK_BYTES];
        for (i, &word) in source[..BLOCK_WORDS - 1].iter().enumerate() {
            bytes[2 * i..2 * i + 2].copy_from_slice(&(word & WORD_MASK).to_le_bytes());
        }
        // Trailing metadata word always zero; bytes already are.
        let mut file = OpenOptions::new().write(true).open(&drive.path)?;
        file.seek(SeekFrom::Start(block as u64 * BLOCK_BYTES as u64))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    fn drive(&self, unit: usize) -> Result<&TcDrive, DeviceError> {
        if unit >= TC_UNITS {
            return Err(DeviceError::InvalidDrive(unit));
        }
        self.drives[unit]
            .as_ref()
            .ok_or(DeviceError::NotAttached(unit))
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn transfer_addr(&self) -> u16 {
        self.transfer_addr
    }
}

impl Default for Tc08 {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for Tc08 {
    fn handle_iot(&mut self, opcode: u16, io: &mut IoBus<'_>) -> bool {
        match opcode {
            DT_DTCA => {
                self.ready = false;
                self.transfer_addr = 0;
                false
            }
            DT_DTSF => self.ready,
            DT_DTLB => {
                let unit = usize::from(*io.ac & UNIT_BIT != 0);
                let block = *io.ac & MAX_BLOCK;
                let mut words = [0u16; BLOCK_WORDS];
                match self.read_block(unit, block, &mut words) {
                    Ok(()) => {
                        for (i, &word) in words.iter().enumerate() {
                            io.memory
                                .set(self.transfer_addr.wrapping_add(i as u16) & WORD_MASK, word);
                        }
                        self.ready = true;
                        true
                    }
                    Err(e) => {
                        log::warn!("TC08 block read failed: {}", e);
                        self.ready = false;
                        false
                    }
                }
            }
            DT_DTXA => {
                self.transfer_addr = *io.ac & WORD_MASK;
                false
            }
            _ => false,
        }
    }
}

fn looks_like_srec(data: &[u8]) -> bool {
    let trimmed = data
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(2)
        .collect::<Vec<_>>();
    matches!(trimmed.as_slice(), [b'S', b'1'] | [b'S', b'9'])
}

/// Build the word image backing an S-record tape: word `w` comes from
/// byte addresses `2w` (low 8 bits) and `2w + 1` (high 4 bits), sized to
/// one past the highest populated byte address.
fn image_words(bytes: &std::collections::BTreeMap<u32, u8>) -> Vec<u16> {
    let Some((&max_addr, _)) = bytes.iter().next_back() else {
        return Vec::new();
    };
    let len = max_addr as usize / 2 + 1;
    let mut words = vec![0u16; len];
    for (w, slot) in words.iter_mut().enumerate() {
        let lo = bytes.get(&(2 * w as u32)).copied().unwrap_or(0);
        let hi = bytes.get(&(2 * w as u32 + 1)).copied().unwrap_or(0);
        *slot = (u16::from(lo) | (u16::from(hi & 0x0F) << 8)) & WORD_MASK;
    }
    words
}
