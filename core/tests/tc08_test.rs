use std::path::PathBuf;

use flipchip_core::cpu::Pdp8;
use flipchip_core::device::DeviceError;
use flipchip_core::device::tc08::{BLOCK_WORDS, Tc08};
use flipchip_core::srec;

mod common;
use common::load_program;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("flipchip_tc08_test").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn block_round_trip_forces_trailing_word_to_zero() {
    let dir = temp_dir("roundtrip");
    let path = dir.join("tape.tc08");
    let mut tc08 = Tc08::new();
    tc08.attach(0, &path, true).unwrap();

    // Sequence 0..128 into block 5; word 128 must come back as zero.
    let data: Vec<u16> = (0..BLOCK_WORDS as u16).collect();
    tc08.write_block(0, 5, &data).unwrap();
    let mut back = vec![0u16; BLOCK_WORDS];
    tc08.read_block(0, 5, &mut back).unwrap();
    assert_eq!(&back[..128], &data[..128]);
    assert_eq!(back[128], 0);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn words_are_stored_little_endian_low_12_bits() {
    let dir = temp_dir("format");
    let path = dir.join("tape.tc08");
    let mut tc08 = Tc08::new();
    tc08.attach(0, &path, true).unwrap();

    let mut data = vec![0u16; BLOCK_WORDS];
    data[0] = 0o7777;
    data[1] = 0o0001;
    tc08.write_block(0, 0, &data).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], &[0xFF, 0x0F, 0x01, 0x00]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn read_past_end_of_binary_tape_fails() {
    let dir = temp_dir("short");
    let path = dir.join("tape.tc08");
    let mut tc08 = Tc08::new();
    tc08.attach(0, &path, true).unwrap();
    let mut back = vec![0u16; BLOCK_WORDS];
    assert!(matches!(
        tc08.read_block(0, 7, &mut back),
        Err(DeviceError::Io(_))
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn admin_errors() {
    let dir = temp_dir("errors");
    let path = dir.join("tape.tc08");
    let mut tc08 = Tc08::new();
    let mut buf = vec![0u16; BLOCK_WORDS];

    assert!(matches!(
        tc08.attach(5, &path, true),
        Err(DeviceError::InvalidDrive(5))
    ));
    assert!(matches!(
        tc08.read_block(0, 0, &mut buf),
        Err(DeviceError::NotAttached(0))
    ));

    tc08.attach(0, &path, true).unwrap();
    assert!(matches!(
        tc08.read_block(0, 0o2000, &mut buf),
        Err(DeviceError::InvalidBlock(0o2000))
    ));
    let mut short = vec![0u16; 64];
    assert!(matches!(
        tc08.read_block(0, 0, &mut short),
        Err(DeviceError::BufferTooSmall { needed: 129, got: 64 })
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn srec_backed_tape_is_read_only() {
    let dir = temp_dir("srec");
    let path = dir.join("boot.srec");
    // Words 0..4 of block 0 carry a recognizable pattern.
    let words: std::collections::BTreeMap<u16, u16> =
        [(0, 0o7300), (1, 0o1206), (2, 0o6046), (3, 0o7402)]
            .into_iter()
            .collect();
    let mut text = srec::encode(&words, 0).join("\n");
    text.push('\n');
    std::fs::write(&path, text).unwrap();

    let mut tc08 = Tc08::new();
    tc08.attach(0, &path, false).unwrap();
    assert!(tc08.get_status(0).unwrap().read_only);

    let mut back = vec![0u16; BLOCK_WORDS];
    tc08.read_block(0, 0, &mut back).unwrap();
    assert_eq!(&back[..4], &[0o7300, 0o1206, 0o6046, 0o7402]);
    assert!(back[4..].iter().all(|&w| w == 0));

    // Blocks past the image read as zeros.
    tc08.read_block(0, 100, &mut back).unwrap();
    assert!(back.iter().all(|&w| w == 0));

    let data = vec![0u16; BLOCK_WORDS];
    assert!(matches!(
        tc08.write_block(0, 0, &data),
        Err(DeviceError::ReadOnlyImage)
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}

/// Guest program: DTXA sets the transfer address, DTLB pulls a block
/// into memory and skips on success, DTSF reports ready.
#[test]
fn guest_program_reads_a_block() {
    let dir = temp_dir("guest");
    let path = dir.join("tape.tc08");
    let mut tc08 = Tc08::new();
    tc08.attach(0, &path, true).unwrap();
    let data: Vec<u16> = (0..BLOCK_WORDS as u16).map(|i| (i * 5) & 0o7777).collect();
    tc08.write_block(0, 5, &data).unwrap();

    let mut cpu = Pdp8::new();
    cpu.attach_tc08(tc08);
    load_program(
        &mut cpu,
        0o200,
        &[
            0o7300, // CLA CLL
            0o1210, // TAD (transfer address 0400)
            0o6771, // DTXA
            0o7200, // CLA
            0o1211, // TAD (block 5)
            0o6766, // DTLB, skips on success
            0o7402, // HLT (failure)
            0o7402, // HLT (success)
        ],
    );
    cpu.memory_mut().set(0o210, 0o0400);
    cpu.memory_mut().set(0o211, 0o0005);

    cpu.run(100);
    assert!(cpu.halt);
    assert_eq!(cpu.pc, 0o210); // halted past the skip

    for i in 0..128u16 {
        assert_eq!(cpu.memory().at(0o400 + i), (i * 5) & 0o7777, "word {}", i);
    }
    assert_eq!(cpu.memory().at(0o400 + 128), 0);
    assert!(cpu.tc08().unwrap().ready());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_block_read_leaves_controller_not_ready() {
    let dir = temp_dir("guest_fail");
    let path = dir.join("tape.tc08");
    let mut tc08 = Tc08::new();
    tc08.attach(0, &path, true).unwrap(); // empty tape: every read is short

    let mut cpu = Pdp8::new();
    cpu.attach_tc08(tc08);
    load_program(
        &mut cpu,
        0o200,
        &[
            0o7300, // CLA CLL
            0o6771, // DTXA (address 0)
            0o1207, // TAD (block 3)
            0o6766, // DTLB, no skip on failure
            0o7402, // HLT (failure path)
            0o7402, // HLT
        ],
    );
    cpu.memory_mut().set(0o207, 0o0003);
    cpu.run(100);
    assert!(cpu.halt);
    assert_eq!(cpu.pc, 0o205); // no skip taken
    assert!(!cpu.tc08().unwrap().ready());

    // DTSF falls through while not ready.
    cpu.clear_halt();
    load_program(&mut cpu, 0o300, &[0o6764, 0o7402, 0o7402]);
    cpu.run(10);
    assert_eq!(cpu.pc, 0o302);
    std::fs::remove_dir_all(&dir).unwrap();
}
