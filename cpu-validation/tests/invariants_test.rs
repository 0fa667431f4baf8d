//! Architectural invariants under random programs: registers and memory
//! stay 12-bit no matter what executes, and PC moves by exactly one
//! except for jumps, subroutine calls, taken skips, and HALT.

use flipchip_core::cpu::Pdp8;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WORD_MASK: u16 = 0o7777;

fn random_cpu(rng: &mut StdRng) -> Pdp8 {
    let mut cpu = Pdp8::new();
    for addr in 0..=WORD_MASK {
        cpu.memory_mut().set(addr, rng.gen_range(0..=WORD_MASK));
    }
    cpu.set_pc(rng.gen_range(0..=WORD_MASK));
    cpu.ac = rng.gen_range(0..=WORD_MASK);
    cpu.mq = rng.gen_range(0..=WORD_MASK);
    cpu.link = rng.gen_bool(0.5);
    cpu
}

#[test]
fn registers_and_memory_stay_twelve_bit() {
    let mut rng = StdRng::seed_from_u64(0x0dec_0008);
    for _ in 0..20 {
        let mut cpu = random_cpu(&mut rng);
        for _ in 0..5_000 {
            if cpu.step() == 0 {
                cpu.clear_halt();
                cpu.set_pc(rng.gen_range(0..=WORD_MASK));
            }
            assert!(cpu.ac <= WORD_MASK);
            assert!(cpu.mq <= WORD_MASK);
            assert!(cpu.pc <= WORD_MASK);
            assert!(cpu.ir <= WORD_MASK);
        }
        for addr in 0..=WORD_MASK {
            assert!(cpu.memory().at(addr) <= WORD_MASK);
        }
    }
}

#[test]
fn pc_advances_by_one_without_branching() {
    let mut rng = StdRng::seed_from_u64(0x0dec_0009);
    let mut cpu = random_cpu(&mut rng);
    for _ in 0..20_000 {
        let pc_before = cpu.pc;
        if cpu.step() == 0 {
            cpu.clear_halt();
            cpu.set_pc(rng.gen_range(0..=WORD_MASK));
            continue;
        }
        let opcode = cpu.ir >> 9;
        let expected = (pc_before + 1) & WORD_MASK;
        let skipped = (pc_before + 2) & WORD_MASK;
        match opcode {
            // JMS and JMP move PC arbitrarily.
            4 | 5 => {}
            // ISZ, IOT, and operate instructions may skip one.
            2 | 6 | 7 => {
                assert!(
                    cpu.pc == expected || cpu.pc == skipped,
                    "IR {:04o}: PC {:04o} -> {:04o}",
                    cpu.ir,
                    pc_before,
                    cpu.pc
                );
            }
            _ => assert_eq!(
                cpu.pc, expected,
                "IR {:04o}: PC {:04o} -> {:04o}",
                cpu.ir, pc_before, cpu.pc
            ),
        }
    }
}
