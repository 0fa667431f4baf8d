//! Generate randomized PDP-8 single-step regression vectors.
//!
//! For each instruction class this runs the emulator one step from a
//! randomized state and records the before/after pair, so the suites
//! freeze current behavior. Output lands in `test_data/<class>.json`,
//! where the replay test picks it up.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use flipchip_core::cpu::Pdp8;
use flipchip_cpu_validation::{Pdp8CpuState, Pdp8TestCase, apply_state, capture_state};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NUM_TESTS: usize = 200;
const WORD_MASK: u16 = 0o7777;
const AUTO_INDEX_FIRST: u16 = 0o10;
const AUTO_INDEX_LAST: u16 = 0o17;

struct Class {
    name: &'static str,
    /// Builds a random instruction word for the class.
    instruction: fn(&mut StdRng) -> u16,
}

const CLASSES: &[Class] = &[
    Class {
        name: "and",
        instruction: |rng| memref(rng, 0o0000),
    },
    Class {
        name: "tad",
        instruction: |rng| memref(rng, 0o1000),
    },
    Class {
        name: "isz",
        instruction: |rng| memref(rng, 0o2000),
    },
    Class {
        name: "dca",
        instruction: |rng| memref(rng, 0o3000),
    },
    Class {
        name: "jms",
        instruction: |rng| memref(rng, 0o4000),
    },
    Class {
        name: "jmp",
        instruction: |rng| memref(rng, 0o5000),
    },
    Class {
        name: "opr_group1",
        instruction: |rng| 0o7000 | (rng.gen_range(0u16..0o400)),
    },
    Class {
        name: "opr_group2",
        // Bit 3 clear keeps it in group 2; HLT is fair game.
        instruction: |rng| 0o7400 | (rng.gen_range(0u16..0o400) & !0o10),
    },
    Class {
        name: "opr_group3",
        // Bit 3 set selects group 3.
        instruction: |rng| 0o7410 | (rng.gen_range(0u16..0o400) & !0o10),
    },
];

/// Random memory-reference word: random indirect/page bits and offset.
fn memref(rng: &mut StdRng, base: u16) -> u16 {
    base | rng.gen_range(0u16..0o1000)
}

fn generate_class(rng: &mut StdRng, class: &Class) -> Vec<Pdp8TestCase> {
    let mut tests = Vec::with_capacity(NUM_TESTS);
    for index in 0..NUM_TESTS {
        let instruction = (class.instruction)(rng);
        let pc = rng.gen_range(0u16..=WORD_MASK);

        // Seed every cell the instruction can reach, mirroring the
        // effective-address rules, so the sparse snapshot is complete.
        let mut ram: Vec<(u16, u16)> = vec![(pc, instruction)];
        let mut addresses: BTreeSet<u16> = BTreeSet::new();
        addresses.insert(pc);
        if instruction >> 9 <= 5 {
            let offset = instruction & 0o177;
            let base = if instruction & 0o200 != 0 {
                ((pc + 1) & WORD_MASK) & 0o7600
            } else {
                0
            };
            let direct = base | offset;
            seed_cell(rng, &mut ram, &mut addresses, direct, pc);
            if instruction & 0o400 != 0 {
                let pointer = ram
                    .iter()
                    .find(|&&(a, _)| a == direct)
                    .map(|&(_, w)| w)
                    .unwrap_or(0);
                let target = if (AUTO_INDEX_FIRST..=AUTO_INDEX_LAST).contains(&direct) {
                    (pointer + 1) & WORD_MASK
                } else {
                    pointer
                };
                seed_cell(rng, &mut ram, &mut addresses, target, pc);
            }
        }

        let initial = Pdp8CpuState {
            pc,
            ac: rng.gen_range(0..=WORD_MASK),
            mq: rng.gen_range(0..=WORD_MASK),
            l: rng.gen_range(0u8..=1),
            halt: false,
            ram,
        };

        let mut cpu = Pdp8::new();
        apply_state(&mut cpu, &initial);
        cpu.step();
        let final_state = capture_state(&cpu, &addresses);

        tests.push(Pdp8TestCase {
            name: format!("{}_{}", class.name, index),
            initial,
            final_state,
        });
    }
    tests
}

/// Give a reachable cell random contents unless something (usually the
/// instruction itself) already occupies it.
fn seed_cell(
    rng: &mut StdRng,
    ram: &mut Vec<(u16, u16)>,
    addresses: &mut BTreeSet<u16>,
    addr: u16,
    pc: u16,
) {
    addresses.insert(addr);
    if addr == pc || ram.iter().any(|&(a, _)| a == addr) {
        return;
    }
    ram.push((addr, rng.gen_range(0..=WORD_MASK)));
}

fn main() {
    let out_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_data");
    fs::create_dir_all(&out_dir).expect("Failed to create test_data directory");

    let mut rng = StdRng::seed_from_u64(0o7777_0001);
    for class in CLASSES {
        let tests = generate_class(&mut rng, class);
        let json = serde_json::to_string_pretty(&tests).expect("Failed to serialize test cases");
        let path = out_dir.join(format!("{}.json", class.name));
        fs::write(&path, json).unwrap_or_else(|e| panic!("Failed to write {:?}: {}", path, e));
        println!("{}: {} cases", class.name, tests.len());
    }
}
