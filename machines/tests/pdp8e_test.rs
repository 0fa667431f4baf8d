use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use flipchip_core::core::Machine;
use flipchip_core::device::{BufferConsole, Console};
use flipchip_machines::Pdp8eSystem;
use flipchip_machines::image_loader::parse_image;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("flipchip_pdp8e_test").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Console handle shared between the system and the test.
#[derive(Clone, Default)]
struct SharedConsole(Rc<RefCell<BufferConsole>>);

impl SharedConsole {
    fn output(&self) -> Vec<u8> {
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

#[test]
fn hello_program_deposited_from_the_front_panel() {
    let console = SharedConsole::default();
    let mut sys = Pdp8eSystem::with_console(Box::new(console.clone()));

    // CLA CLL; TAD 0204; TLS; HLT; "A"
    sys.load_address(0o200);
    for word in [0o7300, 0o1204, 0o6046, 0o7402, 0o0101] {
        sys.deposit(word).unwrap();
    }
    sys.load_address(0o200);
    sys.run(100);

    assert!(sys.halted());
    let state = sys.registers();
    assert_eq!(state.ac, 0o0101);
    assert_eq!(console.output(), vec![0x41]);
}

#[test]
fn hello_program_loaded_from_an_octal_image() {
    let dir = temp_dir("octal");
    let path = dir.join("hello.oct");
    std::fs::write(&path, "@200 7300 1204 6046 7402 0101 ; hello\n").unwrap();

    let console = SharedConsole::default();
    let mut sys = Pdp8eSystem::with_console(Box::new(console.clone()));
    sys.load_image_file(&path).unwrap();
    sys.load_address(0o200);
    sys.run(100);

    assert!(sys.halted());
    assert_eq!(console.output(), vec![0x41]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn srec_image_sets_pc_from_s9() {
    let dir = temp_dir("srec");
    let path = dir.join("hello.srec");

    let words: std::collections::BTreeMap<u16, u16> =
        [(0o300, 0o7402)].into_iter().collect();
    let mut text = flipchip_core::srec::encode(&words, 0o300).join("\n");
    text.push('\n');
    std::fs::write(&path, text).unwrap();

    let mut sys = Pdp8eSystem::new();
    sys.load_image_file(&path).unwrap();
    assert_eq!(sys.registers().pc, 0o300);
    sys.run(10);
    assert!(sys.halted());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn auto_index_pointer_program() {
    let mut sys = Pdp8eSystem::new();
    // TAD I 0010; HLT with the pointer pre-incrementing to 0300.
    sys.poke(0o010, 0o0277).unwrap();
    sys.poke(0o300, 0o7777).unwrap();
    sys.poke(0o200, 0o1410).unwrap();
    sys.poke(0o201, 0o7402).unwrap();
    sys.load_address(0o200);
    sys.run(10);

    assert!(sys.halted());
    let state = sys.registers();
    assert_eq!(sys.peek(0o010).unwrap(), 0o0300);
    assert_eq!(state.ac, 0o7777);
    assert!(!state.link);
}

#[test]
fn examine_walks_memory() {
    let mut sys = Pdp8eSystem::new();
    sys.poke(0o100, 0o1111).unwrap();
    sys.poke(0o101, 0o2222).unwrap();
    sys.load_address(0o100);
    assert_eq!(sys.examine().unwrap(), 0o1111);
    assert_eq!(sys.examine().unwrap(), 0o2222);
    assert_eq!(sys.registers().pc, 0o102);
}

#[test]
fn peek_rejects_out_of_range_addresses() {
    let sys = Pdp8eSystem::new();
    assert!(sys.peek(0o7777).is_ok());
    assert!(sys.peek(0o10000).is_err());
}

#[test]
fn dump_round_trips_through_the_image_loader() {
    let mut sys = Pdp8eSystem::new();
    for addr in 0o200..0o220u16 {
        sys.poke(addr, (addr * 3) & 0o7777).unwrap();
    }
    let text = sys.dump(0o200, 0o217).unwrap();
    let image = parse_image(&text).unwrap();
    for addr in 0o200..0o220u16 {
        assert_eq!(image.words.get(&addr), Some(&((addr * 3) & 0o7777)));
    }
}

#[test]
fn save_and_reload_memory_image() {
    let dir = temp_dir("save");
    let path = dir.join("core.sav");

    let mut sys = Pdp8eSystem::new();
    sys.poke(0o400, 0o4321).unwrap();
    sys.poke(0o407, 0o1234).unwrap();
    sys.save_image_file(&path, 0o400, 0o407).unwrap();

    let mut other = Pdp8eSystem::new();
    other.load_image_file(&path).unwrap();
    assert_eq!(other.peek(0o400).unwrap(), 0o4321);
    assert_eq!(other.peek(0o407).unwrap(), 0o1234);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn reset_clears_registers_and_memory() {
    let mut sys = Pdp8eSystem::new();
    sys.poke(0o200, 0o7402).unwrap();
    sys.load_address(0o200);
    sys.run(10);
    assert!(sys.halted());

    sys.reset();
    assert!(!sys.halted());
    let state = sys.registers();
    assert_eq!(state.pc, 0);
    assert_eq!(sys.peek(0o200).unwrap(), 0);
}

#[test]
fn line_printer_output_lands_in_the_host_file() {
    let dir = temp_dir("lpt");
    let path = dir.join("out.lpt");

    let mut sys = Pdp8eSystem::new();
    sys.attach_line_printer(&path).unwrap();
    // CLA; TAD 0204; LPT; HLT; "Z"
    sys.load_address(0o200);
    for word in [0o7200, 0o1204, 0o6604, 0o7402, 0o0132] {
        sys.deposit(word).unwrap();
    }
    sys.load_address(0o200);
    sys.run(100);

    assert!(sys.halted());
    assert_eq!(std::fs::read(&path).unwrap(), b"Z");
    assert!(sys.detach_line_printer());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn rx_media_round_trip_through_system_admin() {
    let dir = temp_dir("rx");
    let path = dir.join("disk.rx01");

    let mut sys = Pdp8eSystem::new();
    sys.attach_rx(0, &path, true).unwrap();
    let data: Vec<u16> = (0..64u16).map(|i| i | 0o4000).collect();
    sys.rx_write_sector(0, 10, 3, &data).unwrap();

    let mut back = vec![0u16; 64];
    sys.rx_read_sector(0, 10, 3, &mut back).unwrap();
    assert_eq!(back, data);
    assert!(sys.detach_rx(0).unwrap());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn tc_media_round_trip_through_system_admin() {
    let dir = temp_dir("tc");
    let path = dir.join("tape.tc08");

    let mut sys = Pdp8eSystem::new();
    sys.attach_tc(0, &path, true).unwrap();
    let data: Vec<u16> = (0..129u16).collect();
    sys.tc_write_block(0, 5, &data).unwrap();

    let mut back = vec![0u16; 129];
    sys.tc_read_block(0, 5, &mut back).unwrap();
    assert_eq!(&back[..128], &data[..128]);
    assert_eq!(back[128], 0);
    std::fs::remove_dir_all(&dir).unwrap();
}
