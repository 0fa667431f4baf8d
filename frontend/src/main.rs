//! flipchip: PDP-8 emulator, PAL assembler, and ROM linker front end.
//!
//! Thin glue over the core and machine crates: every subcommand parses
//! arguments, calls one library entry point, and prints a diagnostic
//! line on failure.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flipchip_core::asm;
use flipchip_core::core::Machine;
use flipchip_core::core::word::parse_octal;
use flipchip_core::device::HostConsole;
use flipchip_core::link;
use flipchip_machines::Pdp8eSystem;
use flipchip_machines::image_loader;

#[derive(Parser)]
#[command(
    name = "flipchip",
    about = "PDP-8 emulator, PAL assembler, and ROM linker",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a program image and run it
    Run {
        /// Octal or S-record program image
        image: PathBuf,
        /// Start address, octal; overrides the image's start record
        #[arg(long)]
        pc: Option<String>,
        /// Instruction budget
        #[arg(long, default_value_t = 1_000_000)]
        steps: usize,
        /// RX8E drive 0 image
        #[arg(long)]
        rx0: Option<PathBuf>,
        /// RX8E drive 1 image
        #[arg(long)]
        rx1: Option<PathBuf>,
        /// TC08 unit 0 image
        #[arg(long)]
        tc0: Option<PathBuf>,
        /// TC08 unit 1 image
        #[arg(long)]
        tc1: Option<PathBuf>,
        /// Line-printer output file
        #[arg(long)]
        lpt: Option<PathBuf>,
    },
    /// Assemble a PAL source file to S-records
    Asm {
        source: PathBuf,
        /// Output path; defaults to the source with extension .srec
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a listing to stdout
        #[arg(long)]
        listing: bool,
    },
    /// Build a ROM library from position-independent routines
    Buildlib {
        /// Library routine sources, packed in order
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Combined ROM output
        #[arg(short, long)]
        output: PathBuf,
        /// Symbol file output
        #[arg(long)]
        sym: PathBuf,
        /// Base address, octal
        #[arg(long, default_value = "200")]
        base: String,
        /// Page size, octal
        #[arg(long, default_value = "200")]
        page: String,
    },
    /// Link an application against a ROM library
    Link {
        lib_rom: PathBuf,
        lib_sym: PathBuf,
        app: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print a program image as an octal memory dump
    Dump {
        image: PathBuf,
        /// First address, octal; defaults to the lowest populated
        #[arg(long)]
        start: Option<String>,
        /// Last address, octal; defaults to the highest populated
        #[arg(long)]
        end: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("flipchip: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Run {
            image,
            pc,
            steps,
            rx0,
            rx1,
            tc0,
            tc1,
            lpt,
        } => run_image(&image, pc.as_deref(), steps, rx0, rx1, tc0, tc1, lpt),
        Command::Asm {
            source,
            output,
            listing,
        } => assemble(&source, output, listing),
        Command::Buildlib {
            sources,
            output,
            sym,
            base,
            page,
        } => {
            let base = octal_arg(&base, "--base")?;
            let page = octal_arg(&page, "--page")?;
            link::build_lib(&sources, base, page, &output, &sym).map_err(|e| e.to_string())
        }
        Command::Link {
            lib_rom,
            lib_sym,
            app,
            output,
        } => link::link(&lib_rom, &lib_sym, &app, &output).map_err(|e| e.to_string()),
        Command::Dump { image, start, end } => dump(&image, start.as_deref(), end.as_deref()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_image(
    image: &Path,
    pc: Option<&str>,
    steps: usize,
    rx0: Option<PathBuf>,
    rx1: Option<PathBuf>,
    tc0: Option<PathBuf>,
    tc1: Option<PathBuf>,
    lpt: Option<PathBuf>,
) -> Result<(), String> {
    let config = config::load();
    let mut sys = Pdp8eSystem::with_console(Box::new(HostConsole::new()));

    for (unit, path) in [(0usize, rx0), (1, rx1)] {
        if let Some(path) = path {
            let path = config.resolve_media(&path);
            sys.attach_rx(unit, &path, true).map_err(|e| e.to_string())?;
        }
    }
    for (unit, path) in [(0usize, tc0), (1, tc1)] {
        if let Some(path) = path {
            let path = config.resolve_media(&path);
            sys.attach_tc(unit, &path, true).map_err(|e| e.to_string())?;
        }
    }
    if let Some(path) = lpt {
        sys.attach_line_printer(&path).map_err(|e| e.to_string())?;
    }

    let loaded = sys.load_image_file(image).map_err(|e| e.to_string())?;
    match pc {
        Some(text) => sys.load_address(octal_arg(text, "--pc")?),
        None if loaded.start.is_none() => sys.load_address(asm::DEFAULT_ORIGIN),
        None => {}
    }

    let executed = sys.run(steps);
    println!("{}", sys.registers_line());
    if sys.halted() {
        println!("halted after {} instructions", executed);
    } else {
        println!("budget of {} instructions exhausted", steps);
    }
    Ok(())
}

fn assemble(source: &Path, output: Option<PathBuf>, listing: bool) -> Result<(), String> {
    let out_path = output.unwrap_or_else(|| source.with_extension("srec"));
    let assembly = asm::assemble_file(source, &out_path).map_err(|e| e.to_string())?;
    if listing {
        print!("{}", asm::render_listing(&assembly));
    }
    if !assembly.errors.is_empty() {
        for error in &assembly.errors {
            eprintln!("{}", error);
        }
        return Err(format!("{} assembly errors", assembly.errors.len()));
    }
    println!(
        "{} words -> {}",
        assembly.words.len(),
        out_path.display()
    );
    Ok(())
}

fn dump(image: &Path, start: Option<&str>, end: Option<&str>) -> Result<(), String> {
    let loaded = image_loader::load_image(image).map_err(|e| e.to_string())?;
    let (Some(&lo), Some(&hi)) = (loaded.words.keys().next(), loaded.words.keys().next_back())
    else {
        return Err("image is empty".to_string());
    };
    let start = match start {
        Some(text) => octal_arg(text, "--start")?,
        None => lo,
    };
    let end = match end {
        Some(text) => octal_arg(text, "--end")?,
        None => hi,
    };
    if end < start {
        return Err("--end precedes --start".to_string());
    }

    let values: Vec<u16> = (start..=end)
        .map(|addr| loaded.words.get(&addr).copied().unwrap_or(0))
        .collect();
    print!("{}", image_loader::format_dump(&values, start));
    Ok(())
}

fn octal_arg(text: &str, what: &str) -> Result<u16, String> {
    parse_octal(text).ok_or_else(|| format!("{} expects an octal address, got {}", what, text))
}
