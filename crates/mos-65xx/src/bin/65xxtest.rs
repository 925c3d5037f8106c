//! Functional-test image runner.
//!
//! Runs a flat 64 KiB test image (such as the Dormann functional test
//! suites, assembled with origin $0000) until it reaches the success
//! address or traps. A trap — the PC stuck on itself — is how those suites
//! report a failed check.
//!
//! Usage: `65xxtest <image.bin> [--cmos] [start] [success]`
//! with `start` and `success` as hex addresses (defaults $0400 and $3469).
//! Set `RUST_LOG=trace` for a full bus trace.

use std::fs;
use std::process::ExitCode;

use mos_65xx::{System, Variant};

struct Options {
    path: String,
    variant: Variant,
    start: u16,
    success: u16,
}

fn parse_args() -> Option<Options> {
    let mut path = None;
    let mut variant = Variant::Nmos6502;
    let mut addresses = Vec::new();

    for arg in std::env::args().skip(1) {
        if arg == "--cmos" {
            variant = Variant::Cmos65C02;
        } else if path.is_none() {
            path = Some(arg);
        } else {
            addresses.push(u16::from_str_radix(arg.trim_start_matches('$'), 16).ok()?);
        }
    }

    Some(Options {
        path: path?,
        variant,
        start: addresses.first().copied().unwrap_or(0x0400),
        success: addresses.get(1).copied().unwrap_or(0x3469),
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(options) = parse_args() else {
        eprintln!("usage: 65xxtest <image.bin> [--cmos] [start] [success]");
        return ExitCode::FAILURE;
    };

    let image = match fs::read(&options.path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("failed to load test image {}: {e}", options.path);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Running {} ({} bytes) as {:?}...",
        options.path,
        image.len(),
        options.variant
    );

    let mut system = match System::builder(options.variant)
        .ram(0x0000, 0x10000)
        .load(0x0000, &image)
        .build()
    {
        Ok(system) => system,
        Err(e) => {
            eprintln!("bad session configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    system.reset();
    system.cpu_mut().regs.pc = options.start;

    let mut last_pc = options.start;
    let mut stuck_count = 0;
    let mut total_cycles: u64 = 0;
    let mut instruction_count: u64 = 0;
    let start_time = std::time::Instant::now();

    loop {
        match system.step() {
            Ok(cycles) => total_cycles += cycles,
            Err(e) => {
                let regs = system.cpu().regs;
                eprintln!("execution halted: {e}");
                eprintln!(
                    "  A=${:02X} X=${:02X} Y=${:02X} S=${:02X} P=${:02X}",
                    regs.a, regs.x, regs.y, regs.s, regs.p.0
                );
                return ExitCode::FAILURE;
            }
        }
        instruction_count += 1;

        let pc = system.cpu().pc();
        if pc == options.success {
            let elapsed = start_time.elapsed();
            println!("SUCCESS: reached ${pc:04X}");
            println!("  Instructions executed: {instruction_count}");
            println!("  Total cycles: {total_cycles}");
            println!(
                "  Effective speed: {:.2} MHz",
                total_cycles as f64 / elapsed.as_secs_f64() / 1_000_000.0
            );
            return ExitCode::SUCCESS;
        }

        if pc == last_pc {
            stuck_count += 1;
            if stuck_count >= 3 {
                let regs = system.cpu().regs;
                println!("TRAP at ${pc:04X} after {instruction_count} instructions");
                println!(
                    "  A=${:02X} X=${:02X} Y=${:02X} S=${:02X} P=${:02X}",
                    regs.a, regs.x, regs.y, regs.s, regs.p.0
                );
                print!("  Memory around PC:");
                for offset in 0..8u16 {
                    let addr = pc.saturating_sub(2).wrapping_add(offset);
                    print!(" {:02X}", system.bus_mut().peek(addr));
                }
                println!();
                return ExitCode::FAILURE;
            }
        } else {
            stuck_count = 0;
        }
        last_pc = pc;
    }
}
