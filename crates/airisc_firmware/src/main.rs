//! AIRISC demo firmware.
//!
//! Brings up GPIO and the UART0 console, starts a one-second timer tick,
//! mirrors the uptime on the GPIO pins and echoes console input lines.

#![no_std]
#![no_main]

use panic_halt as _;

mod config;
mod console;
mod trap;

use airisc_bsp::csr::{self, CsrAccess, MachineCsrs};
use airisc_bsp::delay::CycleDelay;
use airisc_bsp::gpio::Gpio;
use airisc_bsp::reg::Mmio;
use airisc_bsp::trng::Trng;
use airisc_common::csr::{Csr, Irq};
use airisc_common::mmio::PERIPHERALS;
use core::arch::global_asm;

global_asm!(include_str!("entry.S"));

#[unsafe(no_mangle)]
pub extern "C" fn kmain() -> ! {
    let mut csrs = MachineCsrs;
    let start = csrs.read(Csr::Cycle);

    // SAFETY: the GPIO block is mapped at this address for the life of the image.
    let mut gpio = Gpio::new(unsafe { Mmio::new(PERIPHERALS.gpio) });
    gpio.set_output_enable(config::GPIO_OUTPUTS);
    gpio.write(0xAA);

    console::init(&config::CONSOLE);
    println!();
    println!("Hello World!");
    let cycles = csrs.read(Csr::Cycle).wrapping_sub(start);
    println!(
        "boot took {cycles} clock cycles ({} us at {} Hz)",
        cycles as u64 * 1_000_000 / config::CLOCK_HZ as u64,
        config::CLOCK_HZ
    );

    if let Some(base) = PERIPHERALS.trng {
        // SAFETY: the TRNG block is mapped at this address for the life of the image.
        let mut trng = Trng::new(unsafe { Mmio::new(base) });
        trng.enable(&mut CycleDelay);
        let mut seed = [0u8; 4];
        trng.fill_bytes(&mut seed);
        log::info!(
            "trng seed {:#010x}{}",
            u32::from_le_bytes(seed),
            if trng.is_simulated() { " (simulated)" } else { "" }
        );
        trng.disable();
    }

    let mut handler = trap::FirmwareHandler::new();
    handler.start_timer();
    trap::install(handler);

    let enabled = csr::enable_irq(&mut csrs, Irq::MachineTimer)
        .and_then(|()| csr::enable_machine_interrupts(&mut csrs));
    if let Err(err) = enabled {
        log::error!("cannot enable timer interrupt: {err:?}");
        trap::halt(&mut csrs);
    }

    let mut shown = 0;
    loop {
        let seconds = trap::uptime_seconds();
        if seconds != shown {
            shown = seconds;
            gpio.write(seconds as u32);
            println!("uptime {seconds} s");
        }
        if console::input_pending() {
            let mut line = [0u8; 64];
            let len = console::read_line(&mut line);
            let text = line[..len].strip_suffix(&[0]).unwrap_or(&line[..len]);
            println!("> {}", core::str::from_utf8(text).unwrap_or("<non-utf8 input>"));
        }
        // SAFETY: the timer tick wakes the hart every second.
        unsafe { riscv::asm::wfi() };
    }
}
