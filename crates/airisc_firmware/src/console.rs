//! UART0 console.
//!
//! Standard output is a raw byte stream on UART0; nothing is translated.
//! The console lock is only ever taken with machine interrupts disabled, so
//! a trap handler that prints can never find it held by the code it
//! interrupted.

use crate::config;
use airisc_bsp::csr::{MachineCsrs, critical_section};
use airisc_bsp::reg::Mmio;
use airisc_bsp::uart::{Uart, UartConfig};
use airisc_common::mmio::PERIPHERALS;
use core::fmt;
use log::{Log, Metadata, Record};
use spin::Mutex;

// SAFETY: the UART0 block is mapped at this address for the life of the image.
static CONSOLE: Mutex<Uart> = Mutex::new(Uart::new(unsafe { Mmio::new(PERIPHERALS.uart0) }));

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Runs `f` on the console UART inside a critical section.
///
/// Returns `None` if interrupts could not be masked.
fn with_console<R>(f: impl FnOnce(&mut Uart) -> R) -> Option<R> {
    critical_section(&mut MachineCsrs, |_| f(&mut CONSOLE.lock())).ok()
}

/// Programs the line settings and routes `log` records to the console.
pub fn init(line: &UartConfig) {
    with_console(|uart| {
        uart.init(line);
        uart.clear_rx_fifo();
    });
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(config::LOG_LEVEL);
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    with_console(|uart| {
        let _ = uart.write_fmt(args);
    });
}

pub fn input_pending() -> bool {
    with_console(|uart| !uart.rx_empty()).unwrap_or(false)
}

/// Reads a carriage-return terminated line from standard input.
///
/// Same contract as [`Uart::read_line`], but the lock is released between
/// bytes so interrupts keep being serviced while waiting for input.
pub fn read_line(buf: &mut [u8]) -> usize {
    for (i, slot) in buf.iter_mut().enumerate() {
        let byte = loop {
            if let Some(byte) = with_console(|uart| uart.try_read_byte()).flatten() {
                break byte;
            }
            core::hint::spin_loop();
        };
        if byte == b'\r' {
            *slot = 0;
            return i + 1;
        }
        *slot = byte;
    }
    buf.len()
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ({
        $crate::console::_print(format_args!($($arg)*));
    });
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\r\n"));
    ($($arg:tt)*) => ({
        $crate::console::_print(format_args!($($arg)*));
        $crate::console::_print(format_args!("\r\n"));
    });
}

/// `log` backend writing `[LEVEL] target: message` lines to the console.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            _print(format_args!(
                "[{}] {}: {}\r\n",
                record.level(),
                record.target(),
                record.args()
            ));
        }
    }

    fn flush(&self) {}
}
