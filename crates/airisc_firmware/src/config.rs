//! Board configuration of the firmware image.

use airisc_bsp::uart::{Parity, UartConfig};
use log::LevelFilter;

/// Core clock frequency, also the timer count rate.
pub const CLOCK_HZ: u32 = 32_000_000;

pub const UART0_BAUD: u32 = 9600;

/// Console line settings: 8 data bits, even parity, 1 stop bit.
pub const CONSOLE: UartConfig = UartConfig::new(CLOCK_HZ, UART0_BAUD).with_parity(Parity::Even);

/// Timer cycles between two ticks, one second.
pub const TICK_PERIOD: u64 = CLOCK_HZ as u64;

/// GPIO pins driven as outputs.
pub const GPIO_OUTPUTS: u32 = u32::MAX;

#[cfg(not(feature = "verbose"))]
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

#[cfg(feature = "verbose")]
pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
