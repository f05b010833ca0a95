//! Board-support drivers for the AIRISC RISC-V microcontroller.
//!
//! This crate provides typed access to the memory-mapped peripherals of the
//! AIRISC SoC (timer, UART, SPI, GPIO, TRNG), the core's control and status
//! registers, and the trap dispatch machinery that routes interrupts and
//! exceptions to firmware-supplied handlers. Every driver is generic over a
//! register bus so the same code runs against real hardware and against the
//! simulated register files used by the host-side tests.

#![cfg_attr(not(test), no_std)]

/// Control and status register access.
///
/// Defines the `CsrAccess` trait used by the trap dispatcher and the
/// interrupt helpers, and the machine-mode implementation that issues one
/// `csrr`/`csrw`/`csrs`/`csrc` instruction per operation.
pub mod csr;

/// Busy-wait delays measured in core clock cycles.
pub mod delay;

/// Status word layout shared by the UART and SPI FIFOs.
pub mod fifo;

/// General-purpose I/O driver.
pub mod gpio;

/// Register bus abstraction and bit-field helpers.
///
/// Every peripheral is reached through `RegisterBus`, a pair of 32-bit
/// volatile read/write operations at byte offsets from the block base.
pub mod reg;

/// Interrupt-cause routing for the timer tick and external channels.
///
/// Rearms the timer compare register on every tick, acknowledges the sixteen
/// AIRISC external interrupt channels, and takes the fatal path for any
/// other cause.
pub mod router;

/// SPI controller driver with software-managed transactions.
pub mod spi;

/// 64-bit system timer built from split 32-bit registers.
///
/// Implements the torn-read guard for `TIME` and the glitch-free update
/// ordering for `TIMECMP`.
pub mod timer;

/// First-level trap dispatch.
///
/// Captures `mcause`/`mepc`/`mtval`, routes to the installed interrupt or
/// exception handler, and fixes up the return address after synchronous
/// traps.
pub mod trap;

/// True random number generator driver.
pub mod trng;

/// UART driver with FIFO handshake and field-level configuration.
pub mod uart;

#[cfg(test)]
pub(crate) mod sim;

/// Error types returned by BSP operations.
///
/// Most peripheral conditions are exposed as status queries rather than
/// errors; these variants cover the few operations that can refuse to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BspError {
    /// The operation has no implementation on this hardware or BSP.
    ///
    /// Returned by SPI block transfers when the controller is in slave
    /// mode. The BSP deliberately does not guess at slave-side framing.
    Unsupported,

    /// A write was attempted to a read-only control and status register.
    ReadOnlyCsr,

    /// A bounded wait expired before the peripheral became ready.
    ///
    /// Only produced by the optional `_within` variants; the default
    /// blocking calls wait forever.
    Timeout,

    /// A register field holds an encoding reserved by the hardware.
    InvalidField,
}
