use crate::BspError;
use airisc_common::csr::{Csr, Irq, mstatus};

/// Access to the machine-mode control and status registers.
///
/// The trap dispatcher and the interrupt helpers only ever reach CSRs through
/// this trait, which keeps them usable against the simulated CSR file.
pub trait CsrAccess {
    fn read(&self, csr: Csr) -> u32;

    /// Replaces the whole register.
    ///
    /// # Errors
    ///
    /// Returns [`BspError::ReadOnlyCsr`] if `csr` is read-only; the register
    /// is left untouched.
    fn write(&mut self, csr: Csr, value: u32) -> Result<(), BspError>;

    /// Sets every bit of `mask`, leaving the others as they are.
    fn set_bits(&mut self, csr: Csr, mask: u32) -> Result<(), BspError>;

    /// Clears every bit of `mask`, leaving the others as they are.
    fn clear_bits(&mut self, csr: Csr, mask: u32) -> Result<(), BspError>;
}

const MSTATUS_MIE: u32 = 1 << mstatus::MIE;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
fn read_only_write(csr: Csr) -> BspError {
    log::warn!("write to read-only csr {:?} ({:#05x}) rejected", csr, csr.number());
    BspError::ReadOnlyCsr
}

/// The CSR file of the executing hart.
///
/// Each operation compiles to a single `csrr`, `csrw`, `csrs` or `csrc`
/// instruction with the CSR number encoded as an immediate.
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct MachineCsrs;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
macro_rules! machine_csr_ops {
    (
        read_only { $($ro:ident = $ro_addr:literal,)* }
        read_write { $($rw:ident = $rw_addr:literal,)* }
    ) => {
        impl CsrAccess for MachineCsrs {
            #[inline]
            fn read(&self, csr: Csr) -> u32 {
                let value: usize;
                // SAFETY: reading a CSR has no side effects on this core.
                unsafe {
                    match csr {
                        $(Csr::$ro => core::arch::asm!(
                            concat!("csrr {0}, ", stringify!($ro_addr)),
                            out(reg) value
                        ),)*
                        $(Csr::$rw => core::arch::asm!(
                            concat!("csrr {0}, ", stringify!($rw_addr)),
                            out(reg) value
                        ),)*
                    }
                }
                value as u32
            }

            #[inline]
            fn write(&mut self, csr: Csr, value: u32) -> Result<(), BspError> {
                let value = value as usize;
                // SAFETY: machine mode owns every read-write CSR listed here.
                unsafe {
                    match csr {
                        $(Csr::$rw => core::arch::asm!(
                            concat!("csrw ", stringify!($rw_addr), ", {0}"),
                            in(reg) value
                        ),)*
                        _ => return Err(read_only_write(csr)),
                    }
                }
                Ok(())
            }

            #[inline]
            fn set_bits(&mut self, csr: Csr, mask: u32) -> Result<(), BspError> {
                let mask = mask as usize;
                // SAFETY: see `write`.
                unsafe {
                    match csr {
                        $(Csr::$rw => core::arch::asm!(
                            concat!("csrs ", stringify!($rw_addr), ", {0}"),
                            in(reg) mask
                        ),)*
                        _ => return Err(read_only_write(csr)),
                    }
                }
                Ok(())
            }

            #[inline]
            fn clear_bits(&mut self, csr: Csr, mask: u32) -> Result<(), BspError> {
                let mask = mask as usize;
                // SAFETY: see `write`.
                unsafe {
                    match csr {
                        $(Csr::$rw => core::arch::asm!(
                            concat!("csrc ", stringify!($rw_addr), ", {0}"),
                            in(reg) mask
                        ),)*
                        _ => return Err(read_only_write(csr)),
                    }
                }
                Ok(())
            }
        }
    };
}

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
airisc_common::for_each_csr!(machine_csr_ops);

/// Sets the global machine interrupt enable bit.
pub fn enable_machine_interrupts<C: CsrAccess + ?Sized>(csrs: &mut C) -> Result<(), BspError> {
    csrs.set_bits(Csr::Mstatus, MSTATUS_MIE)
}

/// Clears the global machine interrupt enable bit.
///
/// # Returns
///
/// Whether interrupts were enabled before the call.
pub fn disable_machine_interrupts<C: CsrAccess + ?Sized>(csrs: &mut C) -> Result<bool, BspError> {
    let was_enabled = csrs.read(Csr::Mstatus) & MSTATUS_MIE != 0;
    csrs.clear_bits(Csr::Mstatus, MSTATUS_MIE)?;
    Ok(was_enabled)
}

pub fn enable_irq<C: CsrAccess + ?Sized>(csrs: &mut C, irq: Irq) -> Result<(), BspError> {
    csrs.set_bits(Csr::Mie, irq.mask())
}

pub fn disable_irq<C: CsrAccess + ?Sized>(csrs: &mut C, irq: Irq) -> Result<(), BspError> {
    csrs.clear_bits(Csr::Mie, irq.mask())
}

/// Masks every interrupt source and the global enable.
pub fn disable_all_interrupts<C: CsrAccess + ?Sized>(csrs: &mut C) -> Result<(), BspError> {
    csrs.write(Csr::Mie, 0)?;
    csrs.clear_bits(Csr::Mstatus, MSTATUS_MIE)
}

/// Acknowledges one pending interrupt line.
pub fn clear_pending<C: CsrAccess + ?Sized>(csrs: &mut C, irq: Irq) -> Result<(), BspError> {
    csrs.clear_bits(Csr::Mip, irq.mask())
}

pub fn clear_all_pending<C: CsrAccess + ?Sized>(csrs: &mut C) -> Result<(), BspError> {
    csrs.write(Csr::Mip, 0)
}

/// Runs `f` with machine interrupts disabled.
///
/// The previous state of `mstatus.MIE` is restored afterwards, so critical
/// sections nest and are harmless inside trap handlers.
pub fn critical_section<C, R>(csrs: &mut C, f: impl FnOnce(&mut C) -> R) -> Result<R, BspError>
where
    C: CsrAccess + ?Sized,
{
    let was_enabled = disable_machine_interrupts(csrs)?;
    let result = f(csrs);
    if was_enabled {
        enable_machine_interrupts(csrs)?;
    }
    Ok(result)
}
