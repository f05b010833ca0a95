/// Source of busy-wait delays.
///
/// Drivers that need settle times take a `Delay` instead of spinning on their
/// own so tests can observe the requested durations.
pub trait Delay {
    fn delay_cycles(&mut self, cycles: u32);
}

/// Busy-waits on the executing core.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleDelay;

impl Delay for CycleDelay {
    #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
    #[inline]
    #[allow(unused_unsafe)]
    fn delay_cycles(&mut self, cycles: u32) {
        // SAFETY: a counted loop of plain instructions with no side effects.
        unsafe { riscv::asm::delay(cycles) };
    }

    #[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
    #[inline]
    fn delay_cycles(&mut self, cycles: u32) {
        for _ in 0..cycles {
            core::hint::spin_loop();
        }
    }
}
