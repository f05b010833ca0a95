use crate::reg::{Mmio, RegisterBus};
use airisc_common::mmio::timer::{TIMECMPH, TIMECMPL, TIMEH, TIMEL};

/// The SoC system timer.
///
/// `TIME` counts core clock cycles and raises the machine timer interrupt
/// while `TIME >= TIMECMP`. Both are 64 bits wide but exposed as pairs of
/// 32-bit registers, so every access needs an ordering protocol.
pub struct Timer<B = Mmio> {
    bus: B,
}

impl<B: RegisterBus> Timer<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Loads the counter.
    ///
    /// The low half is zeroed first so no carry can ripple into the high half
    /// between the two real writes.
    pub fn set_time(&mut self, value: u64) {
        self.bus.write(TIMEL, 0);
        self.bus.write(TIMEH, (value >> 32) as u32);
        self.bus.write(TIMEL, value as u32);
    }

    /// Reads the counter without tearing.
    ///
    /// The high half is read on both sides of the low half; if they differ
    /// the low half wrapped in between and the read is repeated.
    pub fn time(&self) -> u64 {
        loop {
            let high = self.bus.read(TIMEH);
            let low = self.bus.read(TIMEL);
            if self.bus.read(TIMEH) == high {
                return (high as u64) << 32 | low as u64;
            }
        }
    }

    /// Programs the compare register.
    ///
    /// The low half is parked at all-ones while the high half changes, so the
    /// comparator never sees a target earlier than both the old and the new
    /// one and no spurious interrupt fires.
    pub fn set_compare(&mut self, value: u64) {
        self.bus.write(TIMECMPL, u32::MAX);
        self.bus.write(TIMECMPH, (value >> 32) as u32);
        self.bus.write(TIMECMPL, value as u32);
    }

    /// Reads back the compare register.
    ///
    /// Only software writes `TIMECMP`, so the halves cannot change between
    /// the two reads.
    pub fn compare(&self) -> u64 {
        let high = self.bus.read(TIMECMPH);
        let low = self.bus.read(TIMECMPL);
        (high as u64) << 32 | low as u64
    }

    /// Arms the compare register `delta` cycles from now.
    ///
    /// # Returns
    ///
    /// The new compare value.
    pub fn schedule_in(&mut self, delta: u64) -> u64 {
        let target = self.time().wrapping_add(delta);
        self.set_compare(target);
        target
    }

    /// Milliseconds since the counter was last zeroed.
    ///
    /// # Panics
    ///
    /// Panics if `clock_hz` is zero.
    pub fn uptime_ms(&self, clock_hz: u32) -> u64 {
        (self.time() as u128 * 1000 / clock_hz as u128) as u64
    }
}
