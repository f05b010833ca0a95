use crate::reg::{Mmio, RegisterBus};
use airisc_common::mmio::gpio::{DATA, EN};

/// 32 general-purpose pins. A set bit in the enable word makes the pin an
/// output.
pub struct Gpio<B = Mmio> {
    bus: B,
}

impl<B: RegisterBus> Gpio<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn write(&mut self, value: u32) {
        self.bus.write(DATA, value);
    }

    pub fn read(&self) -> u32 {
        self.bus.read(DATA)
    }

    pub fn set_output_enable(&mut self, mask: u32) {
        self.bus.write(EN, mask);
    }

    pub fn output_enable(&self) -> u32 {
        self.bus.read(EN)
    }

    /// Inverts the pins in `mask`.
    ///
    /// This is a read-modify-write of `DATA`; do not race it against a trap
    /// handler driving the same block.
    pub fn toggle(&mut self, mask: u32) {
        let value = self.read() ^ mask;
        self.write(value);
    }
}
