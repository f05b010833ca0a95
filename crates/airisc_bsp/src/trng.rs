use crate::delay::Delay;
use crate::reg::{Field, Mmio, RegisterBus};
use airisc_common::mmio::trng::CTRL;

const VALID: Field = Field::bit(31);
const ENABLE: Field = Field::bit(30);
const SIMULATED: Field = Field::bit(29);
const DATA: Field = Field::new(0, 8);

/// Core clock cycles the entropy source needs after each enable transition.
pub const SETTLE_CYCLES: u32 = 128;

/// True random number generator.
///
/// Each read of the control word that reports valid data consumes that byte.
/// [`get_byte`](Trng::get_byte) waits without a timeout; it never returns if
/// the generator is disabled.
pub struct Trng<B = Mmio> {
    bus: B,
}

impl<B: RegisterBus> Trng<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Power-cycles the entropy source: off, cool down, on, warm up.
    pub fn enable(&mut self, delay: &mut impl Delay) {
        self.bus.write(CTRL, 0);
        delay.delay_cycles(SETTLE_CYCLES);
        self.bus.write(CTRL, ENABLE.mask());
        delay.delay_cycles(SETTLE_CYCLES);
    }

    pub fn disable(&mut self) {
        self.bus.write(CTRL, 0);
    }

    pub fn is_enabled(&self) -> bool {
        ENABLE.is_set(self.bus.read(CTRL))
    }

    /// Whether the generator is a deterministic simulation model.
    pub fn is_simulated(&self) -> bool {
        SIMULATED.is_set(self.bus.read(CTRL))
    }

    pub fn get_byte(&mut self) -> u8 {
        loop {
            let word = self.bus.read(CTRL);
            if VALID.is_set(word) {
                return DATA.get(word) as u8;
            }
            core::hint::spin_loop();
        }
    }

    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        for byte in dest.iter_mut() {
            *byte = self.get_byte();
        }
    }
}
