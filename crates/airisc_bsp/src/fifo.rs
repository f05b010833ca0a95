use crate::reg::Field;
use bitflags::bitflags;

/// Number of bytes currently held in the FIFO.
pub const FILL_LEVEL: Field = Field::new(0, 8);

/// Fill level at which the watermark flag is raised.
pub const WATERMARK_LEVEL: Field = Field::new(8, 8);

/// Write-only FIFO clear command, issued through the status `SET` alias.
pub const CLEAR_FIFO: u32 = 1 << 31;

bitflags! {
    /// Flags common to every UART and SPI FIFO status word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoFlags: u32 {
        const FULL = 1 << 16;
        const EMPTY = 1 << 17;
        const WATERMARK_REACHED = 1 << 18;
        const OVERFLOW = 1 << 19;
    }
}

bitflags! {
    /// Receive error flags of the UART `RX_STAT` word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartRxErrors: u32 {
        const UNDERFLOW = 1 << 20;
        const NOISE = 1 << 21;
        const PARITY = 1 << 22;
        const FRAME = 1 << 23;
    }
}

/// Snapshot of one FIFO status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoStatus(u32);

impl FifoStatus {
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    pub fn flags(self) -> FifoFlags {
        FifoFlags::from_bits_truncate(self.0)
    }

    pub const fn fill_level(self) -> u8 {
        FILL_LEVEL.get(self.0) as u8
    }

    pub const fn watermark(self) -> u8 {
        WATERMARK_LEVEL.get(self.0) as u8
    }

    pub fn is_full(self) -> bool {
        self.flags().contains(FifoFlags::FULL)
    }

    pub fn is_empty(self) -> bool {
        self.flags().contains(FifoFlags::EMPTY)
    }

    pub fn watermark_reached(self) -> bool {
        self.flags().contains(FifoFlags::WATERMARK_REACHED)
    }

    pub fn overflow(self) -> bool {
        self.flags().contains(FifoFlags::OVERFLOW)
    }

    /// Tests a block-specific bit above the common flags.
    pub const fn bit(self, bit: u32) -> bool {
        self.0 & (1 << bit) != 0
    }
}
