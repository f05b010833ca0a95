/// Word-wide access to a peripheral register block.
///
/// Offsets are in bytes from the start of the block. Implementations must
/// perform exactly one bus access per call: reading a FIFO data port pops an
/// entry, and writing a set/clear alias has an immediate hardware effect, so
/// accesses may be neither merged, elided nor reordered.
pub trait RegisterBus {
    fn read(&self, offset: usize) -> u32;
    fn write(&self, offset: usize, value: u32);
}

impl<B: RegisterBus + ?Sized> RegisterBus for &B {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Volatile memory-mapped register block at a fixed physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    /// `base` must be the physical address of a peripheral block that is
    /// mapped for the lifetime of the program, and no other code may treat
    /// that range as ordinary memory.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterBus for Mmio {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: the constructor contract guarantees a mapped register block.
        unsafe { ((self.base + offset) as *const u32).read_volatile() }
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        // SAFETY: the constructor contract guarantees a mapped register block.
        unsafe { ((self.base + offset) as *mut u32).write_volatile(value) }
    }
}

/// Contiguous bit range inside a 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    shift: u32,
    width: u32,
}

impl Field {
    pub const fn new(shift: u32, width: u32) -> Self {
        assert!(width > 0 && shift + width <= 32);
        Self { shift, width }
    }

    pub const fn bit(shift: u32) -> Self {
        Self::new(shift, 1)
    }

    #[inline(always)]
    pub const fn mask(self) -> u32 {
        (u32::MAX >> (32 - self.width)) << self.shift
    }

    /// Extracts the field from a register word.
    #[inline(always)]
    pub const fn get(self, word: u32) -> u32 {
        (word & self.mask()) >> self.shift
    }

    /// Positions `value` in the field, discarding bits that do not fit.
    #[inline(always)]
    pub const fn put(self, value: u32) -> u32 {
        (value << self.shift) & self.mask()
    }

    #[inline(always)]
    pub const fn is_set(self, word: u32) -> bool {
        word & self.mask() != 0
    }
}

/// Rewrites one field through a pair of set/clear alias registers.
///
/// The clear alias drops the whole field first, then the set alias ORs in the
/// new value. Bits outside the field are never written, so status bits the
/// hardware updates on its own cannot be clobbered.
#[inline]
pub fn update_field<B: RegisterBus + ?Sized>(
    bus: &B,
    set_offset: usize,
    clr_offset: usize,
    field: Field,
    value: u32,
) {
    bus.write(clr_offset, field.mask());
    bus.write(set_offset, field.put(value));
}
