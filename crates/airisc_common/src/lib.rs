//! Common definitions shared by the AIRISC board-support crates.
//!
//! This crate provides the physical address map of the SoC peripherals, the
//! register offsets inside each peripheral block, and the numeric identifiers
//! of the core's control and status registers, trap causes and interrupt
//! lines. Nothing in here touches hardware; it is pure configuration consumed
//! by the driver crate and the firmware image.

#![cfg_attr(not(test), no_std)]

// Memory-mapped I/O address space definitions for the system-on-chip.
//
// Addresses are fixed by SoC integration and differ slightly between BSP
// variants, so the map is a value rather than a set of loose constants. The
// `minimal-map` feature selects the layout of the reduced SoC configuration.
pub mod mmio {
    /// Physical base addresses of every peripheral block.
    ///
    /// Blocks absent in a given SoC configuration are `None`. Drivers are
    /// constructed from these addresses by the firmware image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PeripheralMap {
        /// System timer (`TIME`/`TIMECMP` split registers).
        pub timer: usize,

        /// First UART, mapped onto stdin/stdout/stderr by the firmware.
        pub uart0: usize,

        /// First SPI controller.
        pub spi0: usize,

        /// Second SPI controller, only present in the default map.
        pub spi1: Option<usize>,

        /// General-purpose I/O block.
        pub gpio: usize,

        /// True random number generator, only present in the default map.
        pub trng: Option<usize>,
    }

    impl PeripheralMap {
        /// Default peripheral layout of the AIRISC SoC.
        pub const DEFAULT: Self = Self {
            timer: 0xC000_0100,
            uart0: 0xC000_0200,
            spi0: 0xC000_0400,
            spi1: Some(0xC000_0500),
            gpio: 0xC000_0600,
            trng: Some(0xC000_0800),
        };

        /// Layout of the reduced SoC used by the minimal firmware variant.
        ///
        /// Peripherals are packed at 0x100 strides and there is neither a
        /// second SPI controller nor a TRNG.
        pub const MINIMAL: Self = Self {
            timer: 0xC000_0100,
            uart0: 0xC000_0200,
            spi0: 0xC000_0300,
            spi1: None,
            gpio: 0xC000_0400,
            trng: None,
        };
    }

    /// Peripheral map selected at build time.
    #[cfg(not(feature = "minimal-map"))]
    pub const PERIPHERALS: PeripheralMap = PeripheralMap::DEFAULT;

    /// Peripheral map selected at build time.
    #[cfg(feature = "minimal-map")]
    pub const PERIPHERALS: PeripheralMap = PeripheralMap::MINIMAL;

    /// Register offsets inside a timer block.
    pub mod timer {
        pub const TIMEL: usize = 0x00;
        pub const TIMEH: usize = 0x04;
        pub const TIMECMPL: usize = 0x08;
        pub const TIMECMPH: usize = 0x0C;
    }

    /// Register offsets shared by the UART and SPI blocks.
    ///
    /// Each control or status word has two aliases: writing a mask to the
    /// `_SET` alias sets exactly those bits, writing a mask to the `_CLR`
    /// alias clears exactly those bits. Hardware applies the update
    /// atomically, so code never needs a read-modify-write of the main word.
    pub mod fifo {
        pub const DATA: usize = 0x00;
        pub const CTRL: usize = 0x04;
        pub const CTRL_SET: usize = 0x08;
        pub const CTRL_CLR: usize = 0x0C;
        pub const TX_STAT: usize = 0x10;
        pub const TX_STAT_SET: usize = 0x14;
        pub const TX_STAT_CLR: usize = 0x18;
        pub const RX_STAT: usize = 0x1C;
        pub const RX_STAT_SET: usize = 0x20;
        pub const RX_STAT_CLR: usize = 0x24;
    }

    /// Register offsets inside a GPIO block.
    pub mod gpio {
        pub const DATA: usize = 0x00;
        pub const EN: usize = 0x04;
    }

    /// Register offsets inside a TRNG block.
    pub mod trng {
        pub const CTRL: usize = 0x00;
    }
}

/// Control and status register identifiers and trap cause encodings.
///
/// The CSR list is provided as a table macro so that both the `Csr`
/// enumeration here and the instruction-level accessors in the driver crate
/// are generated from a single source. Each CSR number must end up as an
/// immediate in the `csrr`/`csrw` encoding, which is why the accessors
/// cannot simply take the number as a runtime value.
pub mod csr {
    /// Invokes `$callback!` with the full CSR table.
    ///
    /// The table is split into read-only and read-write groups, each entry
    /// being `Name = number`.
    #[macro_export]
    macro_rules! for_each_csr {
        ($callback:ident) => {
            $callback! {
                read_only {
                    Misa = 0x301,
                    Mtval = 0x343,
                    Cycle = 0xC00,
                    Time = 0xC01,
                    Instret = 0xC02,
                    Cycleh = 0xC80,
                    Timeh = 0xC81,
                    Instreth = 0xC82,
                    Mvendorid = 0xF11,
                    Marchid = 0xF12,
                    Mimpid = 0xF13,
                    Mhartid = 0xF14,
                }
                read_write {
                    Mstatus = 0x300,
                    Mie = 0x304,
                    Mtvec = 0x305,
                    Mcountinhibit = 0x320,
                    Mscratch = 0x340,
                    Mepc = 0x341,
                    Mcause = 0x342,
                    Mip = 0x344,
                    Mcycle = 0xB00,
                    Minstret = 0xB02,
                    Mcycleh = 0xB80,
                    Minstreth = 0xB82,
                }
            }
        };
    }

    macro_rules! define_csr_enum {
        (
            read_only { $($ro:ident = $ro_addr:literal,)* }
            read_write { $($rw:ident = $rw_addr:literal,)* }
        ) => {
            /// Control and status registers reachable from machine mode.
            #[repr(u16)]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub enum Csr {
                $($ro = $ro_addr,)*
                $($rw = $rw_addr,)*
            }

            impl Csr {
                /// Every CSR known to the BSP, read-only ones first.
                pub const ALL: &'static [Csr] = &[$(Csr::$ro,)* $(Csr::$rw,)*];

                /// Numeric CSR address as encoded in the instruction.
                pub const fn number(self) -> u16 {
                    self as u16
                }

                /// Whether software writes to this register are illegal.
                pub const fn is_read_only(self) -> bool {
                    matches!(self, $(Csr::$ro)|*)
                }
            }
        };
    }

    crate::for_each_csr!(define_csr_enum);

    /// Bit positions inside `mstatus`.
    pub mod mstatus {
        /// Machine interrupt enable.
        pub const MIE: u32 = 3;
        /// Machine previous interrupt enable.
        pub const MPIE: u32 = 7;
    }

    /// High bit of `mcause`: set for interrupts, clear for exceptions.
    pub const MCAUSE_INTERRUPT: u32 = 0x8000_0000;

    /// Number of AIRISC-specific external interrupt channels.
    pub const XIRQ_CHANNELS: u8 = 16;

    /// Interrupt line, identified by its `mie`/`mip` bit position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Irq {
        /// Machine software interrupt.
        MachineSoftware,
        /// Machine timer interrupt.
        MachineTimer,
        /// Machine external interrupt.
        MachineExternal,
        /// AIRISC external interrupt channel 0..=15.
        Xirq(u8),
    }

    impl Irq {
        /// Bit position in `mie` and `mip`.
        pub const fn bit(self) -> u32 {
            match self {
                Irq::MachineSoftware => 3,
                Irq::MachineTimer => 7,
                Irq::MachineExternal => 11,
                Irq::Xirq(channel) => 16 + (channel & 0xF) as u32,
            }
        }

        /// Single-bit mask for `mie` and `mip`.
        pub const fn mask(self) -> u32 {
            1 << self.bit()
        }
    }

    /// Asynchronous trap causes, `mcause` with the interrupt bit stripped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Interrupt {
        MachineSoftware,
        MachineTimer,
        MachineExternal,
        /// AIRISC external interrupt channel, codes 0x10..=0x1F.
        Xirq(u8),
        Unknown(u32),
    }

    impl Interrupt {
        pub const fn from_code(code: u32) -> Self {
            match code {
                3 => Interrupt::MachineSoftware,
                7 => Interrupt::MachineTimer,
                11 => Interrupt::MachineExternal,
                0x10..=0x1F => Interrupt::Xirq((code & 0xF) as u8),
                other => Interrupt::Unknown(other),
            }
        }

        /// Full `mcause` value for this interrupt.
        pub const fn cause(self) -> u32 {
            let code = match self {
                Interrupt::MachineSoftware => 3,
                Interrupt::MachineTimer => 7,
                Interrupt::MachineExternal => 11,
                Interrupt::Xirq(channel) => 0x10 | (channel & 0xF) as u32,
                Interrupt::Unknown(code) => code,
            };
            MCAUSE_INTERRUPT | code
        }
    }

    /// Synchronous trap causes.
    #[repr(u32)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Exception {
        InstructionMisaligned = 0x0,
        InstructionFault = 0x1,
        IllegalInstruction = 0x2,
        Breakpoint = 0x3,
        LoadMisaligned = 0x4,
        LoadFault = 0x5,
        StoreMisaligned = 0x6,
        StoreFault = 0x7,
        UserEnvCall = 0x8,
        SupervisorEnvCall = 0x9,
        MachineEnvCall = 0xB,
        InstructionPageFault = 0xC,
        LoadPageFault = 0xD,
        Reserved14 = 0xE,
        StorePageFault = 0xF,
    }

    impl Exception {
        pub const fn from_code(code: u32) -> Option<Self> {
            Some(match code {
                0x0 => Exception::InstructionMisaligned,
                0x1 => Exception::InstructionFault,
                0x2 => Exception::IllegalInstruction,
                0x3 => Exception::Breakpoint,
                0x4 => Exception::LoadMisaligned,
                0x5 => Exception::LoadFault,
                0x6 => Exception::StoreMisaligned,
                0x7 => Exception::StoreFault,
                0x8 => Exception::UserEnvCall,
                0x9 => Exception::SupervisorEnvCall,
                0xB => Exception::MachineEnvCall,
                0xC => Exception::InstructionPageFault,
                0xD => Exception::LoadPageFault,
                0xE => Exception::Reserved14,
                0xF => Exception::StorePageFault,
                _ => return None,
            })
        }

        /// Short human-readable description.
        pub const fn describe(self) -> &'static str {
            match self {
                Exception::InstructionMisaligned => "misaligned access",
                Exception::InstructionFault => "inst access fault",
                Exception::IllegalInstruction => "illegal inst",
                Exception::Breakpoint => "breakpoint",
                Exception::LoadMisaligned => "load misaligned",
                Exception::LoadFault => "load access fault",
                Exception::StoreMisaligned => "store misaligned",
                Exception::StoreFault => "store access fault",
                Exception::UserEnvCall => "call from u-mode",
                Exception::SupervisorEnvCall => "call from s-mode",
                Exception::MachineEnvCall => "call from m-mode",
                Exception::InstructionPageFault => "inst page fault",
                Exception::LoadPageFault => "load page fault",
                Exception::Reserved14 => "reserved",
                Exception::StorePageFault => "store page fault",
            }
        }
    }

    /// Decoded `mcause` value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Trap {
        Interrupt(Interrupt),
        /// `None` for exception codes outside the table.
        Exception(Option<Exception>),
    }

    impl Trap {
        pub const fn decode(cause: u32) -> Self {
            let code = cause & !MCAUSE_INTERRUPT;
            if cause & MCAUSE_INTERRUPT != 0 {
                Trap::Interrupt(Interrupt::from_code(code))
            } else {
                Trap::Exception(Exception::from_code(code))
            }
        }
    }
}
