use crate::BspError;
use crate::fifo::{FifoFlags, FifoStatus, WATERMARK_LEVEL};
use crate::reg::{Field, Mmio, RegisterBus, update_field};
use airisc_common::mmio::fifo::{
    CTRL, CTRL_CLR, CTRL_SET, DATA, RX_STAT, RX_STAT_CLR, RX_STAT_SET, TX_STAT, TX_STAT_CLR,
    TX_STAT_SET,
};

const OUTPUT_ENABLE: Field = Field::bit(24);
const CONFIG_FIXED: Field = Field::bit(21);
const RESET_ROLE: Field = Field::bit(20);
const MASTER: Field = Field::bit(16);
const PULSE_MODE: Field = Field::bit(14);
const SOFTWARE_SELECT: Field = Field::bit(13);
const SELECT_LEVEL: Field = Field::bit(12);
const ACTIVE_SLAVE: Field = Field::new(8, 2);
const MODE: Field = Field::new(4, 2);
const CLOCK_DIV: Field = Field::new(0, 4);

/// Automatic transmit/receive enable in the status words.
const ENABLE: u32 = 1 << 31;
const TX_READY: u32 = 1 << 20;
const RX_UNDERFLOW: u32 = 1 << 20;

/// Which side drives SCK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

/// Clock polarity and phase, numbered the usual way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiMode {
    Mode0 = 0,
    Mode1 = 1,
    Mode2 = 2,
    Mode3 = 3,
}

impl SpiMode {
    const fn from_field(value: u32) -> Self {
        match value & 0x3 {
            0 => SpiMode::Mode0,
            1 => SpiMode::Mode1,
            2 => SpiMode::Mode2,
            _ => SpiMode::Mode3,
        }
    }
}

/// Initial controller setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    pub role: Role,
    pub mode: SpiMode,
    /// SCK is the core clock divided by `2^(clock_div + 1)`; 4 bits.
    pub clock_div: u8,
    /// Slave-select line driven by transactions; 2 bits.
    pub slave: u8,
    pub outputs_enabled: bool,
}

impl SpiConfig {
    /// Master configuration with outputs enabled.
    ///
    /// # Arguments
    ///
    /// * `mode` - Clock polarity and phase
    /// * `clock_div` - SCK divider exponent, see [`SpiConfig::clock_div`]
    /// * `slave` - Slave-select line to drive
    pub const fn master(mode: SpiMode, clock_div: u8, slave: u8) -> Self {
        Self {
            role: Role::Master,
            mode,
            clock_div,
            slave,
            outputs_enabled: true,
        }
    }

    /// Control word with hardware slave-select, deasserted.
    pub const fn encode(&self) -> u32 {
        OUTPUT_ENABLE.put(self.outputs_enabled as u32)
            | MASTER.put(matches!(self.role, Role::Master) as u32)
            | SELECT_LEVEL.mask()
            | ACTIVE_SLAVE.put(self.slave as u32)
            | MODE.put(self.mode as u32)
            | CLOCK_DIV.put(self.clock_div as u32)
    }
}

/// SPI controller driver.
///
/// Bulk transfers are framed by [`begin_transaction`](Self::begin_transaction)
/// and [`end_transaction`](Self::end_transaction), which hand slave-select to
/// software for the duration and give it back to the hardware afterwards.
pub struct Spi<B = Mmio> {
    bus: B,
}

impl<B: RegisterBus> Spi<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Writes the whole control word, leaving slave-select deasserted under
    /// hardware control.
    ///
    /// # Arguments
    ///
    /// * `config` - Role, mode, divider and slave line to apply
    pub fn init(&mut self, config: &SpiConfig) {
        self.bus.write(CTRL, config.encode());
    }

    fn ctrl(&self) -> u32 {
        self.bus.read(CTRL)
    }

    fn set_ctrl_bits(&mut self, field: Field) {
        self.bus.write(CTRL_SET, field.mask());
    }

    fn clear_ctrl_bits(&mut self, field: Field) {
        self.bus.write(CTRL_CLR, field.mask());
    }

    /// Lets the controller drive SCK, MOSI and the select lines.
    pub fn enable_outputs(&mut self) {
        self.set_ctrl_bits(OUTPUT_ENABLE);
    }

    pub fn disable_outputs(&mut self) {
        self.clear_ctrl_bits(OUTPUT_ENABLE);
    }

    pub fn outputs_enabled(&self) -> bool {
        OUTPUT_ENABLE.is_set(self.ctrl())
    }

    /// Requests master or slave operation.
    ///
    /// Ignored by the hardware while [`is_config_fixed`](Self::is_config_fixed)
    /// reports true.
    ///
    /// # Arguments
    ///
    /// * `role` - Requested role
    pub fn set_role(&mut self, role: Role) {
        match role {
            Role::Master => self.set_ctrl_bits(MASTER),
            Role::Slave => self.clear_ctrl_bits(MASTER),
        }
    }

    /// Whether the role is locked to the reset default by SoC integration.
    pub fn is_config_fixed(&self) -> bool {
        CONFIG_FIXED.is_set(self.ctrl())
    }

    /// Role the controller comes out of reset in.
    pub fn reset_role(&self) -> Role {
        if RESET_ROLE.is_set(self.ctrl()) {
            Role::Master
        } else {
            Role::Slave
        }
    }

    /// Effective role: the reset default when the configuration is fixed,
    /// the software-selected one otherwise.
    pub fn role(&self) -> Role {
        let ctrl = self.ctrl();
        let master = if CONFIG_FIXED.is_set(ctrl) {
            RESET_ROLE.is_set(ctrl)
        } else {
            MASTER.is_set(ctrl)
        };
        if master { Role::Master } else { Role::Slave }
    }

    pub fn is_master(&self) -> bool {
        self.role() == Role::Master
    }

    /// Changes clock polarity and phase.
    ///
    /// # Arguments
    ///
    /// * `mode` - New SPI mode
    pub fn set_mode(&mut self, mode: SpiMode) {
        update_field(&self.bus, CTRL_SET, CTRL_CLR, MODE, mode as u32);
    }

    pub fn mode(&self) -> SpiMode {
        SpiMode::from_field(MODE.get(self.ctrl()))
    }

    /// Changes the SCK divider.
    ///
    /// # Arguments
    ///
    /// * `clock_div` - Divider exponent; SCK is the core clock divided by
    ///   `2^(clock_div + 1)`. Only the low 4 bits are kept.
    pub fn set_clock_divider(&mut self, clock_div: u8) {
        update_field(&self.bus, CTRL_SET, CTRL_CLR, CLOCK_DIV, clock_div as u32);
    }

    pub fn clock_divider(&self) -> u8 {
        CLOCK_DIV.get(self.ctrl()) as u8
    }

    /// SCK frequency for a given core clock.
    pub fn sck_hz(&self, clock_hz: u32) -> u32 {
        clock_hz >> (self.clock_divider() + 1)
    }

    /// Selects which slave-select line transactions drive.
    ///
    /// # Arguments
    ///
    /// * `slave` - Line index, 0 through 3
    pub fn set_active_slave(&mut self, slave: u8) {
        update_field(&self.bus, CTRL_SET, CTRL_CLR, ACTIVE_SLAVE, slave as u32);
    }

    pub fn active_slave(&self) -> u8 {
        ACTIVE_SLAVE.get(self.ctrl()) as u8
    }

    /// Returns slave-select to the controller.
    pub fn use_hardware_select(&mut self) {
        self.clear_ctrl_bits(SOFTWARE_SELECT);
    }

    /// Takes slave-select under software control, see
    /// [`assert_select`](Self::assert_select).
    pub fn use_software_select(&mut self) {
        self.set_ctrl_bits(SOFTWARE_SELECT);
    }

    pub fn software_select_enabled(&self) -> bool {
        SOFTWARE_SELECT.is_set(self.ctrl())
    }

    /// Switches the controller's slave-select pulse mode.
    ///
    /// # Arguments
    ///
    /// * `enabled` - New state of the pulse mode bit
    pub fn set_pulse_mode(&mut self, enabled: bool) {
        if enabled {
            self.set_ctrl_bits(PULSE_MODE);
        } else {
            self.clear_ctrl_bits(PULSE_MODE);
        }
    }

    pub fn pulse_mode(&self) -> bool {
        PULSE_MODE.is_set(self.ctrl())
    }

    /// Drives the software slave-select line low.
    pub fn assert_select(&mut self) {
        self.clear_ctrl_bits(SELECT_LEVEL);
    }

    /// Drives the software slave-select line high.
    pub fn deassert_select(&mut self) {
        self.set_ctrl_bits(SELECT_LEVEL);
    }

    pub fn select_asserted(&self) -> bool {
        !SELECT_LEVEL.is_set(self.ctrl())
    }

    /// Snapshot of the `TX_STAT` word.
    pub fn tx_status(&self) -> FifoStatus {
        FifoStatus::from_raw(self.bus.read(TX_STAT))
    }

    /// Snapshot of the `RX_STAT` word.
    pub fn rx_status(&self) -> FifoStatus {
        FifoStatus::from_raw(self.bus.read(RX_STAT))
    }

    /// No transfer is in flight.
    pub fn tx_ready(&self) -> bool {
        self.bus.read(TX_STAT) & TX_READY != 0
    }

    pub fn tx_full(&self) -> bool {
        self.tx_status().is_full()
    }

    pub fn tx_empty(&self) -> bool {
        self.tx_status().is_empty()
    }

    pub fn rx_full(&self) -> bool {
        self.rx_status().is_full()
    }

    pub fn rx_empty(&self) -> bool {
        self.rx_status().is_empty()
    }

    pub fn tx_overflow(&self) -> bool {
        self.tx_status().overflow()
    }

    pub fn rx_overflow(&self) -> bool {
        self.rx_status().overflow()
    }

    /// Set when `DATA` was read while the RX FIFO was empty.
    pub fn rx_underflow(&self) -> bool {
        self.bus.read(RX_STAT) & RX_UNDERFLOW != 0
    }

    pub fn tx_watermark_reached(&self) -> bool {
        self.tx_status().watermark_reached()
    }

    pub fn rx_watermark_reached(&self) -> bool {
        self.rx_status().watermark_reached()
    }

    /// Starts shifting out whatever the TX FIFO holds.
    pub fn enable_tx(&mut self) {
        self.bus.write(TX_STAT_SET, ENABLE);
    }

    pub fn disable_tx(&mut self) {
        self.bus.write(TX_STAT_CLR, ENABLE);
    }

    pub fn tx_enabled(&self) -> bool {
        self.bus.read(TX_STAT) & ENABLE != 0
    }

    /// Stores received bytes in the RX FIFO.
    pub fn enable_rx(&mut self) {
        self.bus.write(RX_STAT_SET, ENABLE);
    }

    /// Stops queueing received bytes in the RX FIFO.
    pub fn disable_rx(&mut self) {
        self.bus.write(RX_STAT_CLR, ENABLE);
    }

    pub fn rx_enabled(&self) -> bool {
        self.bus.read(RX_STAT) & ENABLE != 0
    }

    pub fn clear_tx_overflow(&mut self) {
        self.bus.write(TX_STAT_CLR, FifoFlags::OVERFLOW.bits());
    }

    pub fn clear_rx_overflow(&mut self) {
        self.bus.write(RX_STAT_CLR, FifoFlags::OVERFLOW.bits());
    }

    pub fn clear_rx_underflow(&mut self) {
        self.bus.write(RX_STAT_CLR, RX_UNDERFLOW);
    }

    /// Sets the TX fill level that raises the watermark flag.
    ///
    /// # Arguments
    ///
    /// * `level` - Fill level in bytes
    pub fn set_tx_watermark(&mut self, level: u8) {
        update_field(&self.bus, TX_STAT_SET, TX_STAT_CLR, WATERMARK_LEVEL, level as u32);
    }

    /// Sets the RX fill level that raises the watermark flag.
    ///
    /// # Arguments
    ///
    /// * `level` - Fill level in bytes
    pub fn set_rx_watermark(&mut self, level: u8) {
        update_field(&self.bus, RX_STAT_SET, RX_STAT_CLR, WATERMARK_LEVEL, level as u32);
    }

    /// Drains the RX FIFO by reading it until empty.
    pub fn flush_rx(&mut self) {
        while !self.rx_empty() {
            self.bus.read(DATA);
        }
    }

    fn wait_tx_ready(&self) {
        while !self.tx_ready() {
            core::hint::spin_loop();
        }
    }

    /// Queues one byte, waiting while the TX FIFO is full.
    pub fn write_byte(&mut self, byte: u8) {
        while self.tx_full() {
            core::hint::spin_loop();
        }
        self.bus.write(DATA, byte as u32);
    }

    /// Takes one byte, waiting while the RX FIFO is empty.
    pub fn read_byte(&mut self) -> u8 {
        while self.rx_empty() {
            core::hint::spin_loop();
        }
        self.bus.read(DATA) as u8
    }

    /// Shifts one byte out and returns the byte clocked in alongside it.
    ///
    /// Must run inside a transaction; outside one nothing is transmitted and
    /// the call never returns.
    pub fn transfer_byte(&mut self, byte: u8) -> u8 {
        self.write_byte(byte);
        self.read_byte()
    }

    /// Waits for the bus to go idle, discards stale RX data, enables
    /// automatic transmission and asserts the software slave-select.
    pub fn begin_transaction(&mut self) {
        self.wait_tx_ready();
        self.flush_rx();
        self.enable_tx();
        self.use_software_select();
        self.assert_select();
    }

    /// Waits for the last byte to leave, then releases slave-select back to
    /// the hardware.
    pub fn end_transaction(&mut self) {
        self.wait_tx_ready();
        self.deassert_select();
        self.use_hardware_select();
    }

    /// Runs `f` between [`begin_transaction`](Self::begin_transaction) and
    /// [`end_transaction`](Self::end_transaction).
    pub fn with_transaction<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_transaction();
        let result = f(self);
        self.end_transaction();
        result
    }

    /// Sends `bytes` as one transaction with receive disabled.
    ///
    /// The control word is restored afterwards.
    ///
    /// # Errors
    ///
    /// [`BspError::Unsupported`] in slave mode; nothing is transmitted.
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<(), BspError> {
        let snapshot = self.ctrl();
        let result = if self.is_master() {
            self.begin_transaction();
            self.disable_rx();
            for &byte in bytes {
                self.write_byte(byte);
            }
            self.end_transaction();
            self.enable_rx();
            Ok(())
        } else {
            log::warn!("spi: block write requested in slave mode");
            Err(BspError::Unsupported)
        };
        self.bus.write(CTRL, snapshot);
        result
    }

    /// Fills `buf` in one transaction, clocking out zero bytes.
    ///
    /// The control word is restored afterwards.
    ///
    /// # Errors
    ///
    /// [`BspError::Unsupported`] in slave mode; `buf` is left untouched.
    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<(), BspError> {
        let snapshot = self.ctrl();
        let result = if self.is_master() {
            self.begin_transaction();
            self.enable_rx();
            for slot in buf.iter_mut() {
                *slot = self.transfer_byte(0x00);
            }
            self.end_transaction();
            Ok(())
        } else {
            log::warn!("spi: block read requested in slave mode");
            Err(BspError::Unsupported)
        };
        self.bus.write(CTRL, snapshot);
        result
    }
}
