use crate::BspError;
use crate::fifo::{CLEAR_FIFO, FifoFlags, FifoStatus, UartRxErrors, WATERMARK_LEVEL};
use crate::reg::{Field, Mmio, RegisterBus, update_field};
use airisc_common::mmio::fifo::{
    CTRL, CTRL_CLR, CTRL_SET, DATA, RX_STAT, RX_STAT_CLR, RX_STAT_SET, TX_STAT, TX_STAT_CLR,
    TX_STAT_SET,
};
use core::fmt;

const DATA_BITS: Field = Field::new(29, 3);
const PARITY: Field = Field::new(27, 2);
const STOP_BITS: Field = Field::new(25, 2);
const FLOW_CONTROL: Field = Field::bit(24);
const CYCLES_PER_BIT: Field = Field::new(0, 24);

/// Character width on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five = 0,
    Six = 1,
    Seven = 2,
    Eight = 3,
    Nine = 4,
}

impl DataBits {
    fn from_field(value: u32) -> Result<Self, BspError> {
        Ok(match value {
            0 => DataBits::Five,
            1 => DataBits::Six,
            2 => DataBits::Seven,
            3 => DataBits::Eight,
            4 => DataBits::Nine,
            _ => return Err(BspError::InvalidField),
        })
    }

    /// Number of data bits per character, 5 through 9.
    pub const fn count(self) -> u32 {
        self as u32 + 5
    }
}

/// Parity bit appended to each character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None = 0,
    Even = 1,
    Odd = 2,
}

impl Parity {
    fn from_field(value: u32) -> Result<Self, BspError> {
        Ok(match value {
            0 => Parity::None,
            1 => Parity::Even,
            2 => Parity::Odd,
            _ => return Err(BspError::InvalidField),
        })
    }
}

/// Stop bit length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One = 0,
    OneAndHalf = 1,
    Two = 2,
}

impl StopBits {
    fn from_field(value: u32) -> Result<Self, BspError> {
        Ok(match value {
            0 => StopBits::One,
            1 => StopBits::OneAndHalf,
            2 => StopBits::Two,
            _ => return Err(BspError::InvalidField),
        })
    }
}

/// Hardware handshake on the RTS/CTS lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None = 0,
    RtsCts = 1,
}

/// Complete line configuration, the decoded form of the `CTRL` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Core clock cycles per bit, the baud rate divisor. 24 bits wide.
    pub cycles_per_bit: u32,
}

impl UartConfig {
    /// 8N1 without flow control at `baud`.
    ///
    /// # Arguments
    ///
    /// * `clock_hz` - Core clock feeding the UART
    /// * `baud` - Line rate in bits per second
    ///
    /// # Panics
    ///
    /// Panics if `baud` is zero. In a `const` item this is a compile error.
    pub const fn new(clock_hz: u32, baud: u32) -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            cycles_per_bit: clock_hz / baud,
        }
    }

    pub const fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub const fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub const fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub const fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Packs the configuration into a `CTRL` word.
    ///
    /// `cycles_per_bit` is truncated to its 24-bit field.
    pub const fn encode(&self) -> u32 {
        DATA_BITS.put(self.data_bits as u32)
            | PARITY.put(self.parity as u32)
            | STOP_BITS.put(self.stop_bits as u32)
            | FLOW_CONTROL.put(self.flow_control as u32)
            | CYCLES_PER_BIT.put(self.cycles_per_bit)
    }

    /// Unpacks a `CTRL` word.
    ///
    /// # Errors
    ///
    /// [`BspError::InvalidField`] if data bits, parity or stop bits hold a
    /// reserved encoding.
    pub fn decode(word: u32) -> Result<Self, BspError> {
        Ok(Self {
            data_bits: DataBits::from_field(DATA_BITS.get(word))?,
            parity: Parity::from_field(PARITY.get(word))?,
            stop_bits: StopBits::from_field(STOP_BITS.get(word))?,
            flow_control: if FLOW_CONTROL.is_set(word) {
                FlowControl::RtsCts
            } else {
                FlowControl::None
            },
            cycles_per_bit: CYCLES_PER_BIT.get(word),
        })
    }
}

/// Polled UART driver.
///
/// Transfers block on the FIFO flags without a timeout. Configuration fields
/// are patched through the `CTRL_SET`/`CTRL_CLR` aliases, so each setter only
/// touches its own bits.
pub struct Uart<B = Mmio> {
    bus: B,
}

impl<B: RegisterBus> Uart<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Writes the whole control word at once.
    ///
    /// # Arguments
    ///
    /// * `config` - Line settings and baud divisor to apply
    pub fn init(&mut self, config: &UartConfig) {
        self.bus.write(CTRL, config.encode());
    }

    /// Reads back the active configuration from `CTRL`.
    pub fn config(&self) -> Result<UartConfig, BspError> {
        UartConfig::decode(self.bus.read(CTRL))
    }

    fn set_ctrl_field(&mut self, field: Field, value: u32) {
        update_field(&self.bus, CTRL_SET, CTRL_CLR, field, value);
    }

    fn ctrl_field(&self, field: Field) -> u32 {
        field.get(self.bus.read(CTRL))
    }

    /// Changes the character width without touching other `CTRL` fields.
    ///
    /// # Arguments
    ///
    /// * `data_bits` - New character width
    pub fn set_data_bits(&mut self, data_bits: DataBits) {
        self.set_ctrl_field(DATA_BITS, data_bits as u32);
    }

    /// Current character width.
    ///
    /// # Errors
    ///
    /// [`BspError::InvalidField`] if the field holds a reserved encoding.
    pub fn data_bits(&self) -> Result<DataBits, BspError> {
        DataBits::from_field(self.ctrl_field(DATA_BITS))
    }

    /// Changes the parity mode.
    ///
    /// # Arguments
    ///
    /// * `parity` - New parity mode
    pub fn set_parity(&mut self, parity: Parity) {
        self.set_ctrl_field(PARITY, parity as u32);
    }

    pub fn parity(&self) -> Result<Parity, BspError> {
        Parity::from_field(self.ctrl_field(PARITY))
    }

    /// Changes the stop bit length.
    ///
    /// # Arguments
    ///
    /// * `stop_bits` - New stop bit length
    pub fn set_stop_bits(&mut self, stop_bits: StopBits) {
        self.set_ctrl_field(STOP_BITS, stop_bits as u32);
    }

    pub fn stop_bits(&self) -> Result<StopBits, BspError> {
        StopBits::from_field(self.ctrl_field(STOP_BITS))
    }

    /// Enables or disables RTS/CTS handshaking.
    ///
    /// # Arguments
    ///
    /// * `flow_control` - Handshake mode
    pub fn set_flow_control(&mut self, flow_control: FlowControl) {
        self.set_ctrl_field(FLOW_CONTROL, flow_control as u32);
    }

    pub fn flow_control(&self) -> FlowControl {
        if self.ctrl_field(FLOW_CONTROL) != 0 {
            FlowControl::RtsCts
        } else {
            FlowControl::None
        }
    }

    /// Sets the baud divisor directly.
    ///
    /// # Arguments
    ///
    /// * `cycles` - Core clock cycles per bit; only the low 24 bits are kept
    pub fn set_cycles_per_bit(&mut self, cycles: u32) {
        self.set_ctrl_field(CYCLES_PER_BIT, cycles);
    }

    pub fn cycles_per_bit(&self) -> u32 {
        self.ctrl_field(CYCLES_PER_BIT)
    }

    /// Sets the baud divisor from a line rate.
    ///
    /// # Arguments
    ///
    /// * `clock_hz` - Core clock feeding the UART
    /// * `baud` - Line rate in bits per second
    ///
    /// # Panics
    ///
    /// Panics if `baud` is zero.
    pub fn set_baud(&mut self, clock_hz: u32, baud: u32) {
        self.set_cycles_per_bit(clock_hz / baud);
    }

    /// Snapshot of the `TX_STAT` word.
    pub fn tx_status(&self) -> FifoStatus {
        FifoStatus::from_raw(self.bus.read(TX_STAT))
    }

    /// Snapshot of the `RX_STAT` word.
    pub fn rx_status(&self) -> FifoStatus {
        FifoStatus::from_raw(self.bus.read(RX_STAT))
    }

    /// Receive error flags currently latched in `RX_STAT`.
    pub fn rx_errors(&self) -> UartRxErrors {
        UartRxErrors::from_bits_truncate(self.bus.read(RX_STAT))
    }

    pub fn tx_full(&self) -> bool {
        self.tx_status().is_full()
    }

    pub fn tx_empty(&self) -> bool {
        self.tx_status().is_empty()
    }

    pub fn tx_overflow(&self) -> bool {
        self.tx_status().overflow()
    }

    pub fn tx_watermark_reached(&self) -> bool {
        self.tx_status().watermark_reached()
    }

    /// Bytes waiting in the TX FIFO.
    pub fn tx_fill_level(&self) -> u8 {
        self.tx_status().fill_level()
    }

    pub fn tx_watermark(&self) -> u8 {
        self.tx_status().watermark()
    }

    pub fn rx_full(&self) -> bool {
        self.rx_status().is_full()
    }

    pub fn rx_empty(&self) -> bool {
        self.rx_status().is_empty()
    }

    pub fn rx_overflow(&self) -> bool {
        self.rx_status().overflow()
    }

    pub fn rx_watermark_reached(&self) -> bool {
        self.rx_status().watermark_reached()
    }

    /// Bytes waiting in the RX FIFO.
    pub fn rx_fill_level(&self) -> u8 {
        self.rx_status().fill_level()
    }

    pub fn rx_watermark(&self) -> u8 {
        self.rx_status().watermark()
    }

    /// Set when `DATA` was read while the RX FIFO was empty.
    pub fn rx_underflow(&self) -> bool {
        self.rx_errors().contains(UartRxErrors::UNDERFLOW)
    }

    pub fn rx_noise_error(&self) -> bool {
        self.rx_errors().contains(UartRxErrors::NOISE)
    }

    pub fn rx_parity_error(&self) -> bool {
        self.rx_errors().contains(UartRxErrors::PARITY)
    }

    pub fn rx_frame_error(&self) -> bool {
        self.rx_errors().contains(UartRxErrors::FRAME)
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

    /// Discards everything queued for transmission.
    pub fn clear_tx_fifo(&mut self) {
        self.bus.write(TX_STAT_SET, CLEAR_FIFO);
    }

    /// Discards everything received but not yet read.
    pub fn clear_rx_fifo(&mut self) {
        self.bus.write(RX_STAT_SET, CLEAR_FIFO);
    }

    /// Acknowledges a TX overflow.
    pub fn clear_tx_overflow(&mut self) {
        self.bus.write(TX_STAT_CLR, FifoFlags::OVERFLOW.bits());
    }

    pub fn clear_rx_overflow(&mut self) {
        self.bus.write(RX_STAT_CLR, FifoFlags::OVERFLOW.bits());
    }

    /// Acknowledges the given receive error flags.
    pub fn clear_rx_errors(&mut self, errors: UartRxErrors) {
        self.bus.write(RX_STAT_CLR, errors.bits());
    }

    pub fn clear_rx_underflow(&mut self) {
        self.clear_rx_errors(UartRxErrors::UNDERFLOW);
    }

    pub fn clear_rx_noise_error(&mut self) {
        self.clear_rx_errors(UartRxErrors::NOISE);
    }

    pub fn clear_rx_parity_error(&mut self) {
        self.clear_rx_errors(UartRxErrors::PARITY);
    }

    pub fn clear_rx_frame_error(&mut self) {
        self.clear_rx_errors(UartRxErrors::FRAME);
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
        loop {
            if let Some(byte) = self.try_read_byte() {
                return byte;
            }
            core::hint::spin_loop();
        }
    }

    /// Takes one byte if the RX FIFO holds any.
    pub fn try_read_byte(&mut self) -> Option<u8> {
        if self.rx_empty() {
            None
        } else {
            Some(self.bus.read(DATA) as u8)
        }
    }

    /// Like [`read_byte`](Self::read_byte) but gives up after `max_polls`
    /// empty status reads.
    ///
    /// # Errors
    ///
    /// [`BspError::Timeout`] if no byte arrived in time.
    pub fn read_byte_within(&mut self, max_polls: u32) -> Result<u8, BspError> {
        for _ in 0..max_polls {
            if let Some(byte) = self.try_read_byte() {
                return Ok(byte);
            }
        }
        Err(BspError::Timeout)
    }

    /// Sends every byte of `bytes`, blocking on a full FIFO.
    pub fn write_block(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }

    /// Fills `buf` completely, blocking until each byte arrives.
    pub fn read_block(&mut self, buf: &mut [u8]) {
        for slot in buf.iter_mut() {
            *slot = self.read_byte();
        }
    }

    /// Sends `s` followed by a NUL terminator.
    pub fn write_string(&mut self, s: &str) {
        self.write_block(s.as_bytes());
        self.write_byte(0);
    }

    /// Reads until a carriage return or until `buf` is full.
    ///
    /// The carriage return is stored as NUL.
    ///
    /// # Returns
    ///
    /// Bytes consumed including the terminator, or `buf.len()` if no
    /// carriage return arrived.
    pub fn read_line(&mut self, buf: &mut [u8]) -> usize {
        for (i, slot) in buf.iter_mut().enumerate() {
            let byte = self.read_byte();
            if byte == b'\r' {
                *slot = 0;
                return i + 1;
            }
            *slot = byte;
        }
        buf.len()
    }
}

impl<B: RegisterBus> fmt::Write for Uart<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_block(s.as_bytes());
        Ok(())
    }
}
