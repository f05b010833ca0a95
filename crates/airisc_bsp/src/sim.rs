//! Simulated register files for host-side tests.
//!
//! Each model reproduces just enough of the hardware behaviour to exercise
//! the driver protocols: set/clear alias semantics, FIFO occupancy flags,
//! loop-back wiring and timer ticks injected between bus accesses.

use crate::BspError;
use crate::csr::CsrAccess;
use crate::reg::RegisterBus;
use airisc_common::csr::{Csr, MCAUSE_INTERRUPT};
use airisc_common::mmio::{fifo, timer, trng};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

const FULL: u32 = 1 << 16;
const EMPTY: u32 = 1 << 17;
const WATERMARK: u32 = 1 << 18;
const OVERFLOW: u32 = 1 << 19;
const BIT20: u32 = 1 << 20;
const BIT31: u32 = 1 << 31;

/// Plain memory with a write log.
#[derive(Default)]
pub struct RegisterFile {
    words: RefCell<BTreeMap<usize, u32>>,
    log: RefCell<Vec<(usize, u32)>>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(self, offset: usize, value: u32) -> Self {
        self.words.borrow_mut().insert(offset, value);
        self
    }

    pub fn get(&self, offset: usize) -> u32 {
        self.words.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log.borrow().clone()
    }
}

impl RegisterBus for RegisterFile {
    fn read(&self, offset: usize) -> u32 {
        self.get(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        self.words.borrow_mut().insert(offset, value);
        self.log.borrow_mut().push((offset, value));
    }
}

/// CSR file honouring read-only registers.
#[derive(Default)]
pub struct SimCsrs {
    regs: BTreeMap<Csr, u32>,
}

impl SimCsrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// CSR state as the core leaves it on trap entry.
    pub fn trap(cause: u32, pc: u32, tval: u32) -> Self {
        Self::new()
            .with(Csr::Mcause, cause)
            .with(Csr::Mepc, pc)
            .with(Csr::Mtval, tval)
    }

    pub fn interrupt(code: u32, pc: u32) -> Self {
        Self::trap(MCAUSE_INTERRUPT | code, pc, 0)
    }

    pub fn with(mut self, csr: Csr, value: u32) -> Self {
        self.regs.insert(csr, value);
        self
    }

    pub fn get(&self, csr: Csr) -> u32 {
        self.regs.get(&csr).copied().unwrap_or(0)
    }
}

impl CsrAccess for SimCsrs {
    fn read(&self, csr: Csr) -> u32 {
        self.get(csr)
    }

    fn write(&mut self, csr: Csr, value: u32) -> Result<(), BspError> {
        if csr.is_read_only() {
            return Err(BspError::ReadOnlyCsr);
        }
        self.regs.insert(csr, value);
        Ok(())
    }

    fn set_bits(&mut self, csr: Csr, mask: u32) -> Result<(), BspError> {
        let value = self.get(csr) | mask;
        self.write(csr, value)
    }

    fn clear_bits(&mut self, csr: Csr, mask: u32) -> Result<(), BspError> {
        let value = self.get(csr) & !mask;
        self.write(csr, value)
    }
}

/// Timer block whose counter can be advanced between bus accesses.
#[derive(Default)]
pub struct SimTimer {
    time: Cell<u64>,
    compare: Cell<u64>,
    ticks_after_low_read: Cell<u64>,
    high_reads: Cell<u32>,
    compare_trace: RefCell<Vec<u64>>,
}

impl SimTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(time: u64) -> Self {
        let sim = Self::new();
        sim.time.set(time);
        sim
    }

    /// Advances the counter right after the next `TIMEL` read.
    pub fn tick_after_next_low_read(&self, ticks: u64) {
        self.ticks_after_low_read.set(ticks);
    }

    pub fn compare(&self) -> u64 {
        self.compare.get()
    }

    pub fn high_reads(&self) -> u32 {
        self.high_reads.get()
    }

    /// Compare value visible to the comparator after every write.
    pub fn compare_trace(&self) -> Vec<u64> {
        self.compare_trace.borrow().clone()
    }

    pub fn reset_compare_trace(&self) {
        self.compare_trace.borrow_mut().clear();
    }
}

fn with_low(word: u64, low: u32) -> u64 {
    (word & !0xFFFF_FFFF) | low as u64
}

fn with_high(word: u64, high: u32) -> u64 {
    (word & 0xFFFF_FFFF) | ((high as u64) << 32)
}

impl RegisterBus for SimTimer {
    fn read(&self, offset: usize) -> u32 {
        match offset {
            timer::TIMEL => {
                let low = self.time.get() as u32;
                let ticks = self.ticks_after_low_read.replace(0);
                self.time.set(self.time.get().wrapping_add(ticks));
                low
            }
            timer::TIMEH => {
                self.high_reads.set(self.high_reads.get() + 1);
                (self.time.get() >> 32) as u32
            }
            timer::TIMECMPL => self.compare.get() as u32,
            timer::TIMECMPH => (self.compare.get() >> 32) as u32,
            other => panic!("timer read at unmapped offset {other:#x}"),
        }
    }

    fn write(&self, offset: usize, value: u32) {
        match offset {
            timer::TIMEL => self.time.set(with_low(self.time.get(), value)),
            timer::TIMEH => self.time.set(with_high(self.time.get(), value)),
            timer::TIMECMPL => {
                self.compare.set(with_low(self.compare.get(), value));
                self.compare_trace.borrow_mut().push(self.compare.get());
            }
            timer::TIMECMPH => {
                self.compare.set(with_high(self.compare.get(), value));
                self.compare_trace.borrow_mut().push(self.compare.get());
            }
            other => panic!("timer write at unmapped offset {other:#x}"),
        }
    }
}

/// UART with its TX line wired straight back into its RX FIFO.
pub struct LoopbackUart {
    ctrl: Cell<u32>,
    tx_stat: Cell<u32>,
    rx_stat: Cell<u32>,
    rx: RefCell<VecDeque<u8>>,
    capacity: usize,
    loopback: Cell<bool>,
    tx_full_polls: Cell<u32>,
    sent: RefCell<Vec<u8>>,
    log: RefCell<Vec<(usize, u32)>>,
}

impl LoopbackUart {
    pub fn new() -> Self {
        Self {
            ctrl: Cell::new(0),
            tx_stat: Cell::new(0),
            rx_stat: Cell::new(0),
            rx: RefCell::new(VecDeque::new()),
            capacity: 1024,
            loopback: Cell::new(true),
            tx_full_polls: Cell::new(0),
            sent: RefCell::new(Vec::new()),
            log: RefCell::new(Vec::new()),
        }
    }

    /// TX side only: transmitted bytes are recorded but not looped back.
    pub fn tx_only() -> Self {
        let sim = Self::new();
        sim.loopback.set(false);
        sim
    }

    /// Reports the TX FIFO as full for the next `polls` status reads.
    pub fn hold_tx_full(&self, polls: u32) {
        self.tx_full_polls.set(polls);
    }

    pub fn inject_rx(&self, bytes: &[u8]) {
        self.rx.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn raise_rx_flags(&self, mask: u32) {
        self.rx_stat.set(self.rx_stat.get() | mask);
    }

    pub fn ctrl(&self) -> u32 {
        self.ctrl.get()
    }

    pub fn sent(&self) -> Vec<u8> {
        self.sent.borrow().clone()
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log.borrow().clone()
    }

    fn level_bits(&self, stored: u32, len: usize, full: bool) -> u32 {
        let watermark = (stored >> 8) & 0xFF;
        let mut word = stored | (len.min(0xFF) as u32);
        if len == 0 {
            word |= EMPTY;
        }
        if full {
            word |= FULL;
        }
        if watermark != 0 && len as u32 >= watermark {
            word |= WATERMARK;
        }
        word
    }
}

impl RegisterBus for LoopbackUart {
    fn read(&self, offset: usize) -> u32 {
        match offset {
            fifo::DATA => match self.rx.borrow_mut().pop_front() {
                Some(byte) => byte as u32,
                None => {
                    self.rx_stat.set(self.rx_stat.get() | BIT20);
                    0
                }
            },
            fifo::CTRL => self.ctrl.get(),
            fifo::TX_STAT => {
                let polls = self.tx_full_polls.get();
                if polls > 0 {
                    self.tx_full_polls.set(polls - 1);
                    self.level_bits(self.tx_stat.get(), 1, true)
                } else {
                    self.level_bits(self.tx_stat.get(), 0, false)
                }
            }
            fifo::RX_STAT => {
                let len = self.rx.borrow().len();
                self.level_bits(self.rx_stat.get(), len, len >= self.capacity)
            }
            _ => 0,
        }
    }

    fn write(&self, offset: usize, value: u32) {
        self.log.borrow_mut().push((offset, value));
        match offset {
            fifo::DATA => {
                let byte = value as u8;
                self.sent.borrow_mut().push(byte);
                if self.loopback.get() {
                    let mut rx = self.rx.borrow_mut();
                    if rx.len() >= self.capacity {
                        self.rx_stat.set(self.rx_stat.get() | OVERFLOW);
                    } else {
                        rx.push_back(byte);
                    }
                }
            }
            fifo::CTRL => self.ctrl.set(value),
            fifo::CTRL_SET => self.ctrl.set(self.ctrl.get() | value),
            fifo::CTRL_CLR => self.ctrl.set(self.ctrl.get() & !value),
            fifo::TX_STAT_SET => self.tx_stat.set(self.tx_stat.get() | (value & !BIT31)),
            fifo::TX_STAT_CLR => self.tx_stat.set(self.tx_stat.get() & !value),
            fifo::RX_STAT_SET => {
                if value & BIT31 != 0 {
                    self.rx.borrow_mut().clear();
                }
                self.rx_stat.set(self.rx_stat.get() | (value & !BIT31));
            }
            fifo::RX_STAT_CLR => self.rx_stat.set(self.rx_stat.get() & !value),
            _ => {}
        }
    }
}

/// One byte shifted out on MOSI together with the select lines at that time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiFrame {
    pub byte: u8,
    pub selected: bool,
    pub software_select: bool,
}

/// SPI controller whose MISO line replays a script, echoing MOSI otherwise.
pub struct SimSpi {
    ctrl: Cell<u32>,
    tx_enable: Cell<bool>,
    rx_enable: Cell<bool>,
    tx_stored: Cell<u32>,
    rx_stored: Cell<u32>,
    busy_polls: Cell<u32>,
    rx: RefCell<VecDeque<u8>>,
    miso: RefCell<VecDeque<u8>>,
    frames: RefCell<Vec<SpiFrame>>,
    ctrl_trace: RefCell<Vec<u32>>,
}

impl SimSpi {
    const SOFTWARE_SS_LEVEL: u32 = 1 << 12;
    const SOFTWARE_SS_ENABLE: u32 = 1 << 13;

    pub fn with_ctrl(ctrl: u32) -> Self {
        Self {
            ctrl: Cell::new(ctrl),
            tx_enable: Cell::new(false),
            rx_enable: Cell::new(true),
            tx_stored: Cell::new(0),
            rx_stored: Cell::new(0),
            busy_polls: Cell::new(0),
            rx: RefCell::new(VecDeque::new()),
            miso: RefCell::new(VecDeque::new()),
            frames: RefCell::new(Vec::new()),
            ctrl_trace: RefCell::new(Vec::new()),
        }
    }

    /// Master controller straight out of reset: hardware select, deasserted.
    pub fn master() -> Self {
        Self::with_ctrl(1 << 24 | 1 << 16 | Self::SOFTWARE_SS_LEVEL)
    }

    pub fn slave() -> Self {
        Self::with_ctrl(1 << 24 | Self::SOFTWARE_SS_LEVEL)
    }

    /// Keeps the previous transfer in flight for the next `polls` status reads.
    pub fn stay_busy(&self, polls: u32) {
        self.busy_polls.set(polls);
    }

    pub fn script_miso(&self, bytes: &[u8]) {
        self.miso.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn inject_stale_rx(&self, bytes: &[u8]) {
        self.rx.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn ctrl(&self) -> u32 {
        self.ctrl.get()
    }

    pub fn selected(&self) -> bool {
        self.ctrl.get() & Self::SOFTWARE_SS_LEVEL == 0
    }

    pub fn software_select(&self) -> bool {
        self.ctrl.get() & Self::SOFTWARE_SS_ENABLE != 0
    }

    pub fn tx_enabled(&self) -> bool {
        self.tx_enable.get()
    }

    pub fn rx_enabled(&self) -> bool {
        self.rx_enable.get()
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.borrow().len()
    }

    pub fn busy_polls(&self) -> u32 {
        self.busy_polls.get()
    }

    pub fn frames(&self) -> Vec<SpiFrame> {
        self.frames.borrow().clone()
    }

    pub fn ctrl_trace(&self) -> Vec<u32> {
        self.ctrl_trace.borrow().clone()
    }

    fn set_ctrl(&self, value: u32) {
        self.ctrl.set(value);
        self.ctrl_trace.borrow_mut().push(value);
    }
}

impl RegisterBus for SimSpi {
    fn read(&self, offset: usize) -> u32 {
        match offset {
            fifo::DATA => self.rx.borrow_mut().pop_front().map_or(0, u32::from),
            fifo::CTRL => self.ctrl.get(),
            fifo::TX_STAT => {
                let mut word = self.tx_stored.get() | EMPTY;
                if self.tx_enable.get() {
                    word |= BIT31;
                }
                let polls = self.busy_polls.get();
                if polls > 0 {
                    self.busy_polls.set(polls - 1);
                } else {
                    word |= BIT20;
                }
                word
            }
            fifo::RX_STAT => {
                let len = self.rx.borrow().len();
                let mut word = self.rx_stored.get() | len.min(0xFF) as u32;
                if self.rx_enable.get() {
                    word |= BIT31;
                }
                if len == 0 {
                    word |= EMPTY;
                }
                word
            }
            _ => 0,
        }
    }

    fn write(&self, offset: usize, value: u32) {
        match offset {
            fifo::DATA => {
                if !self.tx_enable.get() {
                    return;
                }
                let byte = value as u8;
                self.frames.borrow_mut().push(SpiFrame {
                    byte,
                    selected: self.selected(),
                    software_select: self.software_select(),
                });
                if self.rx_enable.get() {
                    let reply = self.miso.borrow_mut().pop_front().unwrap_or(byte);
                    self.rx.borrow_mut().push_back(reply);
                }
            }
            fifo::CTRL => self.set_ctrl(value),
            fifo::CTRL_SET => self.set_ctrl(self.ctrl.get() | value),
            fifo::CTRL_CLR => self.set_ctrl(self.ctrl.get() & !value),
            fifo::TX_STAT_SET => {
                if value & BIT31 != 0 {
                    self.tx_enable.set(true);
                }
                self.tx_stored.set(self.tx_stored.get() | (value & !BIT31));
            }
            fifo::TX_STAT_CLR => {
                if value & BIT31 != 0 {
                    self.tx_enable.set(false);
                }
                self.tx_stored.set(self.tx_stored.get() & !value);
            }
            fifo::RX_STAT_SET => {
                if value & BIT31 != 0 {
                    self.rx_enable.set(true);
                }
                self.rx_stored.set(self.rx_stored.get() | (value & !BIT31));
            }
            fifo::RX_STAT_CLR => {
                if value & BIT31 != 0 {
                    self.rx_enable.set(false);
                }
                self.rx_stored.set(self.rx_stored.get() & !value);
            }
            _ => {}
        }
    }
}

/// TRNG that withholds valid data for a configurable number of polls.
pub struct SimTrng {
    ctrl: Cell<u32>,
    simulated: bool,
    invalid_polls: Cell<u32>,
    data: Cell<u8>,
    reads: Cell<u32>,
    log: RefCell<Vec<u32>>,
}

impl SimTrng {
    const VALID: u32 = 1 << 31;
    const ENABLE: u32 = 1 << 30;
    const SIM: u32 = 1 << 29;

    pub fn new(simulated: bool) -> Self {
        Self {
            ctrl: Cell::new(0),
            simulated,
            invalid_polls: Cell::new(0),
            data: Cell::new(0),
            reads: Cell::new(0),
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn produce_after(&self, polls: u32, byte: u8) {
        self.invalid_polls.set(polls);
        self.data.set(byte);
    }

    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    pub fn writes(&self) -> Vec<u32> {
        self.log.borrow().clone()
    }
}

impl RegisterBus for SimTrng {
    fn read(&self, offset: usize) -> u32 {
        assert_eq!(offset, trng::CTRL);
        self.reads.set(self.reads.get() + 1);
        let mut word = self.ctrl.get();
        if self.simulated {
            word |= Self::SIM;
        }
        if word & Self::ENABLE == 0 {
            return word;
        }
        let polls = self.invalid_polls.get();
        if polls > 0 {
            self.invalid_polls.set(polls - 1);
            word
        } else {
            word | Self::VALID | self.data.get() as u32
        }
    }

    fn write(&self, offset: usize, value: u32) {
        assert_eq!(offset, trng::CTRL);
        self.log.borrow_mut().push(value);
        self.ctrl.set(value & Self::ENABLE);
    }
}
