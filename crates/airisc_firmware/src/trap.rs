//! Firmware side of trap handling.
//!
//! The assembly vector in `entry.S` saves the caller-saved registers and
//! calls [`rust_trap_handler`], which runs the BSP dispatcher with the
//! handler installed by `kmain`.

use crate::config;
use airisc_bsp::csr::{self, CsrAccess, MachineCsrs};
use airisc_bsp::reg::Mmio;
use airisc_bsp::router::{InterruptRouter, Routed};
use airisc_bsp::timer::Timer;
use airisc_bsp::trap::{TrapAction, TrapContext, TrapDispatcher, TrapHandler};
use airisc_common::mmio::PERIPHERALS;
use spin::Mutex;

/// Seconds since boot, advanced by the timer tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uptime {
    ticks: u64,
}

impl Uptime {
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }

    pub fn seconds(&self) -> u64 {
        self.ticks * config::TICK_PERIOD / config::CLOCK_HZ as u64
    }
}

/// Handler installed by `kmain`: timer tick, external IRQ logging, and the
/// default halt-on-exception policy.
pub struct FirmwareHandler {
    router: InterruptRouter,
    uptime: Uptime,
}

impl FirmwareHandler {
    pub fn new() -> Self {
        // SAFETY: the timer block is mapped at this address for the life of the image.
        let timer = Timer::new(unsafe { Mmio::new(PERIPHERALS.timer) });
        Self {
            router: InterruptRouter::new(timer, config::TICK_PERIOD),
            uptime: Uptime::new(),
        }
    }

    /// Zeroes the timer and arms the first tick.
    pub fn start_timer(&mut self) {
        let timer = self.router.timer_mut();
        timer.set_time(0);
        timer.set_compare(config::TICK_PERIOD);
    }
}

impl TrapHandler for FirmwareHandler {
    fn on_interrupt(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        let routed = self.router.route(ctx, csrs);
        match routed {
            Routed::Tick { next_compare } => {
                self.uptime.tick();
                log::debug!("tick {} s, next compare {next_compare}", self.uptime.seconds());
            }
            Routed::External(channel) => log::info!("external interrupt on channel {channel}"),
            Routed::Fatal(_) => {}
        }
        routed.action()
    }
}

static DISPATCHER: Mutex<TrapDispatcher<Option<FirmwareHandler>>> =
    Mutex::new(TrapDispatcher::new(None));

/// Makes `handler` the target of every following trap.
pub fn install(handler: FirmwareHandler) {
    let mut csrs = MachineCsrs;
    if csr::critical_section(&mut csrs, |_| DISPATCHER.lock().install(Some(handler))).is_err() {
        log::error!("trap handler not installed");
    }
}

pub fn uptime_seconds() -> u64 {
    let mut csrs = MachineCsrs;
    csr::critical_section(&mut csrs, |_| {
        DISPATCHER
            .lock()
            .handler()
            .as_ref()
            .map_or(0, |handler| handler.uptime.seconds())
    })
    .unwrap_or(0)
}

/// Masks every interrupt source and parks the hart.
pub fn halt(csrs: &mut MachineCsrs) -> ! {
    let _ = csr::disable_all_interrupts(csrs);
    loop {
        // SAFETY: waiting for an interrupt that can no longer arrive.
        unsafe { riscv::asm::wfi() };
    }
}

/// Trap handler called from the assembly trap vector.
///
/// Runs with machine interrupts disabled by hardware. Returning lets the
/// vector restore registers and `mret` to `mepc`, which the dispatcher has
/// already adjusted if needed.
#[unsafe(no_mangle)]
pub extern "C" fn rust_trap_handler() {
    let mut csrs = MachineCsrs;
    let action = DISPATCHER.lock().dispatch(&mut csrs);
    if action == TrapAction::Halt {
        halt(&mut csrs);
    }
}
