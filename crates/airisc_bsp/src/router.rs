use crate::csr::{self, CsrAccess};
use crate::reg::{Mmio, RegisterBus};
use crate::timer::Timer;
use crate::trap::{TrapAction, TrapContext, TrapHandler};
use airisc_common::csr::{Interrupt, Irq, Trap};

/// Outcome of routing one interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Timer tick; the compare register now holds `next_compare`.
    Tick { next_compare: u64 },
    /// External channel 0..=15, acknowledged in `mip`.
    External(u8),
    /// Unrecognised cause; every interrupt source has been masked.
    Fatal(u32),
}

impl Routed {
    pub const fn action(self) -> TrapAction {
        match self {
            Routed::Fatal(_) => TrapAction::Halt,
            _ => TrapAction::Resume,
        }
    }
}

/// Periodic timer tick plus AIRISC external interrupt acknowledge.
pub struct InterruptRouter<B = Mmio> {
    timer: Timer<B>,
    tick_period: u64,
}

impl<B: RegisterBus> InterruptRouter<B> {
    pub const fn new(timer: Timer<B>, tick_period: u64) -> Self {
        Self { timer, tick_period }
    }

    pub fn timer(&self) -> &Timer<B> {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut Timer<B> {
        &mut self.timer
    }

    pub fn tick_period(&self) -> u64 {
        self.tick_period
    }

    pub fn route<C: CsrAccess + ?Sized>(&mut self, ctx: TrapContext, csrs: &mut C) -> Routed {
        match ctx.trap() {
            Trap::Interrupt(Interrupt::MachineTimer) => Routed::Tick {
                next_compare: self.timer.schedule_in(self.tick_period),
            },
            Trap::Interrupt(Interrupt::Xirq(channel)) => {
                match csr::clear_pending(csrs, Irq::Xirq(channel)) {
                    Ok(()) => Routed::External(channel),
                    Err(_) => Self::fatal(ctx.cause, csrs),
                }
            }
            _ => Self::fatal(ctx.cause, csrs),
        }
    }

    fn fatal<C: CsrAccess + ?Sized>(cause: u32, csrs: &mut C) -> Routed {
        log::error!("unhandled interrupt, mcause {cause:#010x}; masking all sources");
        if let Err(err) = csr::disable_all_interrupts(csrs) {
            log::error!("could not mask interrupts: {err:?}");
        }
        Routed::Fatal(cause)
    }
}

impl<B: RegisterBus> TrapHandler for InterruptRouter<B> {
    fn on_interrupt(&mut self, ctx: TrapContext, csrs: &mut dyn CsrAccess) -> TrapAction {
        self.route(ctx, csrs).action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimCsrs, SimTimer};
    use crate::trap::TrapDispatcher;
    use airisc_common::csr::{Csr, MCAUSE_INTERRUPT, mstatus};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MIE: u32 = 1 << mstatus::MIE;

    fn armed_csrs(code: u32) -> SimCsrs {
        SimCsrs::interrupt(code, 0x8000_0040)
            .with(Csr::Mstatus, MIE)
            .with(Csr::Mie, 1 << 7 | 0xFFFF_0000)
    }

    fn ctx(code: u32) -> TrapContext {
        TrapContext {
            cause: MCAUSE_INTERRUPT | code,
            pc: 0x8000_0040,
            tval: 0,
        }
    }

    #[test]
    fn timer_tick_rearms_compare() {
        let sim = SimTimer::at(100);
        let mut router = InterruptRouter::new(Timer::new(&sim), 1_000);
        let mut csrs = armed_csrs(7);

        assert_eq!(
            router.route(ctx(7), &mut csrs),
            Routed::Tick { next_compare: 1_100 }
        );
        assert_eq!(sim.compare(), 1_100);
        assert_eq!(csrs.get(Csr::Mie), 1 << 7 | 0xFFFF_0000);
    }

    #[test]
    fn external_channels_are_acknowledged() {
        let mut router = InterruptRouter::new(Timer::new(SimTimer::new()), 1);
        for channel in 0..16u32 {
            let mut csrs = armed_csrs(0x10 + channel).with(Csr::Mip, 0xFFFF_0080);
            assert_eq!(
                router.route(ctx(0x10 + channel), &mut csrs),
                Routed::External(channel as u8)
            );
            assert_eq!(csrs.get(Csr::Mip), 0xFFFF_0080 & !(1 << (16 + channel)));
            assert_eq!(csrs.get(Csr::Mstatus), MIE);
        }
    }

    #[test]
    fn unknown_causes_mask_everything() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut router = InterruptRouter::new(Timer::new(SimTimer::new()), 1);
        let mut codes = vec![3, 11, 0, 0x20, 0x7FFF_FFFF];
        codes.extend((0..256).map(|_| rng.gen_range(0..0x8000_0000u32)));

        for code in codes {
            if code == 7 || (0x10..=0x1F).contains(&code) {
                continue;
            }
            let mut csrs = armed_csrs(code);
            let routed = router.route(ctx(code), &mut csrs);
            assert_eq!(routed, Routed::Fatal(MCAUSE_INTERRUPT | code));
            assert_eq!(routed.action(), TrapAction::Halt);
            assert_eq!(csrs.get(Csr::Mie), 0);
            assert_eq!(csrs.get(Csr::Mstatus) & MIE, 0);
        }
    }

    #[test]
    fn exceptions_passed_to_the_router_are_fatal() {
        let mut router = InterruptRouter::new(Timer::new(SimTimer::new()), 1);
        let mut csrs = armed_csrs(0);
        let exception = TrapContext {
            cause: 2,
            pc: 0,
            tval: 0,
        };
        assert_eq!(router.route(exception, &mut csrs), Routed::Fatal(2));
    }

    #[test]
    fn router_as_installed_handler() {
        let sim = SimTimer::at(5);
        let mut dispatcher = TrapDispatcher::new(InterruptRouter::new(Timer::new(&sim), 10));

        assert_eq!(dispatcher.dispatch(&mut armed_csrs(7)), TrapAction::Resume);
        assert_eq!(sim.compare(), 15);

        let mut csrs = armed_csrs(3);
        assert_eq!(dispatcher.dispatch(&mut csrs), TrapAction::Halt);
        assert_eq!(csrs.get(Csr::Mie), 0);

        let mut csrs = SimCsrs::trap(5, 0x100, 0x4);
        assert_eq!(dispatcher.dispatch(&mut csrs), TrapAction::Halt);
    }
}
